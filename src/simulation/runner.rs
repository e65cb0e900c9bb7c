//! Driving a hierarchy through a world for a fixed horizon.

use tracing::info;

use crate::simulation::config::{SimulationConfig, ViabilityBand};
use crate::simulation::diagnostics::{viability_report, ViabilityReport};
use crate::simulation::environment::ThermalPond;
use crate::simulation::error::ConfigError;
use crate::simulation::hierarchy::{Hierarchy, TickReport};

/// One agent in one pond, ready to be stepped.
pub struct Simulation {
    hierarchy: Hierarchy,
    world: ThermalPond,
    dt: f64,
    ticks: usize,
    viability: ViabilityBand,
}

impl Simulation {
    /// Builds the world and the hierarchy described by `config`.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found in the run, world or level wiring.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = ThermalPond::new(&config.world, config.dt, config.seed)?;
        let action_noise = config.action_noise.build(config.action_seed())?;
        let hierarchy = Hierarchy::new(&config.levels, config.dt, config.act_time, action_noise)?;
        info!(
            levels = config.levels.len(),
            dt = config.dt,
            sim_time = config.sim_time,
            act_time = config.act_time,
            seed = config.seed,
            "simulation ready"
        );
        Ok(Self {
            hierarchy,
            world,
            dt: config.dt,
            ticks: config.ticks(),
            viability: config.viability,
        })
    }

    /// Advances one tick, or returns `None` once the horizon is reached.
    pub fn step(&mut self) -> Option<TickReport> {
        if self.is_finished() {
            return None;
        }
        Some(self.hierarchy.tick(&mut self.world))
    }

    /// Runs every remaining tick.
    pub fn run(&mut self) -> &mut Self {
        let start = self.hierarchy.ticks();
        while self.step().is_some() {}
        info!(
            ticks = self.hierarchy.ticks() - start,
            temperature = self.world.state().temperature,
            "simulation finished"
        );
        self
    }

    /// Whether the horizon has been reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.hierarchy.ticks() >= self.ticks
    }

    /// Simulation time of the next tick.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.hierarchy.ticks() as f64 * self.dt
    }

    /// Fraction of the horizon completed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.ticks == 0 {
            1.0
        } else {
            self.hierarchy.ticks() as f64 / self.ticks as f64
        }
    }

    /// Total number of ticks in the horizon.
    #[must_use]
    pub const fn horizon(&self) -> usize {
        self.ticks
    }

    /// Band of body temperatures this run counts as viable.
    #[must_use]
    pub const fn viability_band(&self) -> ViabilityBand {
        self.viability
    }

    /// Viability of the body temperature recorded so far.
    #[must_use]
    pub fn viability(&self) -> ViabilityReport {
        viability_report(&self.world.history().temperature, self.viability)
    }

    /// The agent.
    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &ThermalPond {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::agent::scenario_a;

    #[test]
    fn test_step_stops_at_horizon() {
        let mut config = scenario_a();
        config.sim_time = 0.05;
        let mut sim = Simulation::new(&config).unwrap();
        assert_eq!(sim.horizon(), 10);
        let mut steps = 0;
        while sim.step().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 10);
        assert!(sim.is_finished());
        assert!((sim.progress() - 1.0).abs() < 1e-12);
        assert_eq!(sim.world().history().temperature.len(), 10);
    }

    #[test]
    fn test_viability_uses_configured_band() {
        let mut sim = Simulation::new(&scenario_a()).unwrap();
        sim.run();
        assert!((sim.viability_band().center - 4.0).abs() < 1e-12);
        let report = sim.viability();
        assert_eq!(report.inside, report.total);
        assert!((report.fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_running() {
        let mut config = scenario_a();
        config.levels[0].level.variances.z0 = -1.0;
        assert!(matches!(
            Simulation::new(&config),
            Err(ConfigError::InvalidVariance { channel: "e_z0", .. })
        ));
    }
}
