//! Serializable run configuration.

use serde::{Deserialize, Serialize};

use crate::simulation::environment::WorldConfig;
use crate::simulation::error::{ensure_finite, ensure_step, ConfigError};
use crate::simulation::hierarchy::LevelSpec;
use crate::simulation::noise::NoiseSpec;
use crate::simulation::params::{ACT_TIME, DESIRED_TEMPERATURE, DT, SIM_TIME, VIABLE_RANGE};

/// Body temperatures an agent survives in: `center ± range`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViabilityBand {
    /// Temperature the band is centred on
    pub center: f64,
    /// Half-width of the band
    pub range: f64,
}

impl Default for ViabilityBand {
    fn default() -> Self {
        Self::new(DESIRED_TEMPERATURE, VIABLE_RANGE)
    }
}

impl ViabilityBand {
    /// A band of `center ± range`.
    #[must_use]
    pub const fn new(center: f64, range: f64) -> Self {
        Self { center, range }
    }

    /// Whether `temperature` lies inside the band, edges included.
    #[must_use]
    pub fn contains(&self, temperature: f64) -> bool {
        (temperature - self.center).abs() <= self.range
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_finite("viability center", self.center)?;
        if !(self.range.is_finite() && self.range >= 0.0) {
            return Err(ConfigError::InvalidViability(self.range));
        }
        Ok(())
    }
}

/// Everything needed to reproduce a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Euler step
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Horizon in time units
    #[serde(default = "default_sim_time")]
    pub sim_time: f64,
    /// Controllers act only once `tick · dt` exceeds this
    #[serde(default = "default_act_time")]
    pub act_time: f64,
    /// Seed for every noise source in the run
    #[serde(default)]
    pub seed: u64,
    /// Physical world
    #[serde(default)]
    pub world: WorldConfig,
    /// Levels of the agent, in any order
    pub levels: Vec<LevelSpec>,
    /// Noise used to perturb actions
    #[serde(default = "silent")]
    pub action_noise: NoiseSpec,
    /// Band of body temperatures counted as viable
    #[serde(default)]
    pub viability: ViabilityBand,
}

const fn default_dt() -> f64 {
    DT
}

const fn default_sim_time() -> f64 {
    SIM_TIME
}

const fn default_act_time() -> f64 {
    ACT_TIME
}

const fn silent() -> NoiseSpec {
    NoiseSpec::Silent
}

impl SimulationConfig {
    /// Checks the run-level parameters and the world.
    ///
    /// Level wiring is checked when the hierarchy is built.
    ///
    /// # Errors
    /// Returns the first invalid parameter found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_step(self.dt)?;
        if !(self.sim_time.is_finite() && self.sim_time > 0.0) {
            return Err(ConfigError::InvalidDuration {
                name: "sim_time",
                expected: "positive",
                value: self.sim_time,
            });
        }
        if !(self.act_time.is_finite() && self.act_time >= 0.0) {
            return Err(ConfigError::InvalidDuration {
                name: "act_time",
                expected: "non-negative",
                value: self.act_time,
            });
        }
        if self.levels.is_empty() {
            return Err(ConfigError::EmptyHierarchy);
        }
        self.viability.validate()?;
        self.world.validate()?;
        self.action_noise.validate()
    }

    /// Number of ticks in the horizon.
    ///
    /// Rounded to the nearest tick, so a horizon such as `0.3` with `dt = 0.1`
    /// gives 3 ticks even though the quotient falls just short of it.
    #[must_use]
    pub fn ticks(&self) -> usize {
        (self.sim_time / self.dt).round() as usize
    }

    /// Seed of the action perturbation stream, distinct from the sensor stream.
    #[must_use]
    pub const fn action_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }

    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the validation error.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to pretty JSON.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}
