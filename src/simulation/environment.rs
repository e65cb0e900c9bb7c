use serde::{Deserialize, Serialize};

use crate::simulation::error::{ensure_finite, ensure_step, ConfigError};
use crate::simulation::hierarchy::LevelKind;
use crate::simulation::memory::WorldHistory;
use crate::simulation::noise::{NoiseSource, NoiseSpec};
use crate::simulation::params::{
    EXPOSURE, INITIAL_TEMPERATURE, LUMINANCE_EVENTS, SENSOR_NOISE_STD, SHOCK_EVENTS, WARMTH_BASE,
    WARMTH_SLOPE,
};

/// A scripted change that takes effect at `at` and persists until the next one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Simulation time (whole time units) at which the value switches
    pub at: f64,
    /// Value from `at` onwards
    pub value: f64,
}

/// Piecewise-constant script of a quantity over simulation time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Value before the first event
    pub initial: f64,
    /// Switch points, in any order
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

impl Schedule {
    /// A schedule that never changes.
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self {
            initial: value,
            events: Vec::new(),
        }
    }

    /// A schedule from `(time, value)` pairs.
    #[must_use]
    pub fn from_events(initial: f64, events: &[(f64, f64)]) -> Self {
        Self {
            initial,
            events: events
                .iter()
                .map(|&(at, value)| ScheduledEvent { at, value })
                .collect(),
        }
    }

    /// Value in force at `time`: the latest event at or before it.
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        self.events
            .iter()
            .filter(|event| event.at <= time)
            .max_by(|a, b| a.at.total_cmp(&b.at))
            .map_or(self.initial, |event| event.value)
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        ensure_finite(name, self.initial)?;
        for event in &self.events {
            ensure_finite(name, event.at)?;
            ensure_finite(name, event.value)?;
        }
        Ok(())
    }
}

/// Effectors through which actions reach the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effector {
    /// Direct metabolic heating or cooling of the body
    Heat,
    /// Swimming velocity along the warmth gradient
    Locomotion,
}

impl Effector {
    /// All effectors.
    pub const ALL: [Self; 2] = [Self::Heat, Self::Locomotion];

    /// Short name for logs and dashboards.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Heat => "heat",
            Self::Locomotion => "locomotion",
        }
    }
}

/// Action values handed to the world at the start of a tick.
///
/// These are always the values computed during the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StagedActions {
    /// Heating rate (positive warms the body)
    pub heat: f64,
    /// Swimming velocity (positive moves toward warmer water)
    pub locomotion: f64,
}

impl StagedActions {
    /// Reads the command for `effector`.
    #[must_use]
    pub const fn get(&self, effector: Effector) -> f64 {
        match effector {
            Effector::Heat => self.heat,
            Effector::Locomotion => self.locomotion,
        }
    }

    /// Sets the command for `effector`.
    pub fn set(&mut self, effector: Effector, value: f64) {
        match effector {
            Effector::Heat => self.heat = value,
            Effector::Locomotion => self.locomotion = value,
        }
    }
}

/// Ambient warmth as a function of position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum WarmthProfile {
    /// `base + slope · x`
    Linear {
        /// Warmth at position 0
        base: f64,
        /// Warmth gained per unit of position
        slope: f64,
    },
    /// `peak / (x² + 1)`: a warm spring at the origin, colder further out
    InverseSquare {
        /// Warmth at position 0
        peak: f64,
    },
}

impl Default for WarmthProfile {
    fn default() -> Self {
        Self::Linear {
            base: WARMTH_BASE,
            slope: WARMTH_SLOPE,
        }
    }
}

impl WarmthProfile {
    /// Warmth at `position`.
    #[must_use]
    pub fn warmth_at(self, position: f64) -> f64 {
        match self {
            Self::Linear { base, slope } => base + slope * position,
            Self::InverseSquare { peak } => peak / (position.powi(2) + 1.0),
        }
    }

    /// Change of warmth per unit of position at `position`.
    #[must_use]
    pub fn gradient_at(self, position: f64) -> f64 {
        match self {
            Self::Linear { slope, .. } => slope,
            Self::InverseSquare { peak } => {
                -2.0 * peak * position / (position.powi(2) + 1.0).powi(2)
            }
        }
    }

    fn validate(self) -> Result<(), ConfigError> {
        match self {
            Self::Linear { base, slope } => {
                ensure_finite("warmth base", base)?;
                ensure_finite("warmth slope", slope)?;
            }
            Self::InverseSquare { peak } => {
                ensure_finite("warmth peak", peak)?;
            }
        }
        Ok(())
    }
}

/// How body temperature follows the water around it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyModel {
    /// Temperature integrates shocks, heating and conducted warmth
    #[default]
    Integrating,
    /// Temperature is the local warmth; only swimming changes it
    Immersed,
}

/// Ground-truth physical quantities after a world update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrueState {
    /// Tick this state belongs to
    pub tick: usize,
    /// Body temperature
    pub temperature: f64,
    /// Rate of body temperature change
    pub temperature_change: f64,
    /// Scripted environmental warming rate
    pub shock: f64,
    /// Scripted luminance change (the exteroceptive cue)
    pub luminance: f64,
    /// Heating rate applied this tick
    pub heat: f64,
    /// Position along the warmth gradient
    pub position: f64,
    /// Swimming velocity applied this tick
    pub velocity: f64,
    /// Rate of velocity change
    pub acceleration: f64,
    /// Ambient warmth at the current position
    pub warmth: f64,
    /// Rate of ambient warmth change felt while swimming
    pub warmth_change: f64,
    /// Change of warmth per unit of position at the current position
    pub warmth_gradient: f64,
}

/// One noisy sensory reading: a value and its time-derivative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    /// Sensed value
    pub value: f64,
    /// Sensed rate of change
    pub derivative: f64,
}

impl Sample {
    /// A reading without noise.
    #[must_use]
    pub const fn new(value: f64, derivative: f64) -> Self {
        Self { value, derivative }
    }
}

/// All sensory readings produced in one tick, one per modality.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sensations {
    /// Body temperature and its change
    pub interoceptive: Sample,
    /// Luminance cue
    pub exteroceptive: Sample,
    /// Ambient warmth and its change while moving
    pub thermal: Sample,
    /// Own velocity and acceleration
    pub proprioceptive: Sample,
}

impl Sensations {
    /// The modality a level of `kind` listens to.
    #[must_use]
    pub const fn for_level(&self, kind: LevelKind) -> Sample {
        match kind {
            LevelKind::Exteroception => self.exteroceptive,
            LevelKind::Interoception => self.interoceptive,
            LevelKind::ActiveExteroception => self.thermal,
            LevelKind::Proprioception => self.proprioceptive,
        }
    }
}

/// The world an agent lives in.
///
/// The hierarchy only relies on these two operations; the schedule behind
/// them is up to the implementation.
pub trait WorldProcess {
    /// Advances the world to `tick`, applying actions staged during the previous tick.
    fn advance(&mut self, tick: usize, applied: &StagedActions) -> TrueState;

    /// Produces noisy readings of `state`.
    fn sense(&mut self, state: &TrueState) -> Sensations;
}

/// Configuration of the [`ThermalPond`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Body temperature at the start of a run; an immersed body starts at the local warmth
    pub initial_temperature: f64,
    /// Position at the start of a run
    pub initial_position: f64,
    /// Ambient warmth over position
    #[serde(default)]
    pub warmth: WarmthProfile,
    /// How body temperature follows the water
    #[serde(default)]
    pub body: BodyModel,
    /// Conduction of ambient warmth above the origin's into the body
    pub exposure: f64,
    /// Scripted environmental warming rate
    pub shock: Schedule,
    /// Scripted luminance change
    pub luminance: Schedule,
    /// Noise added to every sensory reading
    pub sensor_noise: NoiseSpec,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_temperature: INITIAL_TEMPERATURE,
            initial_position: 0.0,
            warmth: WarmthProfile::default(),
            body: BodyModel::Integrating,
            exposure: EXPOSURE,
            shock: Schedule::from_events(0.0, &SHOCK_EVENTS),
            luminance: Schedule::from_events(0.0, &LUMINANCE_EVENTS),
            sensor_noise: NoiseSpec::Gaussian {
                std_dev: SENSOR_NOISE_STD,
            },
        }
    }
}

impl WorldConfig {
    /// A still pond at `temperature`: no events, no conduction, no noise.
    #[must_use]
    pub fn still(temperature: f64) -> Self {
        Self {
            initial_temperature: temperature,
            exposure: 0.0,
            shock: Schedule::constant(0.0),
            luminance: Schedule::constant(0.0),
            sensor_noise: NoiseSpec::Silent,
            ..Self::default()
        }
    }

    /// Checks every field.
    ///
    /// # Errors
    /// Returns the first invalid parameter found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_finite("initial_temperature", self.initial_temperature)?;
        ensure_finite("initial_position", self.initial_position)?;
        self.warmth.validate()?;
        ensure_finite("exposure", self.exposure)?;
        self.shock.validate("shock")?;
        self.luminance.validate("luminance")?;
        self.sensor_noise.validate()
    }
}

/// A one-dimensional pond with a warmth profile along it.
///
/// Every term is a rate of warming, so a positive shock, a positive heat
/// action and swimming into warmer water all raise body temperature.
/// An [immersed](BodyModel::Immersed) body simply takes the local warmth.
pub struct ThermalPond {
    config: WorldConfig,
    dt: f64,
    state: TrueState,
    noise: Box<dyn NoiseSource>,
    history: WorldHistory,
}

impl ThermalPond {
    /// Creates a pond whose sensor noise is seeded with `seed`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the configuration or `dt` is invalid.
    pub fn new(config: &WorldConfig, dt: f64, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let noise = config.sensor_noise.build(seed)?;
        Self::with_noise(config, dt, noise)
    }

    /// Creates a pond with an explicit noise source.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the configuration or `dt` is invalid.
    pub fn with_noise(
        config: &WorldConfig,
        dt: f64,
        noise: Box<dyn NoiseSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let dt = ensure_step(dt)?;
        let warmth = config.warmth.warmth_at(config.initial_position);
        let temperature = match config.body {
            BodyModel::Integrating => config.initial_temperature,
            BodyModel::Immersed => warmth,
        };
        Ok(Self {
            state: TrueState {
                tick: 0,
                temperature,
                shock: config.shock.initial,
                luminance: config.luminance.initial,
                position: config.initial_position,
                warmth,
                warmth_gradient: config.warmth.gradient_at(config.initial_position),
                ..TrueState::default()
            },
            config: config.clone(),
            dt,
            noise,
            history: WorldHistory::default(),
        })
    }

    /// Latest ground-truth state.
    #[must_use]
    pub const fn state(&self) -> &TrueState {
        &self.state
    }

    /// Recorded ground truth, one entry per tick.
    #[must_use]
    pub const fn history(&self) -> &WorldHistory {
        &self.history
    }

    /// The configuration this pond was built from.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Ambient warmth at `position`.
    #[must_use]
    pub fn warmth_at(&self, position: f64) -> f64 {
        self.config.warmth.warmth_at(position)
    }

    fn noisy(&mut self, value: f64) -> f64 {
        value + self.noise.sample()
    }
}

impl WorldProcess for ThermalPond {
    fn advance(&mut self, tick: usize, applied: &StagedActions) -> TrueState {
        let dt = self.dt;
        let previous = self.state;
        // Events are keyed by whole time units
        let time = (tick as f64 * dt).floor();

        let shock = self.config.shock.value_at(time);
        let luminance = self.config.luminance.value_at(time);

        let velocity = applied.locomotion;
        let position = previous.position + velocity * dt;
        let warmth = self.warmth_at(position);
        let warmth_gradient = self.config.warmth.gradient_at(position);
        let warmth_change = warmth_gradient * velocity;

        let (temperature, temperature_change) = match self.config.body {
            BodyModel::Integrating => {
                let change = shock
                    + applied.heat
                    + self.config.exposure * (warmth - self.warmth_at(0.0));
                (previous.temperature + change * dt, change)
            }
            BodyModel::Immersed => (warmth, warmth_change),
        };

        let next = TrueState {
            tick,
            temperature,
            temperature_change,
            shock,
            luminance,
            heat: applied.heat,
            position,
            velocity,
            acceleration: (velocity - previous.velocity) / dt,
            warmth,
            warmth_change,
            warmth_gradient,
        };

        self.state = next;
        self.history.record(&next);
        next
    }

    fn sense(&mut self, state: &TrueState) -> Sensations {
        Sensations {
            interoceptive: Sample::new(
                self.noisy(state.temperature),
                self.noisy(state.temperature_change),
            ),
            exteroceptive: Sample::new(self.noisy(state.luminance), self.noisy(0.0)),
            thermal: Sample::new(self.noisy(state.warmth), self.noisy(state.warmth_change)),
            proprioceptive: Sample::new(
                self.noisy(state.velocity),
                self.noisy(state.acceleration),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::noise::Silent;

    fn silent_pond(config: &WorldConfig, dt: f64) -> ThermalPond {
        ThermalPond::with_noise(config, dt, Box::new(Silent)).unwrap()
    }

    #[test]
    fn test_schedule_holds_last_event() {
        let schedule = Schedule::from_events(0.0, &[(10.0, 2.0), (50.0, 5.0)]);
        assert!((schedule.value_at(0.0) - 0.0).abs() < 1e-12);
        assert!((schedule.value_at(9.0) - 0.0).abs() < 1e-12);
        assert!((schedule.value_at(10.0) - 2.0).abs() < 1e-12);
        assert!((schedule.value_at(49.0) - 2.0).abs() < 1e-12);
        assert!((schedule.value_at(500.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_ignores_event_order() {
        let schedule = Schedule::from_events(1.0, &[(50.0, 5.0), (10.0, 2.0)]);
        assert!((schedule.value_at(20.0) - 2.0).abs() < 1e-12);
        assert!((schedule.value_at(60.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_heat_action_warms_body() {
        let mut pond = silent_pond(&WorldConfig::still(30.0), 0.1);
        let applied = StagedActions {
            heat: 2.0,
            locomotion: 0.0,
        };
        let state = pond.advance(0, &applied);
        assert!((state.temperature_change - 2.0).abs() < 1e-12);
        assert!((state.temperature - 30.2).abs() < 1e-12);
    }

    #[test]
    fn test_shock_follows_schedule() {
        let config = WorldConfig {
            shock: Schedule::from_events(0.0, &[(1.0, 3.0)]),
            ..WorldConfig::still(30.0)
        };
        let mut pond = silent_pond(&config, 0.5);
        let idle = StagedActions::default();
        assert!(pond.advance(0, &idle).shock.abs() < 1e-12);
        assert!(pond.advance(1, &idle).shock.abs() < 1e-12);
        assert!((pond.advance(2, &idle).shock - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_swimming_changes_warmth() {
        let config = WorldConfig {
            exposure: 0.5,
            ..WorldConfig::still(30.0)
        };
        let mut pond = silent_pond(&config, 0.1);
        let applied = StagedActions {
            heat: 0.0,
            locomotion: 1.0,
        };
        let state = pond.advance(0, &applied);
        assert!((state.position - 0.1).abs() < 1e-12);
        assert!((state.warmth - (WARMTH_BASE + 0.1 * WARMTH_SLOPE)).abs() < 1e-12);
        assert!((state.warmth_change - WARMTH_SLOPE).abs() < 1e-12);
        assert!(state.temperature_change > 0.0);
    }

    #[test]
    fn test_inverse_square_profile() {
        let profile = WarmthProfile::InverseSquare { peak: 100.0 };
        assert!((profile.warmth_at(0.0) - 100.0).abs() < 1e-12);
        assert!((profile.warmth_at(2.0) - 20.0).abs() < 1e-12);
        // -2 * 100 * 2 / 25
        assert!((profile.gradient_at(2.0) + 16.0).abs() < 1e-12);
        assert!(profile.gradient_at(0.0).abs() < 1e-12);
        assert!(profile.gradient_at(-2.0) > 0.0, "warmer toward the origin");

        let h = 1e-6;
        let numeric = (profile.warmth_at(1.3 + h) - profile.warmth_at(1.3 - h)) / (2.0 * h);
        assert!((numeric - profile.gradient_at(1.3)).abs() < 1e-5);
    }

    #[test]
    fn test_immersed_body_takes_local_warmth() {
        let config = WorldConfig {
            initial_position: 2.0,
            warmth: WarmthProfile::InverseSquare { peak: 100.0 },
            body: BodyModel::Immersed,
            shock: Schedule::constant(5.0),
            ..WorldConfig::still(30.0)
        };
        let mut pond = silent_pond(&config, 0.1);
        assert!((pond.state().temperature - 20.0).abs() < 1e-12);

        let applied = StagedActions {
            heat: 3.0,
            locomotion: 10.0,
        };
        let state = pond.advance(0, &applied);
        assert!((state.position - 3.0).abs() < 1e-12);
        assert!((state.temperature - 10.0).abs() < 1e-12, "shock and heat ignored");
        assert!((state.warmth_gradient + 6.0).abs() < 1e-12);
        assert!((state.temperature_change - state.warmth_gradient * 10.0).abs() < 1e-12);
        assert!((state.warmth_change - state.temperature_change).abs() < 1e-12);
    }

    #[test]
    fn test_silent_sensing_is_exact() {
        let mut pond = silent_pond(&WorldConfig::still(4.0), 0.1);
        let state = pond.advance(0, &StagedActions::default());
        let senses = pond.sense(&state);
        assert!((senses.interoceptive.value - 4.0).abs() < 1e-12);
        assert!(senses.interoceptive.derivative.abs() < 1e-12);
        assert_eq!(senses.for_level(LevelKind::Interoception), senses.interoceptive);
    }

    #[test]
    fn test_history_records_every_tick() {
        let mut pond = silent_pond(&WorldConfig::still(30.0), 0.1);
        for tick in 0..5 {
            pond.advance(tick, &StagedActions::default());
        }
        assert_eq!(pond.history().temperature.len(), 5);
        assert_eq!(pond.history().heat.len(), 5);
    }

    #[test]
    fn test_rejects_bad_step() {
        assert!(ThermalPond::new(&WorldConfig::default(), 0.0, 1).is_err());
    }
}
