//! Free-energy levels in generalized coordinates.
//!
//! # Generative model
//!
//! A level believes a hidden value relaxes toward its set-point `η` at rate 1
//! and that its velocity decays toward zero:
//! ```text
//! e_z0 = s  − μ            (sensed value)
//! e_z1 = s' − μ'           (sensed rate)
//! e_w0 = μ' + μ − η        (first-order dynamics)
//! e_w1 = μ'' + μ'          (second-order dynamics)
//! F    = ½ Σ e² / σ
//! ```
//!
//! # Recognition dynamics
//!
//! Gradient descent on `F` plus the generalized-coordinate shift `Dμ`:
//! ```text
//! μ''ₙ = μ'' − lr·dt·(e_w1/σ_w1)
//! μ'ₙ  = μ'  + dt·[−lr·(−e_z1/σ_z1 + e_w0/σ_w0 + e_w1/σ_w1) + μ'']
//! μₙ   = μ   + dt·[−lr·(∂e_z0/∂μ · e_z0/σ_z0 + e_w0/σ_w0) + μ']
//! ```
//! Every right-hand side reads the belief as it was before this tick.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::beliefs::{GeneralizedBelief, Order};
use super::precision::{precision_weighted_error, Variance};
use crate::simulation::environment::Sample;
use crate::simulation::error::{ensure_finite, ensure_learning_rate, ensure_step, ConfigError};
use crate::simulation::memory::LevelHistory;
use crate::simulation::params::{
    DYNAMICS_RATE_VARIANCE, DYNAMICS_VARIANCE, LEARNING_RATE, SENSORY_RATE_VARIANCE,
    SENSORY_VARIANCE,
};

/// The four prediction-error channels a level can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorChannel {
    /// Sensed value vs. believed value
    Z0,
    /// Sensed rate vs. believed velocity
    Z1,
    /// First-order dynamics
    W0,
    /// Second-order dynamics
    W1,
}

impl ErrorChannel {
    /// All channels in gradient order.
    pub const ALL: [Self; 4] = [Self::Z0, Self::Z1, Self::W0, Self::W1];

    /// Conventional name (`e_z0`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Z0 => "e_z0",
            Self::Z1 => "e_z1",
            Self::W0 => "e_w0",
            Self::W1 => "e_w1",
        }
    }
}

impl fmt::Display for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the sensed value is predicted from the belief.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensoryKind {
    /// The sensor reads the hidden value itself: `e_z0 = s − μ`
    #[default]
    Direct,
    /// A cue that drops as the hidden value rises above `baseline`:
    /// `e_z0 = s + gain·(μ − baseline)`
    Cue {
        /// Cue units per unit of hidden value
        gain: f64,
        /// Hidden value at which the cue reads zero
        baseline: f64,
    },
}

impl SensoryKind {
    fn residual(self, sensed: f64, mu: f64) -> f64 {
        match self {
            Self::Direct => sensed - mu,
            Self::Cue { gain, baseline } => sensed + gain * (mu - baseline),
        }
    }

    /// `∂e_z0/∂μ`.
    fn slope(self) -> f64 {
        match self {
            Self::Direct => -1.0,
            Self::Cue { gain, .. } => gain,
        }
    }
}

/// Raw per-channel variances as they appear in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelVariances {
    /// σ_z0
    pub z0: f64,
    /// σ_z1
    pub z1: f64,
    /// σ_w0
    pub w0: f64,
    /// σ_w1
    pub w1: f64,
}

impl Default for ChannelVariances {
    fn default() -> Self {
        Self {
            z0: SENSORY_VARIANCE,
            z1: SENSORY_RATE_VARIANCE,
            w0: DYNAMICS_VARIANCE,
            w1: DYNAMICS_RATE_VARIANCE,
        }
    }
}

impl ChannelVariances {
    /// The same variance on every channel.
    #[must_use]
    pub const fn uniform(sigma: f64) -> Self {
        Self {
            z0: sigma,
            z1: sigma,
            w0: sigma,
            w1: sigma,
        }
    }
}

/// Configuration of a single free-energy level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Number of tracked derivatives
    pub order: Order,
    /// How the sensed value relates to the belief
    #[serde(default)]
    pub sensory: SensoryKind,
    /// Whether the level compares a sensed rate against `μ'`
    pub senses_rate: bool,
    /// Channel variances; only active channels are validated
    #[serde(default)]
    pub variances: ChannelVariances,
    /// Belief learning rate
    pub learning_rate: f64,
    /// Initial `μ`
    #[serde(default)]
    pub initial: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            order: Order::Acceleration,
            sensory: SensoryKind::Direct,
            senses_rate: true,
            variances: ChannelVariances::default(),
            learning_rate: LEARNING_RATE,
            initial: 0.0,
        }
    }
}

/// Error values of one tick. Inactive channels read as `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorSample {
    /// Sensory value error (always present)
    pub z0: f64,
    /// Sensory rate error
    pub z1: Option<f64>,
    /// First-order dynamics error
    pub w0: Option<f64>,
    /// Second-order dynamics error
    pub w1: Option<f64>,
}

impl ErrorSample {
    /// Reads `channel`, if active.
    #[must_use]
    pub const fn get(&self, channel: ErrorChannel) -> Option<f64> {
        match channel {
            ErrorChannel::Z0 => Some(self.z0),
            ErrorChannel::Z1 => self.z1,
            ErrorChannel::W0 => self.w0,
            ErrorChannel::W1 => self.w1,
        }
    }
}

/// Everything a level publishes for the rest of the tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelOutput {
    /// Belief after this tick's update
    pub belief: GeneralizedBelief,
    /// Errors computed from the pre-update belief
    pub errors: ErrorSample,
    /// Set-point used this tick
    pub setpoint: f64,
    /// Variational free energy of this tick
    pub vfe: f64,
}

/// Validated variances of the active channels.
#[derive(Clone, Copy, Debug)]
struct Channels {
    z0: Variance,
    z1: Option<Variance>,
    w0: Variance,
    w1: Option<Variance>,
}

impl Channels {
    fn new(config: &LevelConfig) -> Result<Self, ConfigError> {
        let rank = config.order.rank();
        let v = &config.variances;
        Ok(Self {
            z0: Variance::new("e_z0", v.z0)?,
            z1: if rank >= 1 && config.senses_rate {
                Some(Variance::new("e_z1", v.z1)?)
            } else {
                None
            },
            w0: Variance::new("e_w0", v.w0)?,
            w1: if rank >= 2 {
                Some(Variance::new("e_w1", v.w1)?)
            } else {
                None
            },
        })
    }

    fn variance(&self, channel: ErrorChannel) -> Option<Variance> {
        match channel {
            ErrorChannel::Z0 => Some(self.z0),
            ErrorChannel::Z1 => self.z1,
            ErrorChannel::W0 => Some(self.w0),
            ErrorChannel::W1 => self.w1,
        }
    }
}

/// A level of the hierarchy: one generalized belief and its error channels.
#[derive(Clone, Debug)]
pub struct FreeEnergyLevel {
    order: Order,
    sensory: SensoryKind,
    channels: Channels,
    learning_rate: f64,
    dt: f64,
    belief: GeneralizedBelief,
    history: LevelHistory,
}

impl FreeEnergyLevel {
    /// Builds a level, validating every active channel.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for a non-positive variance, learning rate or `dt`.
    pub fn new(config: &LevelConfig, dt: f64) -> Result<Self, ConfigError> {
        let dt = ensure_step(dt)?;
        let learning_rate = ensure_learning_rate("belief", config.learning_rate)?;
        ensure_finite("initial", config.initial)?;
        if let SensoryKind::Cue { gain, baseline } = config.sensory {
            ensure_finite("cue gain", gain)?;
            ensure_finite("cue baseline", baseline)?;
        }
        Ok(Self {
            order: config.order,
            sensory: config.sensory,
            channels: Channels::new(config)?,
            learning_rate,
            dt,
            belief: GeneralizedBelief::at_rest(config.initial),
            history: LevelHistory::default(),
        })
    }

    /// Starts from an explicit belief instead of rest.
    #[must_use]
    pub fn with_belief(mut self, belief: GeneralizedBelief) -> Self {
        self.belief = belief.truncated(self.order);
        self
    }

    /// Current belief.
    #[must_use]
    pub const fn belief(&self) -> &GeneralizedBelief {
        &self.belief
    }

    /// Tracked order.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.order
    }

    /// Whether `channel` is computed by this level.
    #[must_use]
    pub fn has_channel(&self, channel: ErrorChannel) -> bool {
        self.channels.variance(channel).is_some()
    }

    /// Variance of `channel`, if active.
    #[must_use]
    pub fn variance(&self, channel: ErrorChannel) -> Option<Variance> {
        self.channels.variance(channel)
    }

    /// Per-tick record of beliefs, errors and free energy.
    #[must_use]
    pub const fn history(&self) -> &LevelHistory {
        &self.history
    }

    /// Runs one tick of perception.
    ///
    /// `cross_drive` is the already-weighted sum of same-tick error channels
    /// read from earlier levels; it is added to the sensory value error.
    pub fn step(&mut self, sample: Sample, setpoint: f64, cross_drive: f64) -> LevelOutput {
        let snapshot = self.belief;
        let errors = self.errors(&snapshot, sample, setpoint, cross_drive);
        let belief = self.descend(&snapshot, &errors);
        let vfe = self.free_energy(&errors);

        self.belief = belief;
        let output = LevelOutput {
            belief,
            errors,
            setpoint,
            vfe,
        };
        self.history.record(&output, self.order);
        output
    }

    /// Prediction errors of `belief` against the current sample and set-point.
    #[must_use]
    pub fn errors(
        &self,
        belief: &GeneralizedBelief,
        sample: Sample,
        setpoint: f64,
        cross_drive: f64,
    ) -> ErrorSample {
        let rank = self.order.rank();
        let z0 = self.sensory.residual(sample.value, belief.mu) + cross_drive;
        let z1 = self.channels.z1.map(|_| sample.derivative - belief.mu_d1);
        // Without a velocity the level relaxes straight onto its set-point
        let w0 = if rank >= 1 {
            belief.mu_d1 + belief.mu - setpoint
        } else {
            belief.mu - setpoint
        };
        let w1 = self.channels.w1.map(|_| belief.mu_d2 + belief.mu_d1);

        ErrorSample {
            z0,
            z1,
            w0: Some(w0),
            w1,
        }
    }

    /// One Euler step of gradient descent from `snapshot`.
    fn descend(&self, snapshot: &GeneralizedBelief, errors: &ErrorSample) -> GeneralizedBelief {
        let lr = self.learning_rate;
        let dt = self.dt;
        let rank = self.order.rank();

        let w0_term = errors.w0.map_or(0.0, |e| self.channels.w0.weigh(e));
        let w1_term = match (errors.w1, self.channels.w1) {
            (Some(e), Some(sigma)) => sigma.weigh(e),
            _ => 0.0,
        };
        let z1_term = match (errors.z1, self.channels.z1) {
            (Some(e), Some(sigma)) => -sigma.weigh(e),
            _ => 0.0,
        };

        // Highest order first; each line reads only the snapshot
        let mu_d2 = if rank >= 2 {
            snapshot.mu_d2 - lr * dt * w1_term
        } else {
            0.0
        };

        let mu_d1 = if rank >= 1 {
            snapshot.mu_d1 + dt * (-lr * (z1_term + w0_term + w1_term) + snapshot.mu_d2)
        } else {
            0.0
        };

        let z0_term = self.sensory.slope() * self.channels.z0.weigh(errors.z0);
        let mu = snapshot.mu + dt * (-lr * (z0_term + w0_term) + snapshot.mu_d1);

        GeneralizedBelief { mu, mu_d1, mu_d2 }
    }

    /// `½ Σ e²/σ` over active channels.
    #[must_use]
    pub fn free_energy(&self, errors: &ErrorSample) -> f64 {
        let total: f64 = ErrorChannel::ALL
            .iter()
            .filter_map(|&channel| {
                let residual = errors.get(channel)?;
                let sigma = self.channels.variance(channel)?;
                Some(precision_weighted_error(residual, sigma))
            })
            .sum();
        0.5 * total
    }
}
