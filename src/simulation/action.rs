//! Bounded action controllers.
//!
//! Action descends the same free energy as perception, but through the world:
//! the agent changes what it will sense instead of what it believes.
//! ```text
//! a ← a − lr_a · dt · (∂s/∂a) · e / σ
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::simulation::environment::{Effector, TrueState};
use crate::simulation::error::{ensure_finite, ensure_learning_rate, ensure_step, ConfigError};
use crate::simulation::inference::{ErrorChannel, Variance};
use crate::simulation::noise::NoiseSource;
use crate::simulation::params::{ACTION_LEARNING_RATE, HEAT_BOUND};

/// Where the multiplicative perturbation sits relative to the clamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perturbation {
    /// No perturbation
    #[default]
    Disabled,
    /// Clamp, then perturb; the result may leave the bound
    ClampThenPerturb,
    /// Perturb, then clamp; the bound always holds
    PerturbThenClamp,
}

/// Sensitivity of the sensed quantity to the action (`∂s/∂a`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ActionGain {
    /// The same sensitivity every tick
    Constant {
        /// Sensitivity
        value: f64,
    },
    /// The warmth gradient at the agent's position; swimming at velocity `v`
    /// changes felt temperature by `dT/dx · v`
    WarmthGradient,
}

impl Default for ActionGain {
    fn default() -> Self {
        Self::Constant { value: 1.0 }
    }
}

impl ActionGain {
    /// Sensitivity in the world `state`.
    #[must_use]
    pub const fn at(self, state: &TrueState) -> f64 {
        match self {
            Self::Constant { value } => value,
            Self::WarmthGradient => state.warmth_gradient,
        }
    }
}

/// Configuration of an action controller attached to a level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Which part of the world the action drives
    pub effector: Effector,
    /// Error channel of the owning level that drives the action
    pub channel: ErrorChannel,
    /// Action learning rate
    pub learning_rate: f64,
    /// Largest permitted magnitude
    pub bound: f64,
    /// Sensitivity of the sensed quantity to the action
    #[serde(default)]
    pub gain: ActionGain,
    /// Action value before the first tick
    #[serde(default)]
    pub initial: f64,
    /// Optional multiplicative noise
    #[serde(default)]
    pub perturbation: Perturbation,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            effector: Effector::Heat,
            channel: ErrorChannel::Z1,
            learning_rate: ACTION_LEARNING_RATE,
            bound: HEAT_BOUND,
            gain: ActionGain::default(),
            initial: 0.0,
            perturbation: Perturbation::Disabled,
        }
    }
}

/// Integrate-clamp-perturb controller for one scalar action.
#[derive(Clone, Debug)]
pub struct ActionController {
    learning_rate: f64,
    bound: f64,
    source: ActionGain,
    gain: f64,
    variance: Variance,
    dt: f64,
    perturbation: Perturbation,
    value: f64,
}

impl ActionController {
    /// Builds a controller driven by a channel with `variance`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for a non-positive learning rate, bound or `dt`.
    pub fn new(config: &ActionConfig, variance: Variance, dt: f64) -> Result<Self, ConfigError> {
        let dt = ensure_step(dt)?;
        let learning_rate = ensure_learning_rate("action", config.learning_rate)?;
        if !(config.bound.is_finite() && config.bound > 0.0) {
            return Err(ConfigError::InvalidBound(config.bound));
        }
        let gain = match config.gain {
            ActionGain::Constant { value } => ensure_finite("action gain", value)?,
            // Known once the world has been observed
            ActionGain::WarmthGradient => 0.0,
        };
        ensure_finite("initial action", config.initial)?;
        Ok(Self {
            learning_rate,
            bound: config.bound,
            source: config.gain,
            gain,
            variance,
            dt,
            perturbation: config.perturbation,
            value: config.initial,
        })
    }

    /// Current action value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Configured bound.
    #[must_use]
    pub const fn bound(&self) -> f64 {
        self.bound
    }

    /// Sensitivity used by the latest update.
    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    /// Refreshes the sensitivity from the world `state` and returns it.
    pub fn observe(&mut self, state: &TrueState) -> f64 {
        self.gain = self.source.at(state);
        self.gain
    }

    /// Configured perturbation ordering.
    #[must_use]
    pub const fn perturbation(&self) -> Perturbation {
        self.perturbation
    }

    /// Gradient step from `previous` driven by `error`, before clamping.
    #[must_use]
    pub fn integrate(&self, error: f64, previous: f64) -> f64 {
        previous + self.dt * (-self.learning_rate) * self.gain * self.variance.weigh(error)
    }

    /// Limits `candidate` to `[-bound, bound]`.
    #[must_use]
    pub fn clamp(&self, candidate: f64) -> f64 {
        if candidate.abs() > self.bound {
            candidate.signum() * self.bound
        } else {
            candidate
        }
    }

    fn perturb(&self, candidate: f64, noise: &mut dyn NoiseSource) -> f64 {
        candidate + noise.sample() * candidate * self.dt
    }

    /// Full update: integrate, then clamp and perturb in the configured order.
    #[must_use]
    pub fn step(&self, error: f64, previous: f64, noise: &mut dyn NoiseSource) -> f64 {
        let candidate = self.integrate(error, previous);
        match self.perturbation {
            Perturbation::Disabled => self.clamp(candidate),
            Perturbation::ClampThenPerturb => {
                let value = self.perturb(self.clamp(candidate), noise);
                if value.abs() > self.bound {
                    warn!(value, bound = self.bound, "perturbed action left its bound");
                }
                value
            }
            Perturbation::PerturbThenClamp => self.clamp(self.perturb(candidate, noise)),
        }
    }

    /// Updates the stored value from `error` and returns it.
    pub fn act(&mut self, error: f64, noise: &mut dyn NoiseSource) -> f64 {
        self.value = self.step(error, self.value, noise);
        self.value
    }

    /// Keeps the stored value for this tick and returns it.
    pub const fn hold(&self) -> f64 {
        self.value
    }
}
