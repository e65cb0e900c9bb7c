//! Configuration error types.
//!
//! Every error here is raised while assembling a simulation, before the first
//! tick. Numerical divergence during a run is not an error; it is reported by
//! [`crate::simulation::diagnostics`].

use thiserror::Error;

use crate::simulation::hierarchy::LevelKind;
use crate::simulation::inference::{Component, ErrorChannel};

/// Errors that can occur while validating a simulation configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A channel variance is zero, negative or not finite
    #[error("variance of {channel} must be positive and finite, got {value}")]
    InvalidVariance {
        /// Channel name (`e_z0`, `e_w1`, ...)
        channel: &'static str,
        /// Offending value
        value: f64,
    },

    /// Integration step is zero, negative or not finite
    #[error("integration step dt must be positive and finite, got {0}")]
    InvalidStep(f64),

    /// Action bound is zero, negative or not finite
    #[error("action bound must be positive and finite, got {0}")]
    InvalidBound(f64),

    /// A learning rate is zero, negative or not finite
    #[error("learning rate `{name}` must be positive and finite, got {value}")]
    InvalidLearningRate {
        /// Which learning rate
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Simulation horizon or acting threshold is unusable
    #[error("simulation time `{name}` must be finite and {expected}, got {value}")]
    InvalidDuration {
        /// Which duration
        name: &'static str,
        /// What the duration must satisfy
        expected: &'static str,
        /// Offending value
        value: f64,
    },

    /// Noise standard deviation is negative or not finite
    #[error("noise standard deviation must be non-negative and finite, got {0}")]
    InvalidNoise(f64),

    /// Half-width of the viable band is negative or not finite
    #[error("viability range must be finite and non-negative, got {0}")]
    InvalidViability(f64),

    /// A world or model constant is not finite
    #[error("parameter `{name}` must be finite, got {value}")]
    NonFinite {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// The hierarchy contains no levels
    #[error("hierarchy has no levels")]
    EmptyHierarchy,

    /// The same level kind was declared twice
    #[error("level {0} is declared more than once")]
    DuplicateLevel(LevelKind),

    /// A level depends on a level that does not run before it within a tick
    #[error("{reader} reads from {upstream}, which does not run earlier in the tick")]
    ForwardReference {
        /// Level doing the read
        reader: LevelKind,
        /// Level being read
        upstream: LevelKind,
    },

    /// A level depends on a level that is not part of the hierarchy
    #[error("{reader} reads from {upstream}, which is not configured")]
    MissingLevel {
        /// Level doing the read
        reader: LevelKind,
        /// Level being read
        upstream: LevelKind,
    },

    /// A set-point follows a belief component the upstream level does not track
    #[error("{level} does not track the {} of its belief", .component.label())]
    UntrackedComponent {
        /// Upstream level
        level: LevelKind,
        /// Requested component
        component: Component,
    },

    /// A level reads or acts on an error channel that is not active
    #[error("{level} has no active {channel} channel")]
    InactiveChannel {
        /// Level whose channel is missing
        level: LevelKind,
        /// Requested channel
        channel: ErrorChannel,
    },

    /// Two action controllers drive the same effector
    #[error("effector `{0}` is driven by more than one level")]
    DuplicateEffector(&'static str),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Checks that `value` is a usable variance for `channel`.
///
/// # Errors
/// Returns [`ConfigError::InvalidVariance`] for zero, negative or non-finite values.
pub fn ensure_variance(channel: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidVariance { channel, value })
    }
}

/// Checks that `value` is a usable learning rate.
///
/// # Errors
/// Returns [`ConfigError::InvalidLearningRate`] for zero, negative or non-finite values.
pub fn ensure_learning_rate(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidLearningRate { name, value })
    }
}

/// Checks that `dt` is a usable integration step.
///
/// # Errors
/// Returns [`ConfigError::InvalidStep`] for zero, negative or non-finite values.
pub fn ensure_step(dt: f64) -> Result<f64, ConfigError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(ConfigError::InvalidStep(dt))
    }
}

/// Checks that `value` is finite.
///
/// # Errors
/// Returns [`ConfigError::NonFinite`] for NaN or infinite values.
pub fn ensure_finite(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_must_be_positive() {
        assert!(ensure_variance("e_z0", 0.1).is_ok());
        assert_eq!(
            ensure_variance("e_z0", 0.0),
            Err(ConfigError::InvalidVariance {
                channel: "e_z0",
                value: 0.0
            })
        );
        assert!(ensure_variance("e_w0", -1.0).is_err());
        assert!(ensure_variance("e_w1", f64::NAN).is_err());
        assert!(ensure_variance("e_z1", f64::INFINITY).is_err());
    }

    #[test]
    fn test_step_must_be_positive() {
        assert!(ensure_step(0.005).is_ok());
        assert_eq!(ensure_step(0.0), Err(ConfigError::InvalidStep(0.0)));
        assert!(ensure_step(-0.1).is_err());
    }

    #[test]
    fn test_error_messages_name_the_channel() {
        let err = ensure_variance("e_w1", -0.5).unwrap_err();
        assert!(err.to_string().contains("e_w1"));
    }
}
