//! Fixed channel precisions.
//!
//! Each error channel is weighted by a variance set at configuration time.
//! Precision is its reciprocal, so a residual contributes `e / σ` to the
//! gradient and `e² / σ` to free energy.

use crate::simulation::error::{ensure_variance, ConfigError};

/// A validated, strictly positive variance owned by one error channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Variance(f64);

impl Variance {
    /// Validates `value` as the variance of `channel`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidVariance`] for zero, negative or non-finite values.
    pub fn new(channel: &'static str, value: f64) -> Result<Self, ConfigError> {
        ensure_variance(channel, value).map(Self)
    }

    /// The raw variance σ.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Precision 1/σ.
    #[must_use]
    pub fn precision(self) -> f64 {
        1.0 / self.0
    }

    /// Precision-weighted residual `e / σ` (a gradient term).
    #[must_use]
    pub fn weigh(self, residual: f64) -> f64 {
        residual / self.0
    }
}

/// Precision-weighted squared error `e² / σ`.
#[must_use]
pub fn precision_weighted_error(residual: f64, variance: Variance) -> f64 {
    residual.powi(2) / variance.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_rejects_non_positive() {
        assert!(Variance::new("e_z0", 0.0).is_err());
        assert!(Variance::new("e_z0", -0.1).is_err());
        assert!(Variance::new("e_z0", f64::NAN).is_err());
        assert!(Variance::new("e_z0", 0.1).is_ok());
    }

    #[test]
    fn test_weighted_error() {
        let sigma = Variance::new("e_z0", 0.1).unwrap();
        assert!((precision_weighted_error(2.0, sigma) - 40.0).abs() < 1e-9);
        assert!((precision_weighted_error(-2.0, sigma) - 40.0).abs() < 1e-9);
        assert!((sigma.weigh(0.5) - 5.0).abs() < 1e-9);
        assert!((sigma.precision() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_error_is_non_negative() {
        let sigma = Variance::new("e_w0", 3.0).unwrap();
        for residual in [-10.0, -0.1, 0.0, 0.1, 10.0] {
            assert!(precision_weighted_error(residual, sigma) >= 0.0);
        }
    }
}
