//! Zero-mean noise sources for sensing and action perturbation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::simulation::error::ConfigError;

/// A stream of zero-mean noise samples.
pub trait NoiseSource {
    /// Draws the next sample.
    fn sample(&mut self) -> f64;
}

/// Noise that is always exactly zero; makes runs fully deterministic.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl NoiseSource for Silent {
    fn sample(&mut self) -> f64 {
        0.0
    }
}

/// Gaussian noise `N(0, std_dev²)` from a seeded generator.
#[derive(Clone, Debug)]
pub struct GaussianNoise {
    rng: StdRng,
    normal: Normal<f64>,
}

impl GaussianNoise {
    /// Creates a seeded Gaussian source.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidNoise`] if `std_dev` is negative or not finite.
    pub fn new(std_dev: f64, seed: u64) -> Result<Self, ConfigError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(ConfigError::InvalidNoise(std_dev));
        }
        let normal = Normal::new(0.0, std_dev).map_err(|_| ConfigError::InvalidNoise(std_dev))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }
}

impl NoiseSource for GaussianNoise {
    fn sample(&mut self) -> f64 {
        self.normal.sample(&mut self.rng)
    }
}

/// Serializable description of a noise source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseSpec {
    /// No noise at all
    Silent,
    /// Zero-mean Gaussian noise
    Gaussian {
        /// Standard deviation
        std_dev: f64,
    },
}

impl NoiseSpec {
    /// Validates the parameters without building a source.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidNoise`] for a bad standard deviation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Silent => Ok(()),
            Self::Gaussian { std_dev } if std_dev.is_finite() && std_dev >= 0.0 => Ok(()),
            Self::Gaussian { std_dev } => Err(ConfigError::InvalidNoise(std_dev)),
        }
    }

    /// Builds a boxed noise source seeded with `seed`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidNoise`] for a bad standard deviation.
    pub fn build(&self, seed: u64) -> Result<Box<dyn NoiseSource>, ConfigError> {
        match *self {
            Self::Silent => Ok(Box::new(Silent)),
            Self::Gaussian { std_dev } => Ok(Box::new(GaussianNoise::new(std_dev, seed)?)),
        }
    }
}
