//! Hierarchical free-energy inference in generalized coordinates.
//!
//! Implements perception as gradient descent on variational free energy
//! under the Free Energy Principle.
//!
//! # Mathematical Foundation
//!
//! Variational Free Energy of one level:
//! ```text
//! F = ½ Σᵢ eᵢ² / σᵢ
//! ```
//!
//! Belief update in generalized coordinates:
//! ```text
//! dμ̃/dt = Dμ̃ − lr · ∂F/∂μ̃
//! ```

mod beliefs;
mod free_energy;
mod precision;

pub use beliefs::{Component, GeneralizedBelief, Order};
pub use free_energy::{
    ChannelVariances, ErrorChannel, ErrorSample, FreeEnergyLevel, LevelConfig, LevelOutput,
    SensoryKind,
};
pub use precision::{precision_weighted_error, Variance};
