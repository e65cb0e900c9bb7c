pub mod action;
pub mod agent;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod hierarchy;
pub mod inference;
pub mod memory;
pub mod noise;
pub mod params;
pub mod runner;

pub use agent::AgentVariant;
pub use config::SimulationConfig;
pub use error::ConfigError;
pub use hierarchy::{Hierarchy, LevelKind, TickPhase, TickReport};
pub use runner::Simulation;
