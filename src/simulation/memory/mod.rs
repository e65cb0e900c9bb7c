//! Per-tick records of the simulation.
//!
//! Every channel owns an append-only [`TimeSeries`]; plots and tests read
//! them through shared references only.

mod series;

pub use series::TimeSeries;

use crate::simulation::environment::{Effector, TrueState};
use crate::simulation::inference::{Component, ErrorChannel, LevelOutput, Order};

/// Beliefs, errors, set-points and free energy of one level.
///
/// Channels a level does not compute stay empty.
#[derive(Clone, Debug, Default)]
pub struct LevelHistory {
    mu: TimeSeries,
    mu_d1: TimeSeries,
    mu_d2: TimeSeries,
    e_z0: TimeSeries,
    e_z1: TimeSeries,
    e_w0: TimeSeries,
    e_w1: TimeSeries,
    setpoint: TimeSeries,
    vfe: TimeSeries,
}

impl LevelHistory {
    pub(crate) fn record(&mut self, output: &LevelOutput, order: Order) {
        for component in Component::ALL {
            if order.tracks(component) {
                let value = output.belief.component(component);
                self.belief_mut(component).push(value);
            }
        }
        for channel in ErrorChannel::ALL {
            if let Some(value) = output.errors.get(channel) {
                self.error_mut(channel).push(value);
            }
        }
        self.setpoint.push(output.setpoint);
        self.vfe.push(output.vfe);
    }

    /// Series of one belief component.
    #[must_use]
    pub const fn belief(&self, component: Component) -> &TimeSeries {
        match component {
            Component::Value => &self.mu,
            Component::Velocity => &self.mu_d1,
            Component::Acceleration => &self.mu_d2,
        }
    }

    /// Series of one error channel.
    #[must_use]
    pub const fn error(&self, channel: ErrorChannel) -> &TimeSeries {
        match channel {
            ErrorChannel::Z0 => &self.e_z0,
            ErrorChannel::Z1 => &self.e_z1,
            ErrorChannel::W0 => &self.e_w0,
            ErrorChannel::W1 => &self.e_w1,
        }
    }

    /// Set-point used each tick.
    #[must_use]
    pub const fn setpoint(&self) -> &TimeSeries {
        &self.setpoint
    }

    /// Variational free energy each tick.
    #[must_use]
    pub const fn vfe(&self) -> &TimeSeries {
        &self.vfe
    }

    /// Number of recorded ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vfe.len()
    }

    /// Returns true before the first tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vfe.is_empty()
    }

    /// Every non-empty series with its label.
    pub fn channels(&self) -> impl Iterator<Item = (&'static str, &TimeSeries)> {
        [
            ("mu", &self.mu),
            ("mu'", &self.mu_d1),
            ("mu''", &self.mu_d2),
            ("e_z0", &self.e_z0),
            ("e_z1", &self.e_z1),
            ("e_w0", &self.e_w0),
            ("e_w1", &self.e_w1),
            ("setpoint", &self.setpoint),
            ("vfe", &self.vfe),
        ]
        .into_iter()
        .filter(|(_, series)| !series.is_empty())
    }

    fn belief_mut(&mut self, component: Component) -> &mut TimeSeries {
        match component {
            Component::Value => &mut self.mu,
            Component::Velocity => &mut self.mu_d1,
            Component::Acceleration => &mut self.mu_d2,
        }
    }

    fn error_mut(&mut self, channel: ErrorChannel) -> &mut TimeSeries {
        match channel {
            ErrorChannel::Z0 => &mut self.e_z0,
            ErrorChannel::Z1 => &mut self.e_z1,
            ErrorChannel::W0 => &mut self.e_w0,
            ErrorChannel::W1 => &mut self.e_w1,
        }
    }
}

/// Ground-truth world quantities, one entry per tick.
#[derive(Clone, Debug, Default)]
pub struct WorldHistory {
    /// Body temperature
    pub temperature: TimeSeries,
    /// Rate of body temperature change
    pub temperature_change: TimeSeries,
    /// Scripted environmental warming
    pub shock: TimeSeries,
    /// Scripted luminance change
    pub luminance: TimeSeries,
    /// Heating applied by the world (lagged heat action)
    pub heat: TimeSeries,
    /// Position along the warmth gradient
    pub position: TimeSeries,
    /// Velocity applied by the world (lagged locomotion action)
    pub velocity: TimeSeries,
    /// Ambient warmth at the agent's position
    pub warmth: TimeSeries,
}

impl WorldHistory {
    pub(crate) fn record(&mut self, state: &TrueState) {
        self.temperature.push(state.temperature);
        self.temperature_change.push(state.temperature_change);
        self.shock.push(state.shock);
        self.luminance.push(state.luminance);
        self.heat.push(state.heat);
        self.position.push(state.position);
        self.velocity.push(state.velocity);
        self.warmth.push(state.warmth);
    }

    /// Every series with its label.
    pub fn channels(&self) -> impl Iterator<Item = (&'static str, &TimeSeries)> {
        [
            ("temperature", &self.temperature),
            ("temperature_change", &self.temperature_change),
            ("shock", &self.shock),
            ("luminance", &self.luminance),
            ("heat", &self.heat),
            ("position", &self.position),
            ("velocity", &self.velocity),
            ("warmth", &self.warmth),
        ]
        .into_iter()
    }
}

/// Action values as computed by the controllers, one entry per tick.
///
/// Only effectors with a controller are recorded.
#[derive(Clone, Debug, Default)]
pub struct ActionHistory {
    heat: TimeSeries,
    locomotion: TimeSeries,
}

impl ActionHistory {
    pub(crate) fn record(&mut self, effector: Effector, value: f64) {
        match effector {
            Effector::Heat => self.heat.push(value),
            Effector::Locomotion => self.locomotion.push(value),
        }
    }

    /// Series of `effector`.
    #[must_use]
    pub const fn get(&self, effector: Effector) -> &TimeSeries {
        match effector {
            Effector::Heat => &self.heat,
            Effector::Locomotion => &self.locomotion,
        }
    }
}
