//! Beliefs in generalized coordinates.
//!
//! A level believes in a hidden value together with a truncated number of its
//! time-derivatives: `μ`, `μ'` and `μ''`.

use serde::{Deserialize, Serialize};

/// Number of time-derivatives a level tracks on top of the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// `μ` only
    Value,
    /// `μ` and `μ'`
    Velocity,
    /// `μ`, `μ'` and `μ''`
    Acceleration,
}

impl Order {
    /// Highest derivative index tracked (0, 1 or 2).
    #[must_use]
    pub const fn rank(self) -> usize {
        match self {
            Self::Value => 0,
            Self::Velocity => 1,
            Self::Acceleration => 2,
        }
    }

    /// Whether `component` exists at this order.
    #[must_use]
    pub const fn tracks(self, component: Component) -> bool {
        component.index() <= self.rank()
    }
}

/// One coordinate of a generalized belief.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// `μ`
    Value,
    /// `μ'`
    Velocity,
    /// `μ''`
    Acceleration,
}

impl Component {
    /// All components, lowest order first.
    pub const ALL: [Self; 3] = [Self::Value, Self::Velocity, Self::Acceleration];

    /// Derivative index of this component.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Value => 0,
            Self::Velocity => 1,
            Self::Acceleration => 2,
        }
    }

    /// Short label used in dashboards and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Value => "mu",
            Self::Velocity => "mu'",
            Self::Acceleration => "mu''",
        }
    }
}

/// Point estimate `(μ, μ', μ'')` of a hidden state.
///
/// Components above the owning level's order stay at zero. The struct is
/// `Copy`, so a level snapshots it before each update and replaces it whole,
/// which keeps all components on the same tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeneralizedBelief {
    /// Believed value
    pub mu: f64,
    /// Believed first derivative
    pub mu_d1: f64,
    /// Believed second derivative
    pub mu_d2: f64,
}

impl GeneralizedBelief {
    /// A belief at `mu` with no motion.
    #[must_use]
    pub const fn at_rest(mu: f64) -> Self {
        Self {
            mu,
            mu_d1: 0.0,
            mu_d2: 0.0,
        }
    }

    /// Reads one component.
    #[must_use]
    pub const fn component(&self, component: Component) -> f64 {
        match component {
            Component::Value => self.mu,
            Component::Velocity => self.mu_d1,
            Component::Acceleration => self.mu_d2,
        }
    }

    /// Zeroes the components `order` does not track.
    #[must_use]
    pub const fn truncated(self, order: Order) -> Self {
        Self {
            mu: self.mu,
            mu_d1: if order.rank() >= 1 { self.mu_d1 } else { 0.0 },
            mu_d2: if order.rank() >= 2 { self.mu_d2 } else { 0.0 },
        }
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.mu.is_finite() && self.mu_d1.is_finite() && self.mu_d2.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_tracks_components() {
        assert!(Order::Value.tracks(Component::Value));
        assert!(!Order::Value.tracks(Component::Velocity));
        assert!(Order::Velocity.tracks(Component::Velocity));
        assert!(!Order::Velocity.tracks(Component::Acceleration));
        assert!(Order::Acceleration.tracks(Component::Acceleration));
    }

    #[test]
    fn test_truncated_zeroes_untracked() {
        let belief = GeneralizedBelief {
            mu: 1.0,
            mu_d1: 2.0,
            mu_d2: 3.0,
        };
        assert_eq!(belief.truncated(Order::Value), GeneralizedBelief::at_rest(1.0));
        let velocity = belief.truncated(Order::Velocity);
        assert!((velocity.mu_d1 - 2.0).abs() < 1e-12);
        assert!(velocity.mu_d2.abs() < 1e-12);
        assert_eq!(belief.truncated(Order::Acceleration), belief);
    }

    #[test]
    fn test_component_access() {
        let belief = GeneralizedBelief {
            mu: 4.0,
            mu_d1: -1.0,
            mu_d2: 0.5,
        };
        assert!((belief.component(Component::Value) - 4.0).abs() < 1e-12);
        assert!((belief.component(Component::Velocity) + 1.0).abs() < 1e-12);
        assert!((belief.component(Component::Acceleration) - 0.5).abs() < 1e-12);
    }
}
