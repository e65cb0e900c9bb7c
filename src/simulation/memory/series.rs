//! Append-only time series for per-tick diagnostics.

/// An ordered, append-only sequence of per-tick values.
///
/// Only the simulation appends; everything else sees a read-only view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates an empty series with room for `capacity` ticks.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends the value for the next tick.
    pub(crate) fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Returns the number of recorded ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the value recorded at `tick`.
    #[must_use]
    pub fn get(&self, tick: usize) -> Option<f64> {
        self.values.get(tick).copied()
    }

    /// Returns the most recently recorded value.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Read-only view of all values, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Iterates over values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Smallest and largest finite values, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
