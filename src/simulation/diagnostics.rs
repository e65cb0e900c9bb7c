//! Post-hoc analysis of finished runs.
//!
//! Numerical trouble never interrupts a run; it is found here afterwards.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::simulation::config::{SimulationConfig, ViabilityBand};
use crate::simulation::environment::Effector;
use crate::simulation::error::ConfigError;
use crate::simulation::memory::TimeSeries;
use crate::simulation::params::DIVERGENCE_CEILING;
use crate::simulation::runner::Simulation;

/// First place a run went numerically wrong.
#[derive(Clone, Debug, PartialEq)]
pub struct DivergenceReport {
    /// Series label, `level/channel` for level series
    pub series: String,
    /// First offending tick
    pub tick: usize,
    /// Offending value
    pub value: f64,
}

/// How well body temperature stayed inside the viable band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViabilityReport {
    /// Ticks inside the band
    pub inside: usize,
    /// Ticks inspected
    pub total: usize,
    /// Largest distance from the band's center
    pub worst_excursion: f64,
}

impl ViabilityReport {
    /// Fraction of ticks inside the band; 1 for an empty run.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.inside as f64 / self.total as f64
        }
    }
}

/// Summary of one ensemble member.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleMember {
    /// Seed the member ran with
    pub seed: u64,
    /// Viability of its body temperature
    pub viability: ViabilityReport,
    /// Free energy summed over levels at the last tick
    pub final_vfe: f64,
    /// First divergence, if any
    pub divergence: Option<DivergenceReport>,
}

/// First tick at which `series` is non-finite or exceeds `ceiling` in magnitude.
#[must_use]
pub fn first_divergence(series: &TimeSeries, ceiling: f64) -> Option<(usize, f64)> {
    series
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite() || value.abs() > ceiling)
}

/// Scans every recorded series of `sim` and reports the earliest divergence.
pub fn divergence_report(sim: &Simulation, ceiling: f64) -> Option<DivergenceReport> {
    let mut found: Option<DivergenceReport> = None;
    let mut consider = |label: String, series: &TimeSeries| {
        if let Some((tick, value)) = first_divergence(series, ceiling) {
            if found.as_ref().map_or(true, |report| tick < report.tick) {
                found = Some(DivergenceReport {
                    series: label,
                    tick,
                    value,
                });
            }
        }
    };

    for (name, series) in sim.world().history().channels() {
        consider(format!("world/{name}"), series);
    }
    for (kind, level) in sim.hierarchy().levels() {
        for (name, series) in level.history().channels() {
            consider(format!("{kind}/{name}"), series);
        }
    }
    for effector in Effector::ALL {
        consider(
            format!("action/{}", effector.name()),
            sim.hierarchy().actions().get(effector),
        );
    }

    if let Some(report) = &found {
        warn!(
            series = %report.series,
            tick = report.tick,
            value = report.value,
            "series diverged"
        );
    }
    found
}

/// Viability of `temperature` against `band`.
#[must_use]
pub fn viability_report(temperature: &TimeSeries, band: ViabilityBand) -> ViabilityReport {
    let mut inside = 0;
    let mut worst_excursion: f64 = 0.0;
    for value in temperature.iter() {
        if band.contains(value) {
            inside += 1;
        }
        worst_excursion = worst_excursion.max((value - band.center).abs());
    }
    ViabilityReport {
        inside,
        total: temperature.len(),
        worst_excursion,
    }
}

/// Runs `config` once per seed, in parallel, and summarizes each run.
///
/// Viability is judged against the band in `config`.
///
/// # Errors
/// Returns the configuration error if the simulation cannot be built.
pub fn run_ensemble(
    config: &SimulationConfig,
    seeds: &[u64],
) -> Result<Vec<EnsembleMember>, ConfigError> {
    info!(members = seeds.len(), "running ensemble");
    seeds
        .par_iter()
        .map(|&seed| {
            let mut sim = Simulation::new(&SimulationConfig {
                seed,
                ..config.clone()
            })?;
            sim.run();
            let last = sim.hierarchy().ticks().saturating_sub(1);
            Ok(EnsembleMember {
                seed,
                viability: sim.viability(),
                final_vfe: sim.hierarchy().total_vfe(last).unwrap_or(0.0),
                divergence: divergence_report(&sim, DIVERGENCE_CEILING),
            })
        })
        .collect()
}

/// Trailing moving average, padded on the left with the first value.
///
/// The output has the same length as `values`.
#[must_use]
pub fn running_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let mut sum = first * window as f64;
    let mut out = Vec::with_capacity(values.len());
    for (i, &value) in values.iter().enumerate() {
        let leaving = if i >= window { values[i - window] } else { first };
        sum += value - leaving;
        out.push(sum / window as f64);
    }
    out
}
