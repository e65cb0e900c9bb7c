pub mod field;
pub mod render;

use ratatui::style::Color;

use crate::simulation::environment::Effector;
use crate::simulation::hierarchy::LevelKind;
use crate::simulation::inference::Component;
use crate::simulation::memory::TimeSeries;
use crate::simulation::runner::Simulation;

use self::field::downsample;

/// Snapshot of a running simulation for the HUD.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardState {
    pub variant: String,
    pub time: f64,
    pub progress: f64,
    pub temperature: f64,
    /// Interoceptive set-point of the last tick, if that level exists
    pub setpoint: Option<f64>,
    pub heat: f64,
    pub locomotion: f64,
    pub position: f64,
    /// Free energy summed over levels at the last tick
    pub total_vfe: f64,
    /// Fraction of ticks so far with a viable body temperature
    pub viability: f64,
}

impl DashboardState {
    /// Captures the latest values of `sim`.
    #[must_use]
    pub fn from_simulation(sim: &Simulation, variant: &str) -> Self {
        let hierarchy = sim.hierarchy();
        let state = sim.world().state();
        let last = hierarchy.ticks().checked_sub(1);
        Self {
            variant: variant.to_string(),
            time: sim.time(),
            progress: sim.progress(),
            temperature: state.temperature,
            setpoint: hierarchy
                .level(LevelKind::Interoception)
                .and_then(|level| level.history().setpoint().last()),
            heat: hierarchy.actions().get(Effector::Heat).last().unwrap_or(0.0),
            locomotion: hierarchy
                .actions()
                .get(Effector::Locomotion)
                .last()
                .unwrap_or(0.0),
            position: state.position,
            total_vfe: last.and_then(|tick| hierarchy.total_vfe(tick)).unwrap_or(0.0),
            viability: sim.viability().fraction(),
        }
    }

    /// One-line summary shown above the charts.
    #[must_use]
    pub fn format_hud(&self) -> String {
        let setpoint = self
            .setpoint
            .map_or_else(|| "-".to_string(), |sp| format!("{sp:.2}"));
        format!(
            "{} | t: {:.1} ({:.0}%) | Temp: {:.2} | Sp: {} | Heat: {:+.2} | Swim: {:+.2} | Pos: {:.2} | VFE: {:.3} | Viable: {:.0}%",
            self.variant,
            self.time,
            self.progress * 100.0,
            self.temperature,
            setpoint,
            self.heat,
            self.locomotion,
            self.position,
            self.total_vfe,
            self.viability * 100.0,
        )
    }
}

/// One line of a chart.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: Color,
}

impl PlotSeries {
    fn from_series(
        label: &str,
        series: &TimeSeries,
        dt: f64,
        max_points: usize,
        color: Color,
    ) -> Self {
        Self {
            label: label.to_string(),
            points: downsample(series.as_slice(), dt, max_points),
            color,
        }
    }
}

/// A titled chart with several lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub title: &'static str,
    pub series: Vec<PlotSeries>,
}

/// Builds the temperature, action and belief charts of `sim`.
#[must_use]
pub fn build_panels(sim: &Simulation, dt: f64, max_points: usize) -> Vec<Panel> {
    let hierarchy = sim.hierarchy();
    let world = sim.world().history();

    let mut temperature = vec![PlotSeries::from_series(
        "temperature",
        &world.temperature,
        dt,
        max_points,
        Color::Red,
    )];
    if let Some(level) = hierarchy.level(LevelKind::Interoception) {
        temperature.push(PlotSeries::from_series(
            "setpoint",
            level.history().setpoint(),
            dt,
            max_points,
            Color::Yellow,
        ));
    }

    let mut actions = vec![PlotSeries::from_series(
        "shock",
        &world.shock,
        dt,
        max_points,
        Color::Magenta,
    )];
    for (effector, color) in [(Effector::Heat, Color::Cyan), (Effector::Locomotion, Color::Green)] {
        let series = hierarchy.actions().get(effector);
        if !series.is_empty() {
            actions.push(PlotSeries::from_series(
                effector.name(),
                series,
                dt,
                max_points,
                color,
            ));
        }
    }

    let palette = [Color::Blue, Color::Red, Color::Green, Color::Magenta];
    let beliefs = hierarchy
        .levels()
        .zip(palette)
        .map(|((kind, level), color)| {
            PlotSeries::from_series(
                kind.name(),
                level.history().belief(Component::Value),
                dt,
                max_points,
                color,
            )
        })
        .collect();

    vec![
        Panel {
            title: "Body temperature",
            series: temperature,
        },
        Panel {
            title: "Shock and actions",
            series: actions,
        },
        Panel {
            title: "Beliefs (mu)",
            series: beliefs,
        },
    ]
}

/// Free-energy histories of every level, in pipeline order.
#[must_use]
pub fn vfe_rows(sim: &Simulation) -> Vec<(LevelKind, &[f64])> {
    sim.hierarchy()
        .levels()
        .map(|(kind, level)| (kind, level.history().vfe().as_slice()))
        .collect()
}
