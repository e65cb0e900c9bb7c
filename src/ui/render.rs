use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use super::{DashboardState, Panel, PlotSeries};
use crate::simulation::hierarchy::LevelKind;

/// Computes the four quadrant areas for the dashboard layout.
#[must_use]
pub fn compute_quadrant_layout(area: Rect) -> Vec<Rect> {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(vertical[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(vertical[1]);

    vec![top[0], top[1], bottom[0], bottom[1]]
}

/// Axis bounds covering every point, padded so flat lines stay visible.
#[must_use]
pub fn chart_bounds(series: &[PlotSeries]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in series.iter().flat_map(|s| s.points.iter()) {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if !x[0].is_finite() {
        return ([0.0, 1.0], [-1.0, 1.0]);
    }
    if x[1] <= x[0] {
        x[1] = x[0] + 1.0;
    }
    let pad = ((y[1] - y[0]) * 0.05).max(0.5);
    ([x[0], x[1]], [y[0] - pad, y[1] + pad])
}

fn draw_panel(f: &mut Frame, panel: &Panel, area: Rect) {
    let ([x0, x1], [y0, y1]) = chart_bounds(&panel.series);
    let datasets: Vec<Dataset> = panel
        .series
        .iter()
        .map(|s| {
            Dataset::default()
                .name(s.label.as_str())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(s.color))
                .data(&s.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(panel.title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([x0, x1])
                .labels([format!("{x0:.0}"), format!("{x1:.0}")]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y0, y1])
                .labels([format!("{y0:.1}"), format!("{y1:.1}")]),
        );
    f.render_widget(chart, area);
}

fn draw_field(f: &mut Frame, kinds: &[LevelKind], field: Vec<String>, area: Rect) {
    let text: Vec<Line> = kinds
        .iter()
        .zip(field)
        .flat_map(|(kind, row)| {
            [
                Line::from(Span::styled(
                    kind.name(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::raw(row)),
            ]
        })
        .collect();

    let widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Free energy"))
        .style(Style::default().fg(Color::White).bg(Color::Reset));
    f.render_widget(widget, area);
}

/// Draws the HUD line, three charts and the free-energy field.
pub fn draw_dashboard(
    f: &mut Frame,
    state: &DashboardState,
    panels: &[Panel],
    kinds: &[LevelKind],
    field: Vec<String>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // HUD
            Constraint::Min(0),    // Charts
        ])
        .split(f.area());

    let hud = Paragraph::new(Span::styled(
        state.format_hud(),
        Style::default().add_modifier(Modifier::REVERSED),
    ));
    f.render_widget(hud, chunks[0]);

    let quadrants = compute_quadrant_layout(chunks[1]);
    for (panel, area) in panels.iter().zip(&quadrants) {
        draw_panel(f, panel, *area);
    }
    if let Some(area) = quadrants.get(3) {
        draw_field(f, kinds, field, *area);
    }
}
