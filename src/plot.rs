//! Terminal rendering of a run.
//!
//! [`build_chart`] turns a [`SimulationOutcome`] into a ratatui `Chart` with
//! the six named curves, the axis titles, the plot title and a legend. A dim
//! unnamed overlay draws the grid lines; unnamed datasets stay out of the
//! legend. [`show`] owns the terminal: it enters the alternate screen, draws
//! until a key is pressed, then restores the terminal.

use ratatui::{
    Frame,
    crossterm::event::{self, Event, KeyEventKind},
    layout::Constraint,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType, LegendPosition},
};
use tracing::debug;

use crate::error::SimResult;
use crate::simulation::{CurveKind, SimulationOutcome};

pub const TITLE: &str = "Cumulative Event Trajectories and Intensity Functions";
pub const X_TITLE: &str = "Time";
pub const Y_TITLE: &str = "Cumulative Events / Intensity";

const X_TICKS: usize = 5;
const Y_TICKS: usize = 5;

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::LightBlue,
    Color::LightRed,
    Color::Magenta,
];

/// Axis bounds and the grid overlay, computed once per outcome.
pub struct ChartBounds {
    pub x_max: f64,
    pub y_max: f64,
    grid_lines: Vec<[(f64, f64); 2]>,
}

impl ChartBounds {
    pub fn for_outcome(outcome: &SimulationOutcome) -> Self {
        let x_max = outcome.grid.horizon();
        let top = outcome.curves.iter().map(|c| c.max_y()).fold(0.0, f64::max);
        let y_max = nice_ceiling(top);

        let mut grid_lines = Vec::with_capacity(X_TICKS + Y_TICKS);
        for k in 1..X_TICKS {
            let x = x_max * k as f64 / (X_TICKS - 1) as f64;
            grid_lines.push([(x, 0.0), (x, y_max)]);
        }
        for k in 1..Y_TICKS {
            let y = y_max * k as f64 / (Y_TICKS - 1) as f64;
            grid_lines.push([(0.0, y), (x_max, y)]);
        }
        ChartBounds { x_max, y_max, grid_lines }
    }
}

/// Smallest value ≥ `v` of the form m·10ᵏ with m ∈ {1, 2, 5, 10}; at least 1.
fn nice_ceiling(v: f64) -> f64 {
    if v.is_nan() || v <= 1.0 {
        return 1.0;
    }
    let magnitude = 10f64.powi(v.log10().floor() as i32);
    [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|&c| c >= v)
        .unwrap_or(10.0 * magnitude)
}

fn tick_labels(max: f64, ticks: usize) -> Vec<Span<'static>> {
    (0..ticks)
        .map(|k| {
            let v = max * k as f64 / (ticks - 1) as f64;
            Span::raw(format!("{v:.1}"))
        })
        .collect()
}

fn curve_style(kind: CurveKind, color: Color) -> (Marker, Style) {
    let base = Style::default().fg(color);
    match kind {
        CurveKind::Empirical => (Marker::Braille, base),
        CurveKind::CombinedEmpirical => (Marker::Dot, base.add_modifier(Modifier::BOLD)),
        CurveKind::Theoretical => (Marker::Braille, base.add_modifier(Modifier::DIM)),
        CurveKind::CombinedTheoretical => (Marker::HalfBlock, base.add_modifier(Modifier::DIM)),
    }
}

/// Chart for one outcome. Borrows the curve data; build a fresh one per frame.
pub fn build_chart<'a>(outcome: &'a SimulationOutcome, bounds: &'a ChartBounds) -> Chart<'a> {
    let grid_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM);
    let mut datasets: Vec<Dataset<'a>> = bounds
        .grid_lines
        .iter()
        .map(|line| {
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(grid_style)
                .data(line)
        })
        .collect();

    for (curve, color) in outcome.curves.iter().zip(PALETTE.iter().cycle()) {
        let (marker, style) = curve_style(curve.kind, *color);
        datasets.push(
            Dataset::default()
                .name(curve.label)
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(style)
                .data(&curve.points),
        );
    }

    Chart::new(datasets)
        .block(Block::bordered().title(TITLE))
        .x_axis(
            Axis::default()
                .title(X_TITLE)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, bounds.x_max])
                .labels(tick_labels(bounds.x_max, X_TICKS)),
        )
        .y_axis(
            Axis::default()
                .title(Y_TITLE)
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, bounds.y_max])
                .labels(tick_labels(bounds.y_max, Y_TICKS)),
        )
        .legend_position(Some(LegendPosition::TopRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
}

pub fn draw(f: &mut Frame, outcome: &SimulationOutcome, bounds: &ChartBounds) {
    f.render_widget(build_chart(outcome, bounds), f.area());
}

/// Show the chart full-screen until any key is pressed.
pub fn show(outcome: &SimulationOutcome) -> SimResult<()> {
    let bounds = ChartBounds::for_outcome(outcome);
    let mut terminal = ratatui::try_init()?;
    debug!(x_max = bounds.x_max, y_max = bounds.y_max, "chart opened");

    let result = (|| -> SimResult<()> {
        loop {
            terminal.draw(|f| draw(f, outcome, &bounds))?;
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                return Ok(());
            }
        }
    })();

    ratatui::try_restore()?;
    result
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::Simulation;

    fn outcome() -> SimulationOutcome {
        Simulation::from_config(SimulationConfig::canonical()).unwrap().run().unwrap()
    }

    fn render(outcome: &SimulationOutcome, width: u16, height: u16) -> String {
        let bounds = ChartBounds::for_outcome(outcome);
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, outcome, &bounds)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn nice_ceiling_rounds_up_to_friendly_values() {
        assert_eq!(nice_ceiling(0.0), 1.0);
        assert_eq!(nice_ceiling(1.0), 1.0);
        assert_eq!(nice_ceiling(3.0), 5.0);
        assert_eq!(nice_ceiling(65.0), 100.0);
        assert_eq!(nice_ceiling(100.0), 100.0);
        assert_eq!(nice_ceiling(140.0), 200.0);
    }

    #[test]
    fn bounds_cover_every_curve() {
        let outcome = outcome();
        let bounds = ChartBounds::for_outcome(&outcome);
        assert_eq!(bounds.x_max, 10.0);
        for curve in &outcome.curves {
            assert!(curve.max_y() <= bounds.y_max, "{} exceeds y bound", curve.label);
        }
        assert_eq!(bounds.grid_lines.len(), X_TICKS - 1 + Y_TICKS - 1);
    }

    #[test]
    fn rendered_chart_shows_title_axes_and_legend() {
        let text = render(&outcome(), 160, 48);
        assert!(text.contains(TITLE), "missing title");
        assert!(text.contains(X_TITLE), "missing x title");
        for label in [
            "Process 1",
            "Process 2",
            "Combined Process",
            "F1(t)",
            "F2(t)",
            "F1(t) + F2(t)",
        ] {
            assert!(text.contains(label), "legend is missing {label}");
        }
    }

    #[test]
    fn tick_labels_span_the_axis() {
        let labels = tick_labels(10.0, 5);
        let text: Vec<String> = labels.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["0.0", "2.5", "5.0", "7.5", "10.0"]);
    }
}
