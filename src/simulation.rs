use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::info;

use crate::config::SimulationConfig;
use crate::counting::{CountSeries, cumulative_counts};
use crate::error::SimResult;
use crate::intensity::{Intensity, Superposed};
use crate::process::{self, EventSequence};
use crate::types::TimeGrid;

pub const LABEL_FIRST: &str = "Process 1";
pub const LABEL_SECOND: &str = "Process 2";
pub const LABEL_COMBINED: &str = "Combined Process";
pub const LABEL_F1: &str = "F1(t)";
pub const LABEL_F2: &str = "F2(t)";
pub const LABEL_F1_F2: &str = "F1(t) + F2(t)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Empirical,
    CombinedEmpirical,
    Theoretical,
    CombinedTheoretical,
}

/// One labelled `(t, y)` series on the run's grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: &'static str,
    pub kind: CurveKind,
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    fn theoretical(label: &'static str, kind: CurveKind, grid: &TimeGrid, values: Vec<f64>) -> Self {
        let points = grid.points().zip(values).collect();
        Curve { label, kind, points }
    }

    pub fn max_y(&self) -> f64 {
        self.points.iter().map(|&(_, y)| y).fold(0.0, f64::max)
    }
}

/// Everything a single run produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub grid: TimeGrid,
    pub first: EventSequence,
    pub second: EventSequence,
    pub combined: EventSequence,
    pub first_counts: CountSeries,
    pub second_counts: CountSeries,
    pub combined_counts: CountSeries,
    /// Six curves in plotting order: three empirical, then three theoretical.
    pub curves: Vec<Curve>,
}

impl SimulationOutcome {
    pub fn curve(&self, label: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.label == label)
    }
}

/// A single seeded run: two independent processes, their superposition, and
/// the closed-form comparison curves.
pub struct Simulation {
    rng: ChaCha20Rng,
    grid: TimeGrid,
    config: SimulationConfig,
}

impl Simulation {
    pub fn from_config(config: SimulationConfig) -> SimResult<Self> {
        let grid = config.grid()?;
        Ok(Simulation {
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            grid,
            config,
        })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Draw process 1, then process 2, from the one shared RNG, merge them and
    /// build all six curves.
    pub fn run(&mut self) -> SimResult<SimulationOutcome> {
        let grid = self.grid;
        let first = process::generate(&self.config.first, &grid, &mut self.rng)?;
        let second = process::generate(&self.config.second, &grid, &mut self.rng)?;
        let combined = process::superpose(&first, &second)?;

        let first_counts = cumulative_counts(&first);
        let second_counts = cumulative_counts(&second);
        let combined_counts = cumulative_counts(&combined);

        let both = Superposed(self.config.first, self.config.second);
        let curves = vec![
            Curve { label: LABEL_FIRST, kind: CurveKind::Empirical, points: first_counts.points(&grid) },
            Curve { label: LABEL_SECOND, kind: CurveKind::Empirical, points: second_counts.points(&grid) },
            Curve {
                label: LABEL_COMBINED,
                kind: CurveKind::CombinedEmpirical,
                points: combined_counts.points(&grid),
            },
            Curve::theoretical(LABEL_F1, CurveKind::Theoretical, &grid, self.config.first.curve(&grid)),
            Curve::theoretical(LABEL_F2, CurveKind::Theoretical, &grid, self.config.second.curve(&grid)),
            Curve::theoretical(LABEL_F1_F2, CurveKind::CombinedTheoretical, &grid, both.curve(&grid)),
        ];

        info!(
            seed = self.config.seed,
            %grid,
            first = first.len(),
            second = second.len(),
            combined = combined.len(),
            expected_first = self.config.first.cumulative(grid.horizon()),
            expected_second = self.config.second.cumulative(grid.horizon()),
            "simulation finished"
        );

        Ok(SimulationOutcome {
            grid,
            first,
            second,
            combined,
            first_counts,
            second_counts,
            combined_counts,
            curves,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seed: u64) -> SimulationOutcome {
        let mut config = SimulationConfig::canonical();
        config.seed = seed;
        Simulation::from_config(config).unwrap().run().unwrap()
    }

    #[test]
    fn outcome_has_six_labelled_curves_in_order() {
        let outcome = run(42);
        let labels: Vec<&str> = outcome.curves.iter().map(|c| c.label).collect();
        assert_eq!(
            labels,
            vec![LABEL_FIRST, LABEL_SECOND, LABEL_COMBINED, LABEL_F1, LABEL_F2, LABEL_F1_F2]
        );
        for curve in &outcome.curves {
            assert_eq!(curve.points.len(), outcome.grid.len(), "{}", curve.label);
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = run(7);
        let b = run(7);
        assert_eq!(a.first, b.first);
        assert_eq!(a.second, b.second);
        assert_eq!(a.curves, b.curves);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = run(1);
        let b = run(2);
        assert_ne!(a.first, b.first);
    }

    #[test]
    fn combined_size_is_sum_of_parts() {
        let outcome = run(42);
        assert_eq!(outcome.combined.len(), outcome.first.len() + outcome.second.len());
        assert_eq!(
            outcome.combined_counts.total(),
            outcome.first_counts.total() + outcome.second_counts.total()
        );
    }

    #[test]
    fn combined_theoretical_is_sum_of_parts() {
        let outcome = run(42);
        let f1 = outcome.curve(LABEL_F1).unwrap();
        let f2 = outcome.curve(LABEL_F2).unwrap();
        let both = outcome.curve(LABEL_F1_F2).unwrap();
        for ((a, b), c) in f1.points.iter().zip(&f2.points).zip(&both.points) {
            assert!((a.1 + b.1 - c.1).abs() < 1e-9);
        }
    }

    #[test]
    fn negative_second_rate_fails_the_run() {
        let mut config = SimulationConfig::canonical();
        config.horizon = 25.0;
        let err = Simulation::from_config(config).unwrap().run().unwrap_err();
        assert!(matches!(err, crate::error::SimError::NegativeRate { .. }));
    }
}
