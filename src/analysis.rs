use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::counting::{CountSeries, cumulative_counts};
use crate::error::SimResult;
use crate::intensity::Intensity;
use crate::process::{self, EventSequence};
use crate::simulation::SimulationOutcome;
use crate::types::TimeGrid;

// ── Invariants of a finished run ──────────────────────────────────────────────

/// A property a finished run failed to satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// A timestamp is not exactly a grid point in [0, T).
    OffGrid { sequence: &'static str, t: f64 },
    /// N(t) decreased somewhere.
    NotMonotone { sequence: &'static str, index: usize },
    /// N at the last grid point differs from the sequence size.
    FinalCountMismatch { sequence: &'static str, count: u64, len: usize },
    /// N_combined(t) ≠ N_1(t) + N_2(t).
    NotAdditive { index: usize, combined: u64, first: u64, second: u64 },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::OffGrid { sequence, t } => {
                write!(f, "{sequence}: timestamp {t} is not a grid point")
            }
            Violation::NotMonotone { sequence, index } => {
                write!(f, "{sequence}: count decreases at grid index {index}")
            }
            Violation::FinalCountMismatch { sequence, count, len } => {
                write!(f, "{sequence}: final count {count} != {len} events")
            }
            Violation::NotAdditive { index, combined, first, second } => write!(
                f,
                "grid index {index}: combined count {combined} != {first} + {second}"
            ),
        }
    }
}

fn check_sequence(
    name: &'static str,
    seq: &EventSequence,
    counts: &CountSeries,
    out: &mut Vec<Violation>,
) {
    let grid = seq.grid();
    for t in seq.times() {
        if !(0.0..grid.horizon()).contains(&t) || grid.index_of(t).is_none() {
            out.push(Violation::OffGrid { sequence: name, t });
        }
    }
    if let Some(index) = counts.as_slice().windows(2).position(|w| w[0] > w[1]) {
        out.push(Violation::NotMonotone { sequence: name, index: index + 1 });
    }
    if counts.total() != seq.len() as u64 {
        out.push(Violation::FinalCountMismatch { sequence: name, count: counts.total(), len: seq.len() });
    }
}

/// Check grid alignment, monotone counts, final count and superposition
/// additivity on a finished run. Empty means every check passed.
pub fn verify_outcome(outcome: &SimulationOutcome) -> Vec<Violation> {
    let mut out = Vec::new();
    check_sequence("process 1", &outcome.first, &outcome.first_counts, &mut out);
    check_sequence("process 2", &outcome.second, &outcome.second_counts, &mut out);
    check_sequence("combined", &outcome.combined, &outcome.combined_counts, &mut out);

    let first = outcome.first_counts.as_slice();
    let second = outcome.second_counts.as_slice();
    let combined = outcome.combined_counts.as_slice();
    for (index, ((&c, &a), &b)) in combined.iter().zip(first).zip(second).enumerate() {
        if c != a + b {
            out.push(Violation::NotAdditive { index, combined: c, first: a, second: b });
            break;
        }
    }
    out
}

// ── Repeated-trial statistics ─────────────────────────────────────────────────

/// Distribution of a scalar across repeated trials.
#[derive(Debug, Clone, Serialize)]
pub struct TrialStats {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl TrialStats {
    /// Relative error of the mean against `expected`.
    pub fn relative_error(&self, expected: f64) -> f64 {
        if expected == 0.0 {
            self.mean.abs()
        } else {
            (self.mean - expected).abs() / expected.abs()
        }
    }
}

/// Summary statistics with linearly interpolated percentiles. `None` for an
/// empty input.
pub fn summarize(values: &mut [f64]) -> Option<TrialStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();

    let interp = |p: f64| -> f64 {
        let h = p * (n - 1) as f64;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = h - lo as f64;
        values[lo] * (1.0 - frac) + values[hi] * frac
    };

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };

    Some(TrialStats {
        n,
        mean,
        std_dev: variance.sqrt(),
        min: values[0],
        p5: interp(0.05),
        p50: interp(0.50),
        p95: interp(0.95),
        max: values[n - 1],
    })
}

fn trial_rng(seed: u64, trial: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed.wrapping_add(trial))
}

/// Final event counts of `runs` independent paths, in parallel. Trial `i`
/// uses seed `seed + i`, so results do not depend on thread scheduling.
pub fn run_trials<I>(intensity: &I, grid: &TimeGrid, seed: u64, runs: u64) -> SimResult<Vec<u64>>
where
    I: Intensity + Sync + ?Sized,
{
    (0..runs)
        .into_par_iter()
        .map(|i| {
            let mut rng = trial_rng(seed, i);
            process::generate(intensity, grid, &mut rng).map(|seq| seq.len() as u64)
        })
        .collect()
}

/// Average of N(t) across trials, with its worst deviation from Λ(t).
#[derive(Debug, Clone)]
pub struct MeanPath {
    pub mean: Vec<f64>,
    pub max_abs_deviation: f64,
    /// Final count of each trial, in trial order.
    pub totals: Vec<u64>,
}

/// Average cumulative path over `runs` independent trials.
pub fn mean_path<I>(intensity: &I, grid: &TimeGrid, seed: u64, runs: u64) -> SimResult<MeanPath>
where
    I: Intensity + Sync + ?Sized,
{
    let paths: Vec<CountSeries> = (0..runs)
        .into_par_iter()
        .map(|i| {
            let mut rng = trial_rng(seed, i);
            process::generate(intensity, grid, &mut rng).map(|seq| cumulative_counts(&seq))
        })
        .collect::<SimResult<_>>()?;

    let totals: Vec<u64> = paths.iter().map(CountSeries::total).collect();
    let mut sums = vec![0u64; grid.len()];
    for path in &paths {
        for (s, &n) in sums.iter_mut().zip(path.as_slice()) {
            *s += n;
        }
    }

    let denom = runs.max(1) as f64;
    let mean: Vec<f64> = sums.iter().map(|&s| s as f64 / denom).collect();
    let max_abs_deviation = grid
        .points()
        .zip(&mean)
        .map(|(t, m)| (m - intensity.cumulative(t)).abs())
        .fold(0.0, f64::max);

    debug!(runs, %grid, max_abs_deviation, "mean path");
    Ok(MeanPath { mean, max_abs_deviation, totals })
}

/// One row of the convergence report: how close repeated trials at a given dt
/// get to Λ.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceRow {
    pub dt: f64,
    pub runs: u64,
    pub expected_total: f64,
    pub total: TrialStats,
    pub relative_error: f64,
    pub max_path_deviation: f64,
}

pub fn convergence_row<I>(intensity: &I, grid: &TimeGrid, seed: u64, runs: u64) -> SimResult<Option<ConvergenceRow>>
where
    I: Intensity + Sync + ?Sized,
{
    let path = mean_path(intensity, grid, seed, runs)?;
    let mut totals: Vec<f64> = path.totals.iter().map(|&n| n as f64).collect();
    let Some(total) = summarize(&mut totals) else {
        return Ok(None);
    };
    let expected_total = intensity.cumulative(grid.horizon());
    Ok(Some(ConvergenceRow {
        dt: grid.dt(),
        runs,
        expected_total,
        relative_error: total.relative_error(expected_total),
        total,
        max_path_deviation: path.max_abs_deviation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::intensity::{Affine, process_one};
    use crate::simulation::Simulation;

    fn outcome(seed: u64) -> SimulationOutcome {
        let mut config = SimulationConfig::canonical();
        config.seed = seed;
        Simulation::from_config(config).unwrap().run().unwrap()
    }

    #[test]
    fn canonical_runs_have_no_violations() {
        for seed in 0..5 {
            let v = verify_outcome(&outcome(seed));
            assert!(v.is_empty(), "seed {seed}: {v:?}");
        }
    }

    #[test]
    fn tampered_combined_counts_break_additivity() {
        let mut o = outcome(3);
        o.combined = o.first.clone();
        o.combined_counts = o.first_counts.clone();
        let v = verify_outcome(&o);
        if o.second.is_empty() {
            assert!(v.is_empty());
        } else {
            assert!(v.iter().any(|v| matches!(v, Violation::NotAdditive { .. })), "{v:?}");
        }
    }

    #[test]
    fn summarize_known_values() {
        let mut v = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        let s = summarize(&mut v).unwrap();
        assert_eq!(s.n, 5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.p50, 3.0);
        assert!((s.mean - 3.0).abs() < 1e-12);
        assert!((s.std_dev - 2.5_f64.sqrt()).abs() < 1e-12);
        assert!((s.p5 - 1.2).abs() < 1e-12);
    }

    #[test]
    fn summarize_empty_is_none() {
        assert!(summarize(&mut []).is_none());
    }

    #[test]
    fn relative_error_against_expected() {
        let mut v = vec![33.0, 37.0];
        let s = summarize(&mut v).unwrap();
        assert!(s.relative_error(35.0) < 1e-12);
        assert!((s.relative_error(40.0) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn trials_are_deterministic_across_thread_schedules() {
        let grid = TimeGrid::new(10.0, 0.01).unwrap();
        let a = run_trials(&process_one(), &grid, 99, 32).unwrap();
        let b = run_trials(&process_one(), &grid, 99, 32).unwrap();
        assert_eq!(a, b);
    }

    /// T=10, dt=0.01, λ1: mean over 1000 runs within ±10 % of Λ1(10) = 35.
    #[test]
    fn mean_over_1000_runs_is_within_ten_percent_of_35() {
        let grid = TimeGrid::new(10.0, 0.01).unwrap();
        let mut totals: Vec<f64> = run_trials(&process_one(), &grid, 42, 1000)
            .unwrap()
            .into_iter()
            .map(|n| n as f64)
            .collect();
        let stats = summarize(&mut totals).unwrap();
        assert!(stats.relative_error(35.0) <= 0.10, "mean {:.2}", stats.mean);
    }

    /// Refining dt must pull the averaged path toward Λ. The coarse grid
    /// loses most of its mass to the one-event-per-bin collapse.
    #[test]
    fn finer_grid_converges_toward_theory() {
        let rate = Affine::new(5.0, 0.0);
        let coarse = TimeGrid::new(10.0, 0.2).unwrap();
        let fine = TimeGrid::new(10.0, 0.01).unwrap();
        let coarse_dev = mean_path(&rate, &coarse, 1, 400).unwrap().max_abs_deviation;
        let fine_dev = mean_path(&rate, &fine, 1, 400).unwrap().max_abs_deviation;
        assert!(
            fine_dev < coarse_dev,
            "fine deviation {fine_dev:.3} should be below coarse {coarse_dev:.3}"
        );
    }

    #[test]
    fn mean_path_has_one_value_per_grid_point() {
        let grid = TimeGrid::new(2.0, 0.1).unwrap();
        let path = mean_path(&process_one(), &grid, 5, 10).unwrap();
        assert_eq!(path.mean.len(), grid.len());
        assert!(path.mean.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn mean_path_totals_match_independent_trials() {
        let grid = TimeGrid::new(10.0, 0.05).unwrap();
        let path = mean_path(&process_one(), &grid, 17, 40).unwrap();
        let trials = run_trials(&process_one(), &grid, 17, 40).unwrap();
        assert_eq!(path.totals, trials);

        let row = convergence_row(&process_one(), &grid, 17, 40).unwrap().unwrap();
        let mut totals: Vec<f64> = trials.iter().map(|&n| n as f64).collect();
        let stats = summarize(&mut totals).unwrap();
        assert_eq!(row.total.mean, stats.mean);
        assert_eq!(row.total.n, 40);
    }

    #[test]
    fn convergence_row_serializes() {
        let grid = TimeGrid::new(10.0, 0.05).unwrap();
        let row = convergence_row(&process_one(), &grid, 1, 50).unwrap().unwrap();
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["runs"], 50);
        assert_eq!(value["expected_total"], 35.0);
        assert!(value["total"]["mean"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn zero_runs_yield_no_row() {
        let grid = TimeGrid::new(1.0, 0.1).unwrap();
        assert!(convergence_row(&process_one(), &grid, 1, 0).unwrap().is_none());
    }
}
