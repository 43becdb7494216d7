use crate::process::EventSequence;
use crate::types::TimeGrid;

/// N(t) sampled on a grid: `counts[i]` is the number of events at or before
/// `grid.point(i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSeries {
    counts: Vec<u64>,
}

impl CountSeries {
    pub fn as_slice(&self) -> &[u64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<u64> {
        self.counts.get(index).copied()
    }

    /// Count at the last grid point.
    pub fn total(&self) -> u64 {
        self.counts.last().copied().unwrap_or(0)
    }

    pub fn is_monotone(&self) -> bool {
        self.counts.windows(2).all(|w| w[0] <= w[1])
    }

    /// `(t, N(t))` pairs for plotting.
    pub fn points(&self, grid: &TimeGrid) -> Vec<(f64, f64)> {
        grid.points().zip(&self.counts).map(|(t, &n)| (t, n as f64)).collect()
    }
}

/// Running count of `events` over the grid the sequence was drawn on.
pub fn cumulative_counts(events: &EventSequence) -> CountSeries {
    let grid = events.grid();
    let bins = events.bins();
    let mut counts = Vec::with_capacity(grid.len());
    let mut seen = 0usize;
    for i in 0..grid.len() {
        while seen < bins.len() && bins[seen] <= i {
            seen += 1;
        }
        counts.push(seen as u64);
    }
    CountSeries { counts }
}

/// For each point t of `grid`, the number of `times` that are ≤ t.
///
/// Accepts arbitrary timestamps, on or off the grid, in any order. NaN
/// timestamps are never counted.
pub fn count_up_to(times: &[f64], grid: &TimeGrid) -> CountSeries {
    let mut sorted: Vec<f64> = times.iter().copied().filter(|t| !t.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let counts = grid
        .points()
        .map(|t| sorted.partition_point(|&e| e <= t) as u64)
        .collect();
    CountSeries { counts }
}
