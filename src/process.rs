use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::intensity::Intensity;
use crate::types::TimeGrid;

/// Event timestamps of one simulated path, stored as sorted grid indices.
///
/// Each bin index `i` stands for the timestamp `grid.point(i)`. A bin appears
/// at most once per generated path; after [`superpose`] the same bin may
/// appear twice, once per source process.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSequence {
    grid: TimeGrid,
    bins: Vec<usize>,
}

impl EventSequence {
    /// Build a sequence from bin indices in any order. Fails with
    /// [`SimError::BinOutOfRange`] if a bin is not on `grid`.
    pub fn from_bins(grid: TimeGrid, mut bins: Vec<usize>) -> SimResult<Self> {
        if let Some(&bin) = bins.iter().find(|&&b| b >= grid.len()) {
            return Err(SimError::BinOutOfRange { bin, len: grid.len() });
        }
        bins.sort_unstable();
        Ok(Self { grid, bins })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn times(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.bins.iter().map(|&b| self.grid.point(b))
    }
}

/// Draw one path of a non-homogeneous Poisson process on `grid`.
///
/// For every grid point t the bin mean is λ(t)·dt and a single Poisson
/// variate is drawn. The bin is recorded when the draw is at least one; a
/// draw of two or more still records a single timestamp. Bins with a zero
/// mean are skipped without touching `rng`.
///
/// Fails with [`SimError::NegativeRate`] if λ is negative anywhere on the
/// grid, or [`SimError::NonFiniteRate`] if it is NaN or infinite. Nothing is
/// drawn in either case.
pub fn generate<I, R>(intensity: &I, grid: &TimeGrid, rng: &mut R) -> SimResult<EventSequence>
where
    I: Intensity + ?Sized,
    R: Rng + ?Sized,
{
    intensity.check_non_negative(grid)?;

    let dt = grid.dt();
    let mut bins = Vec::new();
    let mut collapsed = 0usize;
    for (i, t) in grid.points().enumerate() {
        let mean = intensity.rate(t) * dt;
        if mean == 0.0 {
            continue;
        }
        let poisson = Poisson::new(mean)
            .map_err(|e| SimError::InvalidMean { mean, reason: e.to_string() })?;
        let draw = poisson.sample(rng) as u64;
        if draw >= 1 {
            bins.push(i);
        }
        if draw >= 2 {
            collapsed += 1;
        }
    }

    debug!(events = bins.len(), collapsed, %grid, "generated path");
    Ok(EventSequence { grid: *grid, bins })
}

/// Union of two paths drawn on the same grid, sorted ascending. Coinciding
/// bins are kept once per source.
pub fn superpose(a: &EventSequence, b: &EventSequence) -> SimResult<EventSequence> {
    if a.grid != b.grid {
        return Err(SimError::GridMismatch {
            left: a.grid.to_string(),
            right: b.grid.to_string(),
        });
    }

    let mut bins = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.bins.len() && j < b.bins.len() {
        if a.bins[i] <= b.bins[j] {
            bins.push(a.bins[i]);
            i += 1;
        } else {
            bins.push(b.bins[j]);
            j += 1;
        }
    }
    bins.extend_from_slice(&a.bins[i..]);
    bins.extend_from_slice(&b.bins[j..]);

    Ok(EventSequence { grid: a.grid, bins })
}
