use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::types::TimeGrid;

/// A rate function λ(t) paired with its closed-form mean function
/// Λ(t) = ∫₀ᵗ λ(s) ds.
///
/// Implementations must keep λ(t) ≥ 0 on the simulated horizon. The
/// generator checks this with [`Intensity::check_non_negative`] before
/// drawing and refuses to sample otherwise.
pub trait Intensity {
    fn rate(&self, t: f64) -> f64;

    fn cumulative(&self, t: f64) -> f64;

    /// Fail on the first grid point where λ is negative or not finite.
    fn check_non_negative(&self, grid: &TimeGrid) -> SimResult<()> {
        for t in grid.points() {
            let rate = self.rate(t);
            if !rate.is_finite() {
                return Err(SimError::NonFiniteRate { t, rate });
            }
            if rate < 0.0 {
                return Err(SimError::NegativeRate { t, rate });
            }
        }
        Ok(())
    }

    /// Λ evaluated on every grid point.
    fn curve(&self, grid: &TimeGrid) -> Vec<f64> {
        grid.points().map(|t| self.cumulative(t)).collect()
    }
}

/// λ(t) = intercept + slope·t.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine {
    pub intercept: f64,
    pub slope: f64,
}

impl Affine {
    pub const fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }
}

impl Intensity for Affine {
    fn rate(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }

    fn cumulative(&self, t: f64) -> f64 {
        self.intercept * t + 0.5 * self.slope * t * t
    }
}

/// Rate of the union of two independent processes: rates add, and so do the
/// mean functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Superposed<A, B>(pub A, pub B);

impl<A: Intensity, B: Intensity> Intensity for Superposed<A, B> {
    fn rate(&self, t: f64) -> f64 {
        self.0.rate(t) + self.1.rate(t)
    }

    fn cumulative(&self, t: f64) -> f64 {
        self.0.cumulative(t) + self.1.cumulative(t)
    }
}

impl<I: Intensity + ?Sized> Intensity for &I {
    fn rate(&self, t: f64) -> f64 {
        (**self).rate(t)
    }

    fn cumulative(&self, t: f64) -> f64 {
        (**self).cumulative(t)
    }
}

/// λ1(t) = 1 + 0.5t, so Λ1(t) = t + 0.25t².
pub const fn process_one() -> Affine {
    Affine::new(1.0, 0.5)
}

/// λ2(t) = 4 − 0.2t, so Λ2(t) = 4t − 0.1t². Non-negative up to t = 20.
pub const fn process_two() -> Affine {
    Affine::new(4.0, -0.2)
}
