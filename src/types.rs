use std::fmt;

use serde::Serialize;

use crate::error::{SimError, SimResult};

/// Fixed-step discretization of `[0, horizon)`.
///
/// Points are `0, dt, 2·dt, …` strictly below the horizon: `len` is the number
/// of `i` with `i·dt < horizon`. Point `i` is always computed as `i as f64 * dt`, never by repeated
/// addition, so a timestamp taken from one grid compares exactly equal to the
/// same point recomputed later.
///
/// Generator, counter and theoretical curves all read the same grid value;
/// an `EventSequence` carries the grid it was drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeGrid {
    horizon: f64,
    dt: f64,
    len: usize,
}

impl TimeGrid {
    pub fn new(horizon: f64, dt: f64) -> SimResult<Self> {
        let invalid = |reason| SimError::InvalidGrid { horizon, dt, reason };
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(invalid("horizon must be positive and finite"));
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(invalid("dt must be positive and finite"));
        }
        if dt > horizon {
            return Err(invalid("dt must not exceed the horizon"));
        }
        // horizon / dt can round either way across an integer; settle on the
        // exact count of i with i·dt < horizon.
        let mut steps = (horizon / dt).ceil();
        while steps > 1.0 && (steps - 1.0) * dt >= horizon {
            steps -= 1.0;
        }
        while steps * dt < horizon {
            steps += 1.0;
        }
        if steps > u32::MAX as f64 {
            return Err(invalid("too many grid points"));
        }
        Ok(Self { horizon, dt, len: steps as usize })
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of grid points. Always at least one.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn point(&self, index: usize) -> f64 {
        index as f64 * self.dt
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        (0..self.len).map(|i| self.point(i))
    }

    /// Index of `t` if it is exactly one of this grid's points.
    pub fn index_of(&self, t: f64) -> Option<usize> {
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        let i = (t / self.dt).round() as usize;
        (i < self.len && self.point(i) == t).then_some(i)
    }
}

impl fmt::Display for TimeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={} dt={} ({} points)", self.horizon, self.dt, self.len)
    }
}
