use serde::Serialize;

use crate::error::SimResult;
use crate::intensity::{self, Affine};
use crate::types::TimeGrid;

/// Everything one run needs. The grid is derived here once and handed to
/// both generators and all counters.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Simulated horizon T; the grid stops strictly before it.
    pub horizon: f64,
    /// Bin width. Must be small against every 1/λ(t) for the one-event-per-bin
    /// approximation to hold.
    pub dt: f64,
    pub first: Affine,
    pub second: Affine,
}

impl SimulationConfig {
    pub fn canonical() -> Self {
        SimulationConfig {
            seed: 42,
            horizon: 10.0,
            dt: 0.01,
            first: intensity::process_one(),
            second: intensity::process_two(),
        }
    }

    pub fn grid(&self) -> SimResult<TimeGrid> {
        TimeGrid::new(self.horizon, self.dt)
    }

    /// Compact JSON form, logged at the start of a run.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
