use thiserror::Error;

/// Errors raised while building a grid, sampling a process or drawing the chart.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid time grid: horizon={horizon}, dt={dt} ({reason})")]
    InvalidGrid { horizon: f64, dt: f64, reason: &'static str },

    /// λ(t) < 0 somewhere on the grid. The intensity must be non-negative over
    /// the whole horizon.
    #[error("intensity is negative at t={t}: λ(t)={rate}")]
    NegativeRate { t: f64, rate: f64 },

    #[error("intensity is not a finite number at t={t}: λ(t)={rate}")]
    NonFiniteRate { t: f64, rate: f64 },

    #[error("invalid Poisson mean {mean}: {reason}")]
    InvalidMean { mean: f64, reason: String },

    #[error("event sequences were drawn on different grids: {left} vs {right}")]
    GridMismatch { left: String, right: String },

    #[error("bin {bin} is outside a grid of {len} points")]
    BinOutOfRange { bin: usize, len: usize },

    #[error("failed to serialise config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
