use thiserror::Error;

use crate::source::SourceError;

/// Failures raised while turning a price series into signals and backtest
/// statistics.
#[derive(Debug, Error)]
pub enum VeloError {
    #[error("insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// An extremum tracker was fed an index other than the next one in sequence.
    #[error("invalid sequence: expected index {expected}, got {got}")]
    InvalidSequence { expected: usize, got: usize },

    #[error("invalid window: {0} (must be at least 1)")]
    InvalidWindow(usize),

    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    #[error(transparent)]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, VeloError>;
