//! Error types for DEFLATE inflation, deflation, and divination.

use thiserror::Error;

/// Result alias for DEFLATE operations.
pub type DeflateResult<T> = Result<T, DeflateError>;

/// Errors produced by the DEFLATE reproduction engine.
#[derive(Debug, Error)]
pub enum DeflateError {
    /// Inflation failed under both the best-guess and opposite `nowrap` setting.
    #[error("bad deflate stream: {0}")]
    BadStream(String),

    /// No `(level, strategy, nowrap)` combination reproduced the compressed
    /// bytes during divination, or the applier needed to redeflate a range
    /// whose parameters were never recorded as reproducible.
    #[error("unreproducible deflate stream")]
    Unreproducible,

    /// The host's DEFLATE engine does not reproduce the embedded compatibility
    /// corpus bit-for-bit under one or more `(level, strategy, nowrap)` combinations.
    #[error("incompatible deflate engine: {0} combination(s) diverge from the reference corpus")]
    IncompatibleEngine(usize),

    /// Divination was cancelled mid-trial.
    #[error("divination cancelled")]
    Cancelled,
}

impl DeflateError {
    /// Whether this condition is recoverable by the caller (divination may
    /// fall back to marking the entry unreproducible) rather than fatal.
    pub fn is_recoverable_during_divination(&self) -> bool {
        matches!(self, Self::BadStream(_) | Self::Unreproducible)
    }
}
