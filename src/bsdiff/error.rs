//! Errors from building or applying a BSDIFF control stream.

use thiserror::Error;

/// Failures specific to the BSDIFF codec (§4.6, §4.7).
#[derive(Debug, Error)]
pub enum BsdiffError {
    /// The patch did not begin with the `"ENDSLEY/BSDIFF43"` magic.
    #[error("bad bsdiff magic")]
    BadMagic,

    /// The patch ended before a control record, diff byte, or extra byte could be read.
    #[error("unexpected end of bsdiff patch")]
    UnexpectedEof,

    /// A control record declared a negative `diff_length` or `extra_length`.
    #[error("negative length in control record: diff_length={diff_length}, extra_length={extra_length}")]
    NegativeLength {
        /// The record's declared diff length.
        diff_length: i64,
        /// The record's declared extra length.
        extra_length: i64,
    },

    /// The sum of `diff_length + extra_length` across control records did not equal `new_length`.
    #[error("control records produce {actual} bytes, expected {expected}")]
    OutputSizeMismatch {
        /// Declared output length from the patch header.
        expected: i64,
        /// Sum of per-record output lengths actually read.
        actual: i64,
    },

    /// `new_length` itself was negative.
    #[error("negative new_length in bsdiff header: {0}")]
    NegativeNewLength(i64),

    /// The diff loop was cancelled mid-scan.
    #[error("bsdiff scan cancelled")]
    Cancelled,
}

/// Result alias for BSDIFF codec operations.
pub type BsdiffResult<T> = Result<T, BsdiffError>;

impl BsdiffError {
    /// Whether this error reflects a structurally malformed patch, as opposed
    /// to a value-range condition that could in principle be a correct but
    /// degenerate patch.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::BadMagic | Self::UnexpectedEof)
    }
}
