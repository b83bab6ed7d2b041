//! Crate-wide error type aggregating every subsystem's error enum.

use thiserror::Error;

use crate::bsdiff::BsdiffError;
use crate::container::ContainerError;
use crate::deflate::DeflateError;
use crate::zip::ZipError;

/// Result alias used throughout the public API.
pub type PatchResult<T> = Result<T, PatchError>;

/// Top-level error type returned by the generator and applier entry points.
///
/// Each variant wraps a subsystem-specific error or stands alone for
/// cross-cutting conditions (cancellation, resource limits, I/O).
#[derive(Debug, Error)]
pub enum PatchError {
    /// Structural failure reading a ZIP archive (missing EOCD, bad signature, truncated record).
    #[error("malformed archive: {0}")]
    MalformedArchive(#[from] ZipError),

    /// DEFLATE inflate/deflate/divination failure.
    #[error("deflate error: {0}")]
    Deflate(#[from] DeflateError),

    /// BSDIFF diff/apply failure.
    #[error("bsdiff error: {0}")]
    Bsdiff(#[from] BsdiffError),

    /// Patch container framing failure.
    #[error("patch format error: {0}")]
    PatchFormat(#[from] ContainerError),

    /// A feature outside scope was encountered (ZIP64, encryption, unsupported compression method).
    #[error("unsupported archive feature: {0}")]
    UnsupportedArchive(String),

    /// Underlying I/O error, propagated with context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation or application was cancelled; no partial output is retained.
    #[error("operation cancelled")]
    Cancelled,

    /// The requested offset/length range fell outside a byte source's bounds.
    #[error("out of range: offset {offset} + length {length} exceeds source length {source_len}")]
    OutOfRange {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        length: u64,
        /// Length of the byte source.
        source_len: u64,
    },
}

impl PatchError {
    /// Whether this error terminates the current operation with no chance of recovery.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether this error reflects a cancellation request rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error originates from malformed or unsupported input data,
    /// as opposed to I/O or resource conditions.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedArchive(_) | Self::PatchFormat(_) | Self::UnsupportedArchive(_)
        )
    }
}
