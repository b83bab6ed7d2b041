//! Random-access, possibly-concurrent, read-only views over byte regions.
//!
//! A [`ByteSource`] is the uniform abstraction every other layer builds on: the
//! ZIP parser reads archives through one, the delta-friendly rewriter produces
//! and consumes them, and the BSDIFF codec treats both the old and new
//! delta-friendly blobs as byte sources.
//!
//! Two concrete implementations are provided: [`MemorySource`] for in-memory
//! byte slices (cheap to clone, supports any number of concurrent readers) and
//! [`FileSource`] for file-backed regions (opens an independent file handle
//! per reader). Both implement [`ByteSource`].

mod file;
mod memory;

pub use file::FileSource;
pub use memory::MemorySource;

use std::io::Read;

/// A random-access, read-only view over a contiguous byte region of known length.
///
/// Implementors may or may not support multiple concurrent readers; callers
/// that need concurrency should check [`ByteSource::supports_multiple_streams`]
/// before opening more than one stream at a time.
pub trait ByteSource: Send + Sync {
    /// The length in bytes of this source.
    fn length(&self) -> u64;

    /// Opens a new reader positioned at the start of this source.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying resource cannot be opened.
    fn open_stream(&self) -> std::io::Result<Box<dyn Read + Send>>;

    /// Returns a sub-view over `[offset, offset + length)`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `offset + length` exceeds [`ByteSource::length`].
    fn slice(&self, offset: u64, length: u64) -> Result<Box<dyn ByteSource>, OutOfRangeError>;

    /// Whether independent readers from [`ByteSource::open_stream`] may coexist.
    ///
    /// When `false`, callers must fully consume and drop one stream before
    /// opening the next; reopening invalidates prior readers.
    fn supports_multiple_streams(&self) -> bool;

    /// Reads the entire source into memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails.
    fn read_to_vec(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(usize::try_from(self.length()).unwrap_or(0));
        self.open_stream()?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// The requested range fell outside a byte source's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("out of range: offset {offset} + length {length} exceeds source length {source_len}")]
pub struct OutOfRangeError {
    /// Requested offset.
    pub offset: u64,
    /// Requested length.
    pub length: u64,
    /// Length of the source being sliced.
    pub source_len: u64,
}

pub(crate) fn check_range(offset: u64, length: u64, source_len: u64) -> Result<(), OutOfRangeError> {
    match offset.checked_add(length) {
        Some(end) if end <= source_len => Ok(()),
        _ => Err(OutOfRangeError {
            offset,
            length,
            source_len,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn check_range_accepts_exact_fit() {
        assert!(check_range(0, 10, 10).is_ok());
        assert!(check_range(5, 5, 10).is_ok());
    }

    #[test]
    fn check_range_rejects_overflow() {
        assert!(check_range(5, 6, 10).is_err());
        assert!(check_range(u64::MAX, 1, 10).is_err());
    }
}
