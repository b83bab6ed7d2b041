//! Error types for ZIP archive parsing and serialization.

use thiserror::Error;

/// Result alias for ZIP operations.
pub type ZipResult<T> = Result<T, ZipError>;

/// Errors produced while locating, parsing, or writing a ZIP archive.
#[derive(Debug, Error)]
pub enum ZipError {
    /// No end-of-central-directory record was found within the trailing
    /// 65,557-byte search window.
    #[error("end of central directory record not found")]
    EocdNotFound,

    /// A record's signature did not match the expected magic bytes.
    #[error("bad signature: expected {expected:#010x}, got {actual:#010x} at offset {offset}")]
    BadSignature {
        /// The signature this record family requires.
        expected: u32,
        /// The signature actually read.
        actual: u32,
        /// Byte offset at which the mismatch was found.
        offset: u64,
    },

    /// A central-directory record's declared local-header offset pointed
    /// past the end of the archive, or a record was truncated mid-read.
    #[error("truncated or malformed record at offset {offset}: {reason}")]
    Truncated {
        /// Byte offset at which parsing failed.
        offset: u64,
        /// Human-readable description of what was expected.
        reason: String,
    },

    /// The end-of-central-directory entry count did not match the number of
    /// central-directory records actually enumerated.
    #[error("central directory entry count mismatch: EOCD declares {declared}, found {actual}")]
    EntryCountMismatch {
        /// Count declared by the EOCD record.
        declared: u16,
        /// Count actually enumerated while walking the central directory.
        actual: u16,
    },

    /// A central-directory record and its corresponding local record disagree
    /// on path, compression method, flags, CRC-32, or size.
    #[error("central directory and local header disagree for entry {path:?}: {field}")]
    LocalCentralMismatch {
        /// The entry path for which the mismatch was detected.
        path: String,
        /// The field that disagreed.
        field: String,
    },

    /// A feature outside the supported subset was encountered: ZIP64
    /// extensions, a compression method other than stored/deflate on a path
    /// that must be rewritten, or encryption.
    #[error("unsupported ZIP feature: {0}")]
    Unsupported(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary structure read/write error.
    #[error("binary format error: {0}")]
    BinRead(#[from] binrw::Error),
}

impl ZipError {
    /// Structural parse failures that make the archive impossible to read further.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::EocdNotFound
                | Self::BadSignature { .. }
                | Self::Truncated { .. }
                | Self::EntryCountMismatch { .. }
                | Self::LocalCentralMismatch { .. }
                | Self::BinRead(_)
        )
    }

    /// Whether this reflects a feature this crate intentionally does not support.
    pub fn is_unsupported_feature(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
