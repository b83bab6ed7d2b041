//! ZIP container parsing and serialization.
//!
//! Consumed per PKWARE APPNOTE: the end-of-central-directory record is
//! located by scanning backward from the end of the archive, the central
//! directory is walked to enumerate entries, and each entry's local header
//! is reconciled against its central-directory record (including the
//! optional trailing data descriptor). All multi-byte fields are
//! little-endian. ZIP64 is out of scope; archives requiring it fail with
//! [`error::ZipError::Unsupported`].
//!
//! ```
//! use zipdelta::byte_source::MemorySource;
//! use zipdelta::zip::parser::parse_archive;
//!
//! # fn make_archive() -> Vec<u8> { zipdelta::zip::writer::write_archive(&[]).unwrap() }
//! let bytes = make_archive();
//! let source = MemorySource::new(bytes);
//! let index = parse_archive(&source).expect("valid archive");
//! assert_eq!(index.len(), 0);
//! ```

pub mod entry;
pub mod error;
pub mod header;
pub mod parser;
pub mod writer;

pub use entry::{ArchiveIndex, CompressionMethod, ZipEntry};
pub use error::{ZipError, ZipResult};
pub use parser::parse_archive;
pub use writer::{write_archive, WriteEntry};
