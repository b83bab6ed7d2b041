//! Generates and applies binary patches between ZIP archives.
//!
//! A patch is produced by identifying which entries were DEFLATE-compressed
//! with a reproducible `(level, strategy, nowrap)` configuration, virtually
//! uncompressing those entries in both the old and new archive to form two
//! "delta-friendly" blobs, diffing those blobs with a suffix-array-driven
//! BSDIFF-style codec, and framing the result with enough metadata for the
//! applier to rebuild the new archive bit-for-bit. See [`generator`] and
//! [`applier`] for the two entry points.

pub mod applier;
pub mod bsdiff;
pub mod byte_source;
pub mod concurrency;
pub mod config;
pub mod container;
pub mod deflate;
pub mod deltafriendly;
pub mod error;
pub mod generator;
pub mod hybrid_buffer;
pub mod prediff;
pub mod zip;

pub use applier::apply_patch;
pub use config::{ApplierConfig, GeneratorConfig};
pub use error::{PatchError, PatchResult};
pub use generator::generate_patch;
