//! The patch container: a self-describing frame wrapping the delta-friendly
//! blob metadata and one or more delta entries (§6 Patch frame).

mod codec;
mod error;
mod frame;

pub use codec::{decode_frame, encode_frame, single_entry_frame};
pub use error::{ContainerError, ContainerResult};
pub use frame::{
    DeltaEntry, NewRecompressRange, OldUncompressRange, PatchFrame, COMPATIBILITY_WINDOW_DEFAULT,
    DELTA_FORMAT_BSDIFF, DELTA_FORMAT_FILE_BY_FILE_RECURSIVE, PATCH_MAGIC,
};
