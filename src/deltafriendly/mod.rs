//! The delta-friendly blob: an archive with selected DEFLATE ranges inflated
//! in place, turning a compression-obscured byte stream into one a
//! byte-level differ can usefully compare (§4.5).

mod rewriter;

pub use rewriter::{rewrite_to_delta_friendly, InverseRange, UncompressRange};
