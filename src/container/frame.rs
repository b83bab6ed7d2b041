//! The patch frame's binary layout: big-endian 64-bit signed integers
//! throughout, counted vectors for the range lists and delta entries (§6).

use binrw::{BinRead, BinWrite};

/// Patch frame magic: 8 ASCII bytes.
pub const PATCH_MAGIC: &[u8; 8] = b"GFbFv1_0";

/// `0 = default-deflate`; future values are reserved.
pub const COMPATIBILITY_WINDOW_DEFAULT: u8 = 0;

/// `0 = bsdiff`.
pub const DELTA_FORMAT_BSDIFF: u8 = 0;
/// `1 = file-by-file-recursive`; the payload is itself an opaque nested patch frame.
pub const DELTA_FORMAT_FILE_BY_FILE_RECURSIVE: u8 = 1;

/// One `(offset, length)` range of the old archive to inflate when building
/// the old delta-friendly blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(big)]
#[bw(big)]
pub struct OldUncompressRange {
    /// Offset of the compressed range within the old archive.
    pub offset: i64,
    /// Length of the compressed range.
    pub length: i64,
}

/// One `(offset, length, params)` range of the new delta-friendly blob that
/// must be redeflated to reproduce the new archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(big)]
#[bw(big)]
pub struct NewRecompressRange {
    /// Offset of the uncompressed range within the new delta-friendly blob.
    pub offset: i64,
    /// Length of the uncompressed range.
    pub length: i64,
    /// DEFLATE level, `1..=9`.
    pub level: u8,
    /// DEFLATE strategy: `0=default`, `1=filtered`, `2=huffman-only`.
    pub strategy: u8,
    /// `1` iff `nowrap=false` (zlib-wrapped); `0` iff `nowrap=true`.
    pub wrap: u8,
}

/// One delta entry: a format id plus the old/new range pair it covers and
/// its length-prefixed payload.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(big)]
#[bw(big)]
pub struct DeltaEntry {
    /// `0=bsdiff`, `1=file-by-file-recursive`.
    pub delta_format_id: u8,
    /// Offset of this entry's span within the old delta-friendly blob.
    pub old_range_offset: i64,
    /// Length of this entry's span within the old delta-friendly blob.
    pub old_range_length: i64,
    /// Offset of this entry's span within the new delta-friendly blob.
    pub new_range_offset: i64,
    /// Length of this entry's span within the new delta-friendly blob.
    pub new_range_length: i64,
    #[br(temp)]
    #[bw(calc = payload.len() as i64)]
    payload_length: i64,
    /// The delta payload itself: a BSDIFF stream, or a nested patch frame.
    #[br(count = payload_length)]
    pub payload: Vec<u8>,
}

/// The complete patch frame (§6).
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(big, magic = b"GFbFv1_0")]
#[bw(big, magic = b"GFbFv1_0")]
pub struct PatchFrame {
    /// Identifies which DEFLATE engine implementation the applier must use.
    pub compatibility_window_id: u8,
    /// Length of the old delta-friendly blob.
    pub old_blob_length: i64,
    #[br(temp)]
    #[bw(calc = old_ranges.len() as i64)]
    old_range_count: i64,
    /// Ranges of the old archive to inflate, in ascending offset order.
    #[br(count = old_range_count)]
    pub old_ranges: Vec<OldUncompressRange>,
    /// Length of the new delta-friendly blob.
    pub new_blob_length: i64,
    #[br(temp)]
    #[bw(calc = new_ranges.len() as i64)]
    new_range_count: i64,
    /// Ranges of the new delta-friendly blob to redeflate, in ascending offset order.
    #[br(count = new_range_count)]
    pub new_ranges: Vec<NewRecompressRange>,
    #[br(temp)]
    #[bw(calc = delta_entries.len() as i64)]
    delta_entry_count: i64,
    /// The delta entries; together their old/new ranges must tile the
    /// respective delta-friendly blob space exactly once when more than one
    /// entry is present.
    #[br(count = delta_entry_count)]
    pub delta_entries: Vec<DeltaEntry>,
}
