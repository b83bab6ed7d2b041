//! Produces a delta-friendly blob by copying an archive verbatim except for
//! chosen compressed ranges, which are inflated in place with `nowrap=true`
//! (§4.5).

use std::io::{Read, Write};

use tracing::instrument;

use crate::byte_source::ByteSource;
use crate::concurrency::CancellationToken;
use crate::deflate::{DeflateEngine, DeflateParams};

/// One compressed range of the source archive to inflate in place, tagged
/// with the DEFLATE parameters needed to redeflate it back (only meaningful
/// for ranges within the *new* archive; old-archive ranges only need
/// `nowrap` to invert, but the full params are carried uniformly for
/// symmetry with the patch container's range records).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncompressRange {
    /// Offset of the raw compressed bytes within the source archive.
    pub offset: u64,
    /// Length of the raw compressed bytes.
    pub length: u64,
    /// DEFLATE parameters under which this range was produced.
    pub params: DeflateParams,
}

/// Where, in the delta-friendly blob, one uncompressed range landed, plus the
/// parameters needed to redeflate it back to its original compressed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InverseRange {
    /// Offset of the inflated bytes within the delta-friendly blob.
    pub offset: u64,
    /// Length of the inflated bytes.
    pub length: u64,
    /// DEFLATE parameters needed to redeflate this range back to its
    /// original compressed bytes.
    pub params: DeflateParams,
}

/// Builds a delta-friendly blob from `source`, writing it to `sink` and
/// returning the ordered list of inverse ranges. `ranges` must be sorted in
/// ascending offset order and must not overlap.
///
/// # Errors
///
/// Returns an I/O error if reading from `source` or writing to `sink` fails,
/// a [`crate::deflate::DeflateError`] if inflating a range fails, or
/// [`crate::error::PatchError::Cancelled`] if `cancellation` is observed
/// cancelled between ranges.
#[instrument(skip(source, ranges, engine, sink, cancellation))]
pub fn rewrite_to_delta_friendly(
    source: &dyn ByteSource,
    ranges: &[UncompressRange],
    engine: &dyn DeflateEngine,
    sink: &mut dyn Write,
    cancellation: &CancellationToken,
) -> crate::error::PatchResult<Vec<InverseRange>> {
    let total_len = source.length();
    let mut cursor = 0u64;
    let mut output_offset = 0u64;
    let mut inverse_ranges = Vec::with_capacity(ranges.len());

    for range in ranges {
        if cancellation.is_cancelled() {
            return Err(crate::error::PatchError::Cancelled);
        }
        if range.offset > cursor {
            let gap_len = range.offset - cursor;
            output_offset += copy_verbatim(source, cursor, gap_len, sink)?;
            cursor += gap_len;
        }

        let compressed = read_range(source, range.offset, range.length)?;
        let inflated = engine.inflate(&compressed, true)?;
        sink.write_all(&inflated)?;

        inverse_ranges.push(InverseRange {
            offset: output_offset,
            length: inflated.len() as u64,
            params: range.params,
        });

        output_offset += inflated.len() as u64;
        cursor += range.length;
    }

    if cursor < total_len {
        copy_verbatim(source, cursor, total_len - cursor, sink)?;
    }

    Ok(inverse_ranges)
}

fn read_range(source: &dyn ByteSource, offset: u64, length: u64) -> crate::error::PatchResult<Vec<u8>> {
    let slice = source
        .slice(offset, length)
        .map_err(|e| crate::error::PatchError::OutOfRange {
            offset: e.offset,
            length: e.length,
            source_len: e.source_len,
        })?;
    let mut buf = Vec::with_capacity(length as usize);
    slice.open_stream()?.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Streams `length` bytes starting at `offset` from `source` to `sink`
/// unchanged, returning the number of bytes copied.
fn copy_verbatim(
    source: &dyn ByteSource,
    offset: u64,
    length: u64,
    sink: &mut dyn Write,
) -> crate::error::PatchResult<u64> {
    let slice = source
        .slice(offset, length)
        .map_err(|e| crate::error::PatchError::OutOfRange {
            offset: e.offset,
            length: e.length,
            source_len: e.source_len,
        })?;
    let mut reader = slice.open_stream()?;
    let copied = std::io::copy(&mut reader, sink)?;
    Ok(copied)
}
