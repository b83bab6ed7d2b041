//! Encodes and decodes the patch frame, and validates the tiling invariant
//! over delta entries' old/new ranges (§6).

use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use tracing::instrument;

use super::error::{ContainerError, ContainerResult};
use super::frame::{
    DeltaEntry, NewRecompressRange, OldUncompressRange, PatchFrame, COMPATIBILITY_WINDOW_DEFAULT,
    DELTA_FORMAT_BSDIFF, DELTA_FORMAT_FILE_BY_FILE_RECURSIVE,
};

/// Serializes a [`PatchFrame`] to bytes.
///
/// # Errors
///
/// Returns [`ContainerError`] if the frame's own invariants (non-empty delta
/// entries, ranges that tile their blob space) are violated.
#[instrument(skip(frame))]
pub fn encode_frame(frame: &PatchFrame) -> ContainerResult<Vec<u8>> {
    validate_frame(frame)?;
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    frame.write_options(&mut cursor, binrw::Endian::Big, ())?;
    Ok(buf)
}

/// Parses and validates a [`PatchFrame`] from bytes.
///
/// # Errors
///
/// Returns [`ContainerError`] on malformed binary framing, an unknown
/// compatibility-window or delta-format id, or ranges that don't tile their
/// blob space exactly once.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_frame(bytes: &[u8]) -> ContainerResult<PatchFrame> {
    let mut cursor = Cursor::new(bytes);
    let frame = match PatchFrame::read_options(&mut cursor, binrw::Endian::Big, ()) {
        Ok(frame) => frame,
        Err(binrw::Error::BadMagic { .. }) => return Err(ContainerError::BadMagic),
        Err(err) => return Err(ContainerError::Malformed(err)),
    };
    validate_frame(&frame)?;
    Ok(frame)
}

fn validate_frame(frame: &PatchFrame) -> ContainerResult<()> {
    if frame.compatibility_window_id != COMPATIBILITY_WINDOW_DEFAULT {
        return Err(ContainerError::UnknownCompatibilityWindow(frame.compatibility_window_id));
    }
    if frame.delta_entries.is_empty() {
        return Err(ContainerError::NoDeltaEntries);
    }
    for entry in &frame.delta_entries {
        if entry.delta_format_id != DELTA_FORMAT_BSDIFF && entry.delta_format_id != DELTA_FORMAT_FILE_BY_FILE_RECURSIVE
        {
            return Err(ContainerError::UnknownDeltaFormat(entry.delta_format_id));
        }
    }

    if frame.delta_entries.len() > 1 {
        check_tiling(
            frame.delta_entries.iter().map(|e| (e.old_range_offset, e.old_range_length)),
            frame.old_blob_length,
            "old",
        )?;
        check_tiling(
            frame.delta_entries.iter().map(|e| (e.new_range_offset, e.new_range_length)),
            frame.new_blob_length,
            "new",
        )?;
    }

    Ok(())
}

/// Checks that the given `(offset, length)` spans, once sorted, tile
/// `[0, blob_length)` exactly once: no gap, no overlap, no leftover.
fn check_tiling(spans: impl Iterator<Item = (i64, i64)>, blob_length: i64, space: &'static str) -> ContainerResult<()> {
    let mut sorted: Vec<(i64, i64)> = spans.collect();
    sorted.sort_by_key(|&(offset, _)| offset);

    let mut cursor = 0i64;
    for (offset, length) in sorted {
        if offset != cursor || length < 0 {
            return Err(ContainerError::RangeOverlapOrGap { space });
        }
        cursor += length;
    }
    if cursor != blob_length {
        return Err(ContainerError::RangeOverlapOrGap { space });
    }
    Ok(())
}

/// Convenience constructor for a single-entry frame: the common case where
/// one BSDIFF (or nested) delta covers the whole old/new blob span.
pub fn single_entry_frame(
    old_blob_length: i64,
    old_ranges: Vec<OldUncompressRange>,
    new_blob_length: i64,
    new_ranges: Vec<NewRecompressRange>,
    delta_format_id: u8,
    payload: Vec<u8>,
) -> PatchFrame {
    PatchFrame {
        compatibility_window_id: COMPATIBILITY_WINDOW_DEFAULT,
        old_blob_length,
        old_ranges,
        new_blob_length,
        new_ranges,
        delta_entries: vec![DeltaEntry {
            delta_format_id,
            old_range_offset: 0,
            old_range_length: old_blob_length,
            new_range_offset: 0,
            new_range_length: new_blob_length,
            payload,
        }],
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn minimal_frame(delta_entries: Vec<DeltaEntry>, old_len: i64, new_len: i64) -> PatchFrame {
        PatchFrame {
            compatibility_window_id: COMPATIBILITY_WINDOW_DEFAULT,
            old_blob_length: old_len,
            old_ranges: Vec::new(),
            new_blob_length: new_len,
            new_ranges: Vec::new(),
            delta_entries,
        }
    }

    #[test]
    fn single_entry_round_trips() {
        let frame = single_entry_frame(10, Vec::new(), 12, Vec::new(), DELTA_FORMAT_BSDIFF, vec![9, 9, 9]);
        let encoded = encode_frame(&frame).expect("encode");
        let decoded = decode_frame(&encoded).expect("decode");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_zero_delta_entries() {
        let frame = minimal_frame(Vec::new(), 0, 0);
        assert!(matches!(encode_frame(&frame), Err(ContainerError::NoDeltaEntries)));
    }

    #[test]
    fn rejects_unknown_delta_format() {
        let frame = minimal_frame(
            vec![DeltaEntry {
                delta_format_id: 99,
                old_range_offset: 0,
                old_range_length: 5,
                new_range_offset: 0,
                new_range_length: 5,
                payload: vec![],
            }],
            5,
            5,
        );
        assert!(matches!(encode_frame(&frame), Err(ContainerError::UnknownDeltaFormat(99))));
    }

    #[test]
    fn accepts_tiling_entries() {
        let frame = minimal_frame(
            vec![
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 0,
                    old_range_length: 4,
                    new_range_offset: 0,
                    new_range_length: 5,
                    payload: vec![],
                },
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 4,
                    old_range_length: 6,
                    new_range_offset: 5,
                    new_range_length: 7,
                    payload: vec![],
                },
            ],
            10,
            12,
        );
        encode_frame(&frame).expect("tiling entries should encode cleanly");
    }

    #[test]
    fn rejects_overlapping_entries() {
        let frame = minimal_frame(
            vec![
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 0,
                    old_range_length: 5,
                    new_range_offset: 0,
                    new_range_length: 5,
                    payload: vec![],
                },
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 3,
                    old_range_length: 7,
                    new_range_offset: 5,
                    new_range_length: 7,
                    payload: vec![],
                },
            ],
            10,
            12,
        );
        assert!(matches!(
            encode_frame(&frame),
            Err(ContainerError::RangeOverlapOrGap { space: "old" })
        ));
    }

    #[test]
    fn rejects_gap_between_entries() {
        let frame = minimal_frame(
            vec![
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 0,
                    old_range_length: 4,
                    new_range_offset: 0,
                    new_range_length: 5,
                    payload: vec![],
                },
                DeltaEntry {
                    delta_format_id: DELTA_FORMAT_BSDIFF,
                    old_range_offset: 5,
                    old_range_length: 5,
                    new_range_offset: 5,
                    new_range_length: 7,
                    payload: vec![],
                },
            ],
            10,
            12,
        );
        assert!(matches!(
            encode_frame(&frame),
            Err(ContainerError::RangeOverlapOrGap { space: "old" })
        ));
    }

    #[test]
    fn rejects_unknown_compatibility_window() {
        let mut frame = single_entry_frame(1, Vec::new(), 1, Vec::new(), DELTA_FORMAT_BSDIFF, vec![0]);
        frame.compatibility_window_id = 7;
        assert!(matches!(
            encode_frame(&frame),
            Err(ContainerError::UnknownCompatibilityWindow(7))
        ));
    }
}
