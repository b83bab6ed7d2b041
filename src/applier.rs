//! Orchestrates patch application end to end: parse the frame, rebuild the
//! old delta-friendly blob, apply each delta entry, redeflate the result, and
//! verify the reconstructed archive's EOCD/central directory (§4.7-§4.9).

use tracing::{info, instrument, warn};

use crate::bsdiff::apply_patch as apply_bsdiff_patch;
use crate::byte_source::{ByteSource, MemorySource};
use crate::config::ApplierConfig;
use crate::container::{
    decode_frame, ContainerError, DeltaEntry, PatchFrame, COMPATIBILITY_WINDOW_DEFAULT, DELTA_FORMAT_BSDIFF,
    DELTA_FORMAT_FILE_BY_FILE_RECURSIVE,
};
use crate::deflate::{DeflateEngine, DeflateParams, MinizEngine, Strategy};
use crate::deltafriendly::{rewrite_to_delta_friendly, UncompressRange};
use crate::error::{PatchError, PatchResult};
use crate::hybrid_buffer::HybridBuffer;
use crate::zip::parse_archive;

/// Applies a patch produced by [`crate::generator::generate_patch`] to
/// `old_source`, returning the reconstructed new archive's bytes.
///
/// # Errors
///
/// Returns [`PatchError`] if the patch frame is malformed, names an unknown
/// compatibility window or delta format, a delta entry's declared span
/// doesn't match its actual decoded length, the rebuilt old blob's length
/// disagrees with the frame's declaration, or the reconstructed archive
/// fails its own EOCD/central-directory consistency check.
#[instrument(skip(old_source, patch, config))]
pub fn apply_patch(old_source: &dyn ByteSource, patch: &[u8], config: &ApplierConfig) -> PatchResult<Vec<u8>> {
    let engine = MinizEngine::new();
    assert_engine_compatible(&engine)?;

    let frame = decode_frame(patch)?;
    if frame.compatibility_window_id != COMPATIBILITY_WINDOW_DEFAULT {
        return Err(PatchError::PatchFormat(ContainerError::UnknownCompatibilityWindow(
            frame.compatibility_window_id,
        )));
    }

    let old_blob = build_old_blob(old_source, &frame, &engine, config)?;
    let new_blob = apply_delta_entries(&old_blob, &frame, &engine, config)?;

    if new_blob.len() as i64 != frame.new_blob_length {
        return Err(PatchError::OutOfRange {
            offset: 0,
            length: new_blob.len() as u64,
            source_len: frame.new_blob_length.max(0) as u64,
        });
    }

    let output = redeflate(&new_blob, &frame, &engine)?;
    parse_archive(&MemorySource::new(output.clone()))?;
    info!(output_len = output.len(), "patch applied");
    Ok(output)
}

fn assert_engine_compatible(engine: &dyn DeflateEngine) -> PatchResult<()> {
    let incompatible = engine.incompatible_values();
    if incompatible.is_empty() {
        return Ok(());
    }
    warn!(?incompatible, "host DEFLATE engine diverges from the reference corpus");
    Err(PatchError::Deflate(crate::deflate::DeflateError::IncompatibleEngine(
        incompatible.len(),
    )))
}

fn build_old_blob(
    old_source: &dyn ByteSource,
    frame: &PatchFrame,
    engine: &dyn DeflateEngine,
    config: &ApplierConfig,
) -> PatchResult<Vec<u8>> {
    let old_ranges: Vec<UncompressRange> = frame
        .old_ranges
        .iter()
        .map(|r| UncompressRange {
            offset: r.offset as u64,
            length: r.length as u64,
            params: DeflateParams::new(1, Strategy::Default, true),
        })
        .collect();

    let mut buffer = HybridBuffer::with_threshold_and_dir(config.hybrid_buffer_threshold, config.temp_dir.as_deref());
    rewrite_to_delta_friendly(old_source, &old_ranges, engine, &mut buffer, &config.cancellation)?;
    let old_blob = buffer.into_source()?.read_to_vec()?;

    if old_blob.len() as i64 != frame.old_blob_length {
        return Err(PatchError::OutOfRange {
            offset: 0,
            length: old_blob.len() as u64,
            source_len: frame.old_blob_length.max(0) as u64,
        });
    }
    Ok(old_blob)
}

fn apply_delta_entries(
    old_blob: &[u8],
    frame: &PatchFrame,
    engine: &dyn DeflateEngine,
    config: &ApplierConfig,
) -> PatchResult<Vec<u8>> {
    let mut new_blob = vec![0u8; frame.new_blob_length.max(0) as usize];

    for entry in &frame.delta_entries {
        if config.cancellation.is_cancelled() {
            return Err(PatchError::Cancelled);
        }
        let applied = apply_one_entry(old_blob, entry, config)?;
        if applied.len() as i64 != entry.new_range_length {
            return Err(PatchError::OutOfRange {
                offset: entry.new_range_offset.max(0) as u64,
                length: applied.len() as u64,
                source_len: entry.new_range_length.max(0) as u64,
            });
        }
        let start = entry.new_range_offset as usize;
        new_blob[start..start + applied.len()].copy_from_slice(&applied);
    }

    Ok(new_blob)
}

fn apply_one_entry(old_blob: &[u8], entry: &DeltaEntry, config: &ApplierConfig) -> PatchResult<Vec<u8>> {
    let old_start = entry.old_range_offset as usize;
    let old_end = old_start + entry.old_range_length as usize;
    let old_slice = &old_blob[old_start..old_end];

    match entry.delta_format_id {
        DELTA_FORMAT_BSDIFF => Ok(apply_bsdiff_patch(old_slice, &entry.payload)?),
        DELTA_FORMAT_FILE_BY_FILE_RECURSIVE => {
            let nested_old_source = MemorySource::new(old_slice.to_vec());
            apply_patch(&nested_old_source, &entry.payload, config)
        }
        other => Err(PatchError::PatchFormat(ContainerError::UnknownDeltaFormat(other))),
    }
}

fn redeflate(new_blob: &[u8], frame: &PatchFrame, engine: &dyn DeflateEngine) -> PatchResult<Vec<u8>> {
    let mut output = Vec::with_capacity(new_blob.len());
    let mut cursor = 0u64;

    for range in &frame.new_ranges {
        let range_offset = range.offset as u64;
        if range_offset > cursor {
            let gap = (range_offset - cursor) as usize;
            output.extend_from_slice(&new_blob[cursor as usize..cursor as usize + gap]);
            cursor += gap as u64;
        }

        let length = range.length as usize;
        let uncompressed = &new_blob[range_offset as usize..range_offset as usize + length];
        let strategy = Strategy::from_wire_code(range.strategy)
            .ok_or(PatchError::PatchFormat(ContainerError::UnknownStrategyCode(range.strategy)))?;
        let params = DeflateParams::new(range.level, strategy, range.wrap == 0);
        let recompressed = engine.deflate(uncompressed, params)?;
        output.extend_from_slice(&recompressed);
        cursor = range_offset + length as u64;
    }

    if cursor < new_blob.len() as u64 {
        output.extend_from_slice(&new_blob[cursor as usize..]);
    }

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::byte_source::MemorySource;
    use crate::container::{NewRecompressRange, OldUncompressRange};
    use crate::generator::generate_patch;
    use crate::zip::{write_archive, CompressionMethod as CM, WriteEntry};

    #[test]
    fn rejects_bad_magic() {
        let old_source = MemorySource::new(b"old archive bytes".to_vec());
        let bogus = vec![0u8; 64];
        assert!(apply_patch(&old_source, &bogus, &ApplierConfig::new()).is_err());
    }

    #[test]
    fn rejects_unknown_compatibility_window() {
        use binrw::BinWrite;

        let mut frame = PatchFrame {
            compatibility_window_id: COMPATIBILITY_WINDOW_DEFAULT,
            old_blob_length: 0,
            old_ranges: Vec::<OldUncompressRange>::new(),
            new_blob_length: 3,
            new_ranges: Vec::<NewRecompressRange>::new(),
            delta_entries: vec![DeltaEntry {
                delta_format_id: DELTA_FORMAT_BSDIFF,
                old_range_offset: 0,
                old_range_length: 0,
                new_range_offset: 0,
                new_range_length: 3,
                payload: crate::bsdiff::build_patch(b"", b"new", &crate::concurrency::CancellationToken::new())
                    .expect("build patch"),
            }],
        };
        frame.compatibility_window_id = 5;

        // Bypass `encode_frame`'s own validation to exercise the applier's
        // independent check on a structurally valid but unknown-window frame.
        let mut buf = Vec::new();
        frame
            .write_options(&mut binrw::io::Cursor::new(&mut buf), binrw::Endian::Big, ())
            .expect("write");

        let old_source = MemorySource::new(Vec::new());
        let result = apply_patch(&old_source, &buf, &ApplierConfig::new());
        assert!(matches!(
            result,
            Err(PatchError::PatchFormat(ContainerError::UnknownCompatibilityWindow(5)))
        ));
    }

    #[test]
    fn end_to_end_with_unchanged_stored_entry() {
        let data = b"payload that stays exactly the same across both archives";
        let entry = WriteEntry {
            path: "same.bin".to_string(),
            compression_method: CM::Stored,
            flags: crate::zip::header::FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc32fast::hash(data),
            uncompressed_size: data.len() as u32,
            raw_data: data.to_vec(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        };
        let bytes = write_archive(&[entry]).expect("write");

        let old_source = MemorySource::new(bytes.clone());
        let new_source = MemorySource::new(bytes.clone());
        let patch = generate_patch(&old_source, &new_source, &crate::config::GeneratorConfig::new()).expect("generate");

        let applier_source = MemorySource::new(bytes.clone());
        let applied = apply_patch(&applier_source, &patch, &ApplierConfig::new()).expect("apply");
        assert_eq!(applied, bytes);
    }
}
