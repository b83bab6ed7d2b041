//! Orchestrates patch generation end to end: parse both archives, divine
//! DEFLATE parameters, plan, apply the resource limiter, rewrite both sides
//! to delta-friendly blobs, run the BSDIFF codec, and frame the result
//! (§4.8, §5 Scheduling).

use tracing::{info, instrument, warn};

use crate::bsdiff::build_patch;
use crate::byte_source::ByteSource;
use crate::concurrency::run_divination_batch;
use crate::config::GeneratorConfig;
use crate::container::{
    DeltaEntry, NewRecompressRange, OldUncompressRange, PatchFrame, COMPATIBILITY_WINDOW_DEFAULT,
    DELTA_FORMAT_BSDIFF,
};
use crate::deflate::{divine, DeflateEngine, DeflateError, DeflateParams, HintCache, MinizEngine, Strategy};
use crate::deltafriendly::{rewrite_to_delta_friendly, UncompressRange};
use crate::error::{PatchError, PatchResult};
use crate::hybrid_buffer::HybridBuffer;
use crate::prediff::{apply_limiter, build_plan, DivinationMap, RecompressionBudget};
use crate::zip::{parse_archive, ArchiveIndex, CompressionMethod};

/// Generates a patch transforming `old_source` into `new_source`, returning
/// the framed byte stream (§6 Patch frame).
///
/// # Errors
///
/// Returns [`PatchError`] on malformed archives, an incompatible host DEFLATE
/// engine, or any I/O failure reading either source.
#[instrument(skip(old_source, new_source, config))]
pub fn generate_patch(
    old_source: &dyn ByteSource,
    new_source: &dyn ByteSource,
    config: &GeneratorConfig,
) -> PatchResult<Vec<u8>> {
    let engine = MinizEngine::new();
    assert_engine_compatible(&engine)?;

    let old_index = parse_archive(old_source)?;
    let new_index = parse_archive(new_source)?;

    let old_divination = divine_archive(old_source, &old_index, &engine, config)?;
    let new_divination = divine_archive(new_source, &new_index, &engine, config)?;

    let mut plan = build_plan(
        &old_index,
        &new_index,
        &old_divination,
        &new_divination,
        &engine,
        |path| read_entry_raw(old_source, &old_index, path),
        |path| read_entry_raw(new_source, &new_index, path),
        &config.cancellation,
    )?;

    let mut budget = RecompressionBudget::new(config.recompression_limit);
    let demoted = apply_limiter(&mut plan, &mut budget, config.old_blob_size_cap);
    if demoted > 0 {
        info!(demoted, "limiter demoted entries to stay within resource budget");
    }

    let old_ranges = collect_ranges(&plan, &old_index, &old_divination, |e| e.uncompresses_old(), |e| e.old_index);
    let new_ranges = collect_ranges(&plan, &new_index, &new_divination, |e| e.uncompresses_new(), |e| e.new_index);

    let mut old_buffer = HybridBuffer::with_threshold_and_dir(config.hybrid_buffer_threshold, config.temp_dir.as_deref());
    rewrite_to_delta_friendly(old_source, &old_ranges, &engine, &mut old_buffer, &config.cancellation)?;
    let old_blob = old_buffer.into_source()?.read_to_vec()?;

    let mut new_buffer = HybridBuffer::with_threshold_and_dir(config.hybrid_buffer_threshold, config.temp_dir.as_deref());
    let inverse_ranges =
        rewrite_to_delta_friendly(new_source, &new_ranges, &engine, &mut new_buffer, &config.cancellation)?;
    let new_blob = new_buffer.into_source()?.read_to_vec()?;

    info!(
        old_blob_len = old_blob.len(),
        new_blob_len = new_blob.len(),
        "delta-friendly blobs built"
    );

    let bsdiff_payload = build_patch(&old_blob, &new_blob, &config.cancellation)?;

    let frame = PatchFrame {
        compatibility_window_id: COMPATIBILITY_WINDOW_DEFAULT,
        old_blob_length: old_blob.len() as i64,
        old_ranges: old_ranges
            .iter()
            .map(|r| OldUncompressRange {
                offset: r.offset as i64,
                length: r.length as i64,
            })
            .collect(),
        new_blob_length: new_blob.len() as i64,
        new_ranges: inverse_ranges
            .iter()
            .map(|r| NewRecompressRange {
                offset: r.offset as i64,
                length: r.length as i64,
                level: r.params.level,
                strategy: r.params.strategy.to_wire_code(),
                wrap: u8::from(!r.params.nowrap),
            })
            .collect(),
        delta_entries: vec![DeltaEntry {
            delta_format_id: DELTA_FORMAT_BSDIFF,
            old_range_offset: 0,
            old_range_length: old_blob.len() as i64,
            new_range_offset: 0,
            new_range_length: new_blob.len() as i64,
            payload: bsdiff_payload,
        }],
    };

    Ok(crate::container::encode_frame(&frame)?)
}

fn assert_engine_compatible(engine: &dyn DeflateEngine) -> PatchResult<()> {
    let incompatible = engine.incompatible_values();
    if incompatible.is_empty() {
        return Ok(());
    }
    warn!(?incompatible, "host DEFLATE engine diverges from the reference corpus");
    Err(PatchError::Deflate(DeflateError::IncompatibleEngine(incompatible.len())))
}

/// Builds the [`UncompressRange`] list for one side of a plan: every entry
/// whose plan selects the given side for uncompression, with divined
/// parameters (entries reaching this point always divined successfully,
/// since `UncompressBoth` requires both sides reproducible).
fn collect_ranges(
    plan: &[crate::prediff::PreDiffPlanEntry],
    index: &ArchiveIndex,
    divination: &DivinationMap,
    wants_side: impl Fn(&crate::prediff::PreDiffPlanEntry) -> bool,
    side_index: impl Fn(&crate::prediff::PreDiffPlanEntry) -> usize,
) -> Vec<UncompressRange> {
    plan.iter()
        .filter(|e| wants_side(e))
        .map(|e| {
            let entry = &index.entries[side_index(e)];
            let (offset, length) = entry.local_section.raw_data;
            let params = divination
                .get(&e.path)
                .and_then(crate::deflate::Divination::params)
                .unwrap_or(DeflateParams::new(6, Strategy::Default, true));
            UncompressRange { offset, length, params }
        })
        .collect()
}

/// Divines every DEFLATE-compressed entry of `index`, parallelized across
/// `config.jobs` workers when the `parallel` feature is enabled (§5
/// Scheduling). Each worker owns its own [`HintCache`]; hints are not shared
/// across entries when `config.jobs > 1`, trading some redundant trial work
/// for parallelism.
fn divine_archive(
    source: &dyn ByteSource,
    index: &ArchiveIndex,
    engine: &dyn DeflateEngine,
    config: &GeneratorConfig,
) -> PatchResult<DivinationMap> {
    let candidates: Vec<(String, u64, u64)> = index
        .entries
        .iter()
        .filter(|e| e.compression_method == CompressionMethod::Deflate)
        .map(|e| {
            let (offset, length) = e.local_section.raw_data;
            (e.path.clone(), offset, length)
        })
        .collect();

    let cancellation = &config.cancellation;
    let outcomes = run_divination_batch(candidates, config.jobs, |(path, offset, length)| {
        if cancellation.is_cancelled() {
            return (path, Err(PatchError::Cancelled));
        }
        let mut cache = HintCache::new(true);
        let divination = read_range(source, offset, length).and_then(|compressed| {
            let extension = extension_of(&path);
            Ok(divine(engine, &compressed, extension.as_deref(), &mut cache, cancellation)?)
        });
        (path, divination)
    });

    let mut result = DivinationMap::new();
    for (path, divination) in outcomes {
        result.insert(path, divination?);
    }
    Ok(result)
}

fn extension_of(path: &str) -> Option<String> {
    path.rsplit('.').next().filter(|ext| *ext != path).map(str::to_ascii_lowercase)
}

fn read_entry_raw(source: &dyn ByteSource, index: &ArchiveIndex, path: &str) -> std::io::Result<Vec<u8>> {
    let entry = index.get(path).expect("path came from this archive's own index");
    let (offset, length) = entry.local_section.raw_data;
    read_range(source, offset, length).map_err(|e| std::io::Error::other(e.to_string()))
}

fn read_range(source: &dyn ByteSource, offset: u64, length: u64) -> PatchResult<Vec<u8>> {
    use std::io::Read;
    let slice = source.slice(offset, length).map_err(|e| PatchError::OutOfRange {
        offset: e.offset,
        length: e.length,
        source_len: e.source_len,
    })?;
    let mut buf = Vec::with_capacity(length as usize);
    slice.open_stream()?.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::applier::apply_patch;
    use crate::byte_source::MemorySource;
    use crate::config::ApplierConfig;
    use crate::deflate::{DeflateParams, MinizEngine, Strategy};
    use crate::zip::{write_archive, CompressionMethod as CM, WriteEntry};

    fn deflated_entry(path: &str, data: &[u8], params: DeflateParams) -> WriteEntry {
        let engine = MinizEngine::new();
        let compressed = engine.deflate(data, params).expect("deflate");
        WriteEntry {
            path: path.to_string(),
            compression_method: CM::Deflate,
            flags: crate::zip::header::FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc32fast::hash(data),
            uncompressed_size: data.len() as u32,
            raw_data: compressed,
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        }
    }

    fn stored_entry(path: &str, data: &[u8]) -> WriteEntry {
        WriteEntry {
            path: path.to_string(),
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
        }
    }

    #[test]
    fn round_trips_through_generate_and_apply() {
        let params = DeflateParams::new(6, Strategy::Default, true);
        let old_data = b"the quick brown fox jumps over the lazy dog, repeated for compressibility: the quick brown fox";
        let new_data = b"the quick brown CAT jumps over the lazy dog, repeated for compressibility: the quick brown cat";

        let old_bytes = write_archive(&[deflated_entry("a.txt", old_data, params), stored_entry("b.bin", b"unchanged")])
            .expect("write old");
        let new_bytes = write_archive(&[deflated_entry("a.txt", new_data, params), stored_entry("b.bin", b"unchanged")])
            .expect("write new");

        let old_source = MemorySource::new(old_bytes.clone());
        let new_source = MemorySource::new(new_bytes.clone());

        let patch = generate_patch(&old_source, &new_source, &GeneratorConfig::new()).expect("generate");

        let applier_old_source = MemorySource::new(old_bytes);
        let applied = apply_patch(&applier_old_source, &patch, &ApplierConfig::new()).expect("apply");
        assert_eq!(applied, new_bytes);
    }

    #[test]
    fn round_trips_when_nothing_changed() {
        let old_bytes = write_archive(&[stored_entry("a.txt", b"same contents")]).expect("write old");
        let new_bytes = old_bytes.clone();

        let old_source = MemorySource::new(old_bytes.clone());
        let new_source = MemorySource::new(new_bytes.clone());
        let patch = generate_patch(&old_source, &new_source, &GeneratorConfig::new()).expect("generate");

        let applier_old_source = MemorySource::new(old_bytes);
        let applied = apply_patch(&applier_old_source, &patch, &ApplierConfig::new()).expect("apply");
        assert_eq!(applied, new_bytes);
    }

    #[test]
    fn respects_recompression_budget() {
        let params = DeflateParams::new(6, Strategy::Default, true);
        let old_data = vec![b'x'; 4096];
        let mut new_data = old_data.clone();
        new_data[0] = b'y';

        let old_bytes = write_archive(&[deflated_entry("big.bin", &old_data, params)]).expect("write old");
        let new_bytes = write_archive(&[deflated_entry("big.bin", &new_data, params)]).expect("write new");

        let old_source = MemorySource::new(old_bytes.clone());
        let new_source = MemorySource::new(new_bytes.clone());

        let config = GeneratorConfig::new().with_recompression_limit(1);
        let patch = generate_patch(&old_source, &new_source, &config).expect("generate under tight budget");

        let applier_old_source = MemorySource::new(old_bytes);
        let applied = apply_patch(&applier_old_source, &patch, &ApplierConfig::new()).expect("apply");
        assert_eq!(applied, new_bytes);
    }
}
