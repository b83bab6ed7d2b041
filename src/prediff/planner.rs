//! Builds a pre-diff plan from matched old/new entry pairs and divination
//! results (§4.4).

use std::collections::HashMap;

use tracing::debug;

use super::plan::{Explanation, PreDiffPlanEntry, UncompressionOption};
use crate::concurrency::CancellationToken;
use crate::deflate::{Divination, DeflateEngine};
use crate::error::{PatchError, PatchResult};
use crate::zip::{ArchiveIndex, CompressionMethod};

/// Divination results for one archive's entries, keyed by path.
pub type DivinationMap = HashMap<String, Divination>;

/// Builds one [`PreDiffPlanEntry`] per path present in both `old` and `new`.
/// Paths present in only one archive are skipped per §4.4: new-only paths
/// appear purely in the delta, old-only paths are ignored.
///
/// `old_raw`/`new_raw` are callbacks returning the raw (still-compressed)
/// bytes for a given path's old/new entry, used for the byte-identity and
/// uncompressed-identity checks.
pub fn build_plan(
    old: &ArchiveIndex,
    new: &ArchiveIndex,
    old_divination: &DivinationMap,
    new_divination: &DivinationMap,
    engine: &dyn DeflateEngine,
    mut old_raw: impl FnMut(&str) -> std::io::Result<Vec<u8>>,
    mut new_raw: impl FnMut(&str) -> std::io::Result<Vec<u8>>,
    cancellation: &CancellationToken,
) -> PatchResult<Vec<PreDiffPlanEntry>> {
    let mut plan = Vec::new();

    for (new_index, new_entry) in new.entries.iter().enumerate() {
        if cancellation.is_cancelled() {
            return Err(PatchError::Cancelled);
        }
        let Some(old_index) = old.entries.iter().position(|e| e.path == new_entry.path) else {
            continue;
        };
        let old_entry = &old.entries[old_index];

        let old_bytes = old_raw(&old_entry.path)?;
        let new_bytes = new_raw(&new_entry.path)?;

        let (option, explanation) = if old_bytes == new_bytes {
            (UncompressionOption::UncompressNeither, Explanation::CompressedBytesIdentical)
        } else if old_entry.compression_method != CompressionMethod::Deflate
            || new_entry.compression_method != CompressionMethod::Deflate
        {
            (UncompressionOption::UncompressNeither, Explanation::Unsuitable)
        } else if !is_reproducible(old_divination, &old_entry.path) || !is_reproducible(new_divination, &new_entry.path) {
            (UncompressionOption::UncompressNeither, Explanation::DeflateUnsuitable)
        } else {
            let old_nowrap = old_divination[&old_entry.path].params().map(|p| p.nowrap).unwrap_or(true);
            let new_nowrap = new_divination[&new_entry.path].params().map(|p| p.nowrap).unwrap_or(true);
            let old_inflated = engine.inflate(&old_bytes, old_nowrap).ok();
            let new_inflated = engine.inflate(&new_bytes, new_nowrap).ok();
            match (old_inflated, new_inflated) {
                (Some(o), Some(n)) if o == n => {
                    (UncompressionOption::UncompressNeither, Explanation::UncompressedBytesIdentical)
                }
                _ => (UncompressionOption::UncompressBoth, Explanation::CompressedBytesChanged),
            }
        };

        debug!(path = %new_entry.path, ?option, ?explanation, "planned entry");

        plan.push(PreDiffPlanEntry {
            path: new_entry.path.clone(),
            old_index,
            new_index,
            option,
            explanation,
            new_uncompressed_size: u64::from(new_entry.uncompressed_size),
            old_uncompressed_size: u64::from(old_entry.uncompressed_size),
        });
    }

    Ok(plan)
}

fn is_reproducible(divination: &DivinationMap, path: &str) -> bool {
    divination.get(path).is_some_and(Divination::is_reproducible)
}
