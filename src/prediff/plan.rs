//! Pre-diff plan data model (§3, §4.4).

/// Which side(s) of a matched entry pair should be uncompressed before
/// diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncompressionOption {
    /// Both old and new entries are inflated before diffing.
    UncompressBoth,
    /// Only the old entry is inflated.
    UncompressOld,
    /// Only the new entry is inflated.
    UncompressNew,
    /// Neither entry is inflated; the raw compressed bytes are diffed (or
    /// passed through, if identical).
    UncompressNeither,
}

/// Why a given [`UncompressionOption`] was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Explanation {
    /// The compressed bytes of both entries are byte-identical.
    CompressedBytesIdentical,
    /// The compressed bytes differ and both sides are suitable for uncompression.
    CompressedBytesChanged,
    /// A resource limiter demoted this entry from `UncompressBoth`.
    ResourceConstrained,
    /// The compressed bytes differ but the uncompressed bytes are identical.
    UncompressedBytesIdentical,
    /// One or both sides are not DEFLATE-compressed.
    Unsuitable,
    /// One or both sides' DEFLATE parameters could not be divined.
    DeflateUnsuitable,
}

/// One matched pair of old/new entries (matched by path) and the plan for
/// how to diff them.
#[derive(Debug, Clone)]
pub struct PreDiffPlanEntry {
    /// Shared entry path.
    pub path: String,
    /// Index of the old entry within its [`crate::zip::ArchiveIndex`].
    pub old_index: usize,
    /// Index of the new entry within its [`crate::zip::ArchiveIndex`].
    pub new_index: usize,
    /// Chosen uncompression option.
    pub option: UncompressionOption,
    /// Why this option was chosen.
    pub explanation: Explanation,
    /// Uncompressed size of the new entry, used by the limiter's largest-first ordering.
    pub new_uncompressed_size: u64,
    /// Uncompressed size of the old entry, summed against `old_blob_size_cap`.
    pub old_uncompressed_size: u64,
}

impl PreDiffPlanEntry {
    /// Whether the old side should be inflated under the current plan.
    pub fn uncompresses_old(&self) -> bool {
        matches!(
            self.option,
            UncompressionOption::UncompressBoth | UncompressionOption::UncompressOld
        )
    }

    /// Whether the new side should be inflated under the current plan.
    pub fn uncompresses_new(&self) -> bool {
        matches!(
            self.option,
            UncompressionOption::UncompressBoth | UncompressionOption::UncompressNew
        )
    }

    /// Demotes this entry to `UncompressNeither` with `ResourceConstrained`,
    /// used by the limiter (§4.4).
    pub fn demote(&mut self) {
        self.option = UncompressionOption::UncompressNeither;
        self.explanation = Explanation::ResourceConstrained;
    }
}
