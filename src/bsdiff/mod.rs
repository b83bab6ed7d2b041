//! The BSDIFF-style binary delta codec: suffix-array matching, the greedy
//! diff loop, and the ENDSLEY/BSDIFF43 wire format (§4.6, §4.7).

mod codec;
mod error;
mod matcher;
mod suffix;

pub use codec::{apply_patch, encode_patch, offtin, offtout, ControlRecord, BSDIFF_MAGIC};
pub use error::{BsdiffError, BsdiffResult};
pub use matcher::{length_of_match, Matcher};
pub use suffix::{compute_diff, DiffResult, SuffixArrayMatcher};

use tracing::instrument;

use crate::concurrency::CancellationToken;

/// Builds a complete BSDIFF payload transforming `old` into `new`, using the
/// suffix-array matcher (the production default).
///
/// # Errors
///
/// Returns [`BsdiffError::Cancelled`] if `cancellation` is observed cancelled
/// during the diff scan.
#[instrument(skip(old, new, cancellation), fields(old_len = old.len(), new_len = new.len()))]
pub fn build_patch(old: &[u8], new: &[u8], cancellation: &CancellationToken) -> BsdiffResult<Vec<u8>> {
    let sa_matcher = SuffixArrayMatcher::new(old);
    let diff = compute_diff(old, new, &sa_matcher, cancellation)?;
    Ok(encode_patch(new.len() as i64, &diff.control, &diff.diff_data, &diff.extra_data))
}
