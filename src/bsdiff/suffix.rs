//! Suffix-array construction and the suffix-array-backed [`Matcher`], plus
//! the greedy diff loop that drives any [`Matcher`] into a control stream
//! (§4.6).

use tracing::instrument;

use super::error::{BsdiffError, BsdiffResult};
use super::matcher::{length_of_match, Matcher};
use super::ControlRecord;
use crate::concurrency::CancellationToken;

/// A suffix array over a fixed `old` buffer, built once and queried by
/// [`SuffixArrayMatcher::find_match`] for the remainder of a diff.
///
/// Built with `divsufsort` (Larsson-Sadakane), O(n log n) worst case.
pub struct SuffixArrayMatcher<'a> {
    old: &'a [u8],
    sa: Vec<i32>,
}

impl<'a> SuffixArrayMatcher<'a> {
    /// Builds the suffix array over `old`. O(n log n).
    #[instrument(skip(old), fields(old_len = old.len()))]
    pub fn new(old: &'a [u8]) -> Self {
        let sa = if old.is_empty() {
            Vec::new()
        } else {
            let mut sa = vec![0i32; old.len()];
            divsufsort::sort_in_place(old, &mut sa);
            sa
        };
        Self { old, sa }
    }

    /// The suffix array itself, exposed for the suffix-array-correctness
    /// property test.
    pub fn suffix_array(&self) -> &[i32] {
        &self.sa
    }
}

impl Matcher for SuffixArrayMatcher<'_> {
    fn find_match(&self, new: &[u8], scan: usize) -> (usize, usize) {
        search(&self.sa, self.old, &new[scan..])
    }
}

/// Binary search over `sa` for the longest prefix of `needle` occurring in
/// `old`. On a length tie between the two boundary candidates the
/// lower-indexed `sa` entry wins, matching the deterministic tie-break §4.6
/// requires.
fn search(sa: &[i32], old: &[u8], needle: &[u8]) -> (usize, usize) {
    if sa.is_empty() || needle.is_empty() {
        return (0, 0);
    }

    let mut st: usize = 0;
    let mut en: usize = sa.len() - 1;

    while en - st > 1 {
        let pivot = st + (en - st) / 2;
        let pivot_pos = sa[pivot] as usize;
        let pivot_len = length_of_match(old, pivot_pos, needle, 0);

        if pivot_len == needle.len() || (pivot_pos + pivot_len < old.len() && old[pivot_pos + pivot_len] < needle[pivot_len]) {
            st = pivot;
        } else {
            en = pivot;
        }
    }

    let start_pos = sa[st] as usize;
    let end_pos = sa[en] as usize;
    let start_len = length_of_match(old, start_pos, needle, 0);
    let end_len = length_of_match(old, end_pos, needle, 0);

    if start_len >= end_len {
        (start_pos, start_len)
    } else {
        (end_pos, end_len)
    }
}

/// The three byte buffers a completed diff decomposes into: control records
/// plus the concatenated diff and extra bytes they index into.
pub struct DiffResult {
    /// One record per accepted match, in scan order.
    pub control: Vec<ControlRecord>,
    /// Concatenated `new[i] - old[j]` (mod 256) bytes for every record's diff span.
    pub diff_data: Vec<u8>,
    /// Concatenated verbatim `new` bytes for every record's extra span.
    pub extra_data: Vec<u8>,
}

/// Runs the greedy bsdiff diff loop over `old` and `new`, using `matcher` to
/// find the longest match at each scan position (§4.6 Greedy diff).
///
/// `matcher` must have been built over the same `old` buffer passed here;
/// this is an invariant of the caller, not checked here, mirroring the
/// "matcher is a polymorphic collaborator" design (§9).
///
/// # Errors
///
/// Returns [`BsdiffError::Cancelled`] if `cancellation` is observed cancelled
/// at a scan step boundary.
#[allow(clippy::suspicious_operation_groupings)]
#[instrument(skip(old, new, matcher, cancellation), fields(old_len = old.len(), new_len = new.len()))]
pub fn compute_diff(old: &[u8], new: &[u8], matcher: &dyn Matcher, cancellation: &CancellationToken) -> BsdiffResult<DiffResult> {
    let old_size = old.len();
    let new_size = new.len();

    let mut control = Vec::new();
    let mut diff_data = Vec::new();
    let mut extra_data = Vec::new();

    let mut scan: usize = 0;
    let mut len: usize = 0;
    let mut pos: usize = 0;
    let mut lastscan: usize = 0;
    let mut lastpos: usize = 0;
    let mut lastoffset: i64 = 0;

    while scan < new_size {
        if cancellation.is_cancelled() {
            return Err(BsdiffError::Cancelled);
        }
        let mut oldscore: usize = 0;
        scan += len;
        let mut scsc = scan;

        while scan < new_size {
            let (match_pos, match_len) = matcher.find_match(new, scan);
            pos = match_pos;
            len = match_len;

            while scsc < scan + len {
                let old_idx = (scsc as i64 + lastoffset) as usize;
                if old_idx < old_size && old[old_idx] == new[scsc] {
                    oldscore += 1;
                }
                scsc += 1;
            }

            if (len == oldscore && len != 0) || len > oldscore + 8 {
                break;
            }

            let old_idx = (scan as i64 + lastoffset) as usize;
            if old_idx < old_size && old[old_idx] == new[scan] {
                oldscore -= 1;
            }

            scan += 1;
        }

        if len != oldscore || scan == new_size {
            let mut s: i64 = 0;
            let mut sf: i64 = 0;
            let mut lenf: usize = 0;
            {
                let mut i: usize = 0;
                while lastscan + i < scan && lastpos + i < old_size {
                    if old[lastpos + i] == new[lastscan + i] {
                        s += 1;
                    }
                    i += 1;
                    if s * 2 - i as i64 > sf * 2 - lenf as i64 {
                        sf = s;
                        lenf = i;
                    }
                }
            }

            let mut lenb: usize = 0;
            if scan < new_size {
                let mut s: i64 = 0;
                let mut sb: i64 = 0;
                let mut i: usize = 1;
                while scan >= lastscan + i && pos >= i {
                    if old[pos - i] == new[scan - i] {
                        s += 1;
                    }
                    if s * 2 - i as i64 > sb * 2 - lenb as i64 {
                        sb = s;
                        lenb = i;
                    }
                    i += 1;
                }
            }

            if lastscan + lenf > scan - lenb {
                let overlap = (lastscan + lenf) - (scan - lenb);
                let mut s: i64 = 0;
                let mut ss: i64 = 0;
                let mut lens: usize = 0;
                for i in 0..overlap {
                    if new[lastscan + lenf - overlap + i] == old[lastpos + lenf - overlap + i] {
                        s += 1;
                    }
                    if new[scan - lenb + i] == old[pos - lenb + i] {
                        s -= 1;
                    }
                    if s > ss {
                        ss = s;
                        lens = i + 1;
                    }
                }
                lenf += lens;
                lenf -= overlap;
                lenb -= lens;
            }

            for i in 0..lenf {
                diff_data.push(new[lastscan + i].wrapping_sub(old[lastpos + i]));
            }

            let extra_start = lastscan + lenf;
            let extra_end = scan - lenb;
            if extra_end > extra_start {
                extra_data.extend_from_slice(&new[extra_start..extra_end]);
            }

            let diff_length = lenf as i64;
            let extra_length = (extra_end - extra_start) as i64;
            let seek = (pos as i64 - lenb as i64) - (lastpos as i64 + lenf as i64);

            control.push(ControlRecord {
                diff_length,
                extra_length,
                seek,
            });

            lastscan = scan - lenb;
            lastpos = pos - lenb;
            lastoffset = pos as i64 - scan as i64;
        }
    }

    Ok(DiffResult {
        control,
        diff_data,
        extra_data,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::super::matcher::NaiveMatcher;
    use super::*;

    #[test]
    fn search_finds_exact_substring() {
        let old = b"the quick brown fox";
        let mut sa = vec![0i32; old.len()];
        divsufsort::sort_in_place(old, &mut sa);
        let (pos, len) = search(&sa, old, b"brown");
        assert_eq!(len, 5);
        assert_eq!(&old[pos..pos + 5], b"brown");
    }

    #[test]
    fn search_every_substring_of_banana() {
        let old = b"banana";
        let mut sa = vec![0i32; old.len()];
        divsufsort::sort_in_place(old, &mut sa);
        for start in 0..old.len() {
            for end in (start + 1)..=old.len() {
                let needle = &old[start..end];
                let (pos, len) = search(&sa, old, needle);
                assert_eq!(len, needle.len(), "substring {needle:?} should match fully");
                assert!(pos <= old.len() - needle.len());
                assert_eq!(&old[pos..pos + len], needle);
            }
        }
    }

    #[test]
    fn self_identity_control_stream_for_aaa() {
        let old = b"aaa";
        let new = b"aaa";
        let matcher = SuffixArrayMatcher::new(old);
        let result = compute_diff(old, new, &matcher, &CancellationToken::new()).expect("compute diff");
        let records: Vec<(i64, i64, i64)> = result
            .control
            .iter()
            .map(|r| (r.diff_length, r.extra_length, r.seek))
            .collect();
        assert_eq!(records, vec![(0, 0, 0), (3, 0, 0)]);
    }

    #[test]
    fn self_identity_control_stream_for_aa_to_bb() {
        let old = b"aa";
        let new = b"bb";
        let matcher = SuffixArrayMatcher::new(old);
        let result = compute_diff(old, new, &matcher, &CancellationToken::new()).expect("compute diff");
        let records: Vec<(i64, i64, i64)> = result
            .control
            .iter()
            .map(|r| (r.diff_length, r.extra_length, r.seek))
            .collect();
        assert_eq!(records, vec![(0, 2, 0)]);
    }

    #[test]
    fn overlap_suppression() {
        let old = b"aaaaaaaaaaazzzbbb";
        let new = b"aaabbbaa@aa@aa";
        let matcher = SuffixArrayMatcher::new(old);
        let result = compute_diff(old, new, &matcher, &CancellationToken::new()).expect("compute diff");
        let records: Vec<(i64, i64, i64)> = result
            .control
            .iter()
            .map(|r| (r.diff_length, r.extra_length, r.seek))
            .collect();
        assert_eq!(records, vec![(0, 0, 0), (3, 0, 11), (3, 8, 0)]);
    }

    #[test]
    fn naive_matcher_agrees_with_suffix_array_matcher() {
        let old = b"the quick brown fox jumps over the lazy dog";
        let new = b"the slow brown fox leaps over the lazy cat";

        let sa_matcher = SuffixArrayMatcher::new(old);
        let naive_matcher = NaiveMatcher::new(old);

        let sa_result = compute_diff(old, new, &sa_matcher, &CancellationToken::new()).expect("compute diff");
        let naive_result = compute_diff(old, new, &naive_matcher, &CancellationToken::new()).expect("compute diff");

        assert_eq!(sa_result.diff_data, naive_result.diff_data);
        assert_eq!(sa_result.extra_data, naive_result.extra_data);
    }

    #[test]
    fn empty_old_puts_everything_in_extra() {
        let matcher = SuffixArrayMatcher::new(b"");
        let result = compute_diff(b"", b"new data", &matcher, &CancellationToken::new()).expect("compute diff");
        assert_eq!(result.extra_data, b"new data");
        assert!(result.diff_data.is_empty());
    }
}
