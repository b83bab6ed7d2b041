//! Recovers the `(level, strategy, nowrap)` parameters that reproduce a given
//! compressed byte sequence, or determines that none do.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::engine::{DeflateEngine, DeflateParams, Strategy};
use super::error::{DeflateError, DeflateResult};
use crate::concurrency::CancellationToken;

/// Outcome of divining one entry's DEFLATE parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divination {
    /// Parameters that reproduce the input bit-for-bit.
    Reproducible(DeflateParams),
    /// No parameter combination reproduced the input; the entry must be
    /// passed through verbatim.
    Unreproducible,
}

impl Divination {
    /// Returns the parameters if reproducible.
    pub fn params(self) -> Option<DeflateParams> {
        match self {
            Self::Reproducible(p) => Some(p),
            Self::Unreproducible => None,
        }
    }

    /// Whether divination succeeded.
    pub fn is_reproducible(self) -> bool {
        matches!(self, Self::Reproducible(_))
    }
}

/// Per-divination-task hint cache, owned by the task rather than shared
/// process-wide (§9 "Global mutable state: None").
#[derive(Debug, Default)]
pub struct HintCache {
    best_guess_nowrap: bool,
    by_extension: HashMap<String, DeflateParams>,
}

impl HintCache {
    /// Creates a new cache with the given initial `nowrap` guess.
    pub fn new(initial_nowrap_guess: bool) -> Self {
        Self {
            best_guess_nowrap: initial_nowrap_guess,
            by_extension: HashMap::new(),
        }
    }

    /// The extension hint recorded for `extension`, if any.
    pub fn hint_for(&self, extension: &str) -> Option<DeflateParams> {
        self.by_extension.get(extension).copied()
    }
}

/// Divines the DEFLATE parameters of `compressed`, given a best-guess
/// `nowrap` and extension hint owned by `cache`.
///
/// Algorithm (§4.3):
/// 1. Inflate with the best-guess `nowrap`; on failure, retry the opposite;
///    on second failure, mark unreproducible.
/// 2. Record the successful `nowrap` as the new best guess.
/// 3. Trial extension-hinted params (if any), then `(6, Default, nowrap)`,
///    then `(9, Default, nowrap)`, comparing length then SHA-256.
/// 4. If none match, exhaustively sweep `strategy × level` with early
///    abandonment once output length exceeds the target.
/// 5. Record a match in the hint cache keyed by extension.
///
/// # Errors
///
/// Returns [`DeflateError::Cancelled`] if `cancellation` is observed
/// cancelled at a trial boundary.
pub fn divine(
    engine: &dyn DeflateEngine,
    compressed: &[u8],
    extension: Option<&str>,
    cache: &mut HintCache,
    cancellation: &CancellationToken,
) -> DeflateResult<Divination> {
    let (uncompressed, nowrap) = match inflate_with_fallback(engine, compressed, cache.best_guess_nowrap)? {
        Some(result) => result,
        None => return Ok(Divination::Unreproducible),
    };
    cache.best_guess_nowrap = nowrap;

    let target_len = compressed.len();
    let target_digest = Sha256::digest(compressed);

    let mut quick_trials = Vec::with_capacity(3);
    if let Some(hint) = extension.and_then(|ext| cache.hint_for(ext)) {
        quick_trials.push(DeflateParams::new(hint.level, hint.strategy, nowrap));
    }
    quick_trials.push(DeflateParams::new(6, Strategy::Default, nowrap));
    quick_trials.push(DeflateParams::new(9, Strategy::Default, nowrap));

    for params in quick_trials {
        if cancellation.is_cancelled() {
            return Err(DeflateError::Cancelled);
        }
        if matches(engine, &uncompressed, params, target_len, &target_digest) {
            record_hint(cache, extension, params);
            return Ok(Divination::Reproducible(params));
        }
    }

    for strategy in Strategy::ALL {
        if cancellation.is_cancelled() {
            return Err(DeflateError::Cancelled);
        }
        if strategy == Strategy::HuffmanOnly {
            let params = DeflateParams::new(1, strategy, nowrap);
            if matches(engine, &uncompressed, params, target_len, &target_digest) {
                record_hint(cache, extension, params);
                return Ok(Divination::Reproducible(params));
            }
            continue;
        }

        let best_len = engine.deflate(&uncompressed, DeflateParams::new(9, strategy, nowrap))?.len();
        if best_len > target_len {
            trace!(?strategy, "abandoning strategy, level 9 already exceeds target length");
            continue;
        }

        for level in (1..=9u8).rev() {
            if cancellation.is_cancelled() {
                return Err(DeflateError::Cancelled);
            }
            let params = DeflateParams::new(level, strategy, nowrap);
            let candidate = engine.deflate(&uncompressed, params)?;
            if candidate.len() > target_len {
                break;
            }
            if candidate.len() == target_len && Sha256::digest(&candidate) == target_digest {
                record_hint(cache, extension, params);
                return Ok(Divination::Reproducible(params));
            }
        }
    }

    debug!(target_len, "exhaustive sweep found no reproducible parameters");
    Ok(Divination::Unreproducible)
}

fn inflate_with_fallback(
    engine: &dyn DeflateEngine,
    compressed: &[u8],
    best_guess_nowrap: bool,
) -> DeflateResult<Option<(Vec<u8>, bool)>> {
    if let Ok(data) = engine.inflate(compressed, best_guess_nowrap) {
        return Ok(Some((data, best_guess_nowrap)));
    }
    if let Ok(data) = engine.inflate(compressed, !best_guess_nowrap) {
        return Ok(Some((data, !best_guess_nowrap)));
    }
    Ok(None)
}

fn matches(
    engine: &dyn DeflateEngine,
    uncompressed: &[u8],
    params: DeflateParams,
    target_len: usize,
    target_digest: &sha2::digest::Output<Sha256>,
) -> bool {
    match engine.deflate(uncompressed, params) {
        Ok(candidate) => candidate.len() == target_len && Sha256::digest(&candidate) == *target_digest,
        Err(_) => false,
    }
}

fn record_hint(cache: &mut HintCache, extension: Option<&str>, params: DeflateParams) {
    if let Some(ext) = extension {
        cache.by_extension.insert(ext.to_string(), params);
    }
}
