//! The DEFLATE reproduction engine: inflate, deflate, and the compatibility
//! corpus that together let the applier redeflate bytes identically to a
//! baseline implementation.
//!
//! `flate2`'s high-level `Compress`/`Decompress` types do not expose strategy
//! control (filtered / huffman-only), so the engine reaches into
//! `miniz_oxide`'s lower-level core API directly, which exposes the same
//! `(level, window_bits, strategy)` triple the reference `zlib`/`miniz`
//! implementations use internally.

use miniz_oxide::deflate::core::{
    compress, create_comp_flags_from_zip_params, CompressorOxide, TDEFLFlush, TDEFLStatus,
};

use super::error::{DeflateError, DeflateResult};

/// DEFLATE strategy, mirroring zlib's `Z_DEFAULT_STRATEGY` / `Z_FILTERED` /
/// `Z_HUFFMAN_ONLY`. `HuffmanOnly` ignores `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Default strategy, suitable for most data.
    Default,
    /// Tuned for data produced by a filter (e.g. PNG scanline filters).
    Filtered,
    /// Huffman coding only, no string matching; `level` is ignored.
    HuffmanOnly,
}

impl Strategy {
    const fn to_zlib_constant(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Filtered => 1,
            Self::HuffmanOnly => 2,
        }
    }

    /// All strategies, in the sweep order used by divination (§4.3).
    pub const ALL: [Strategy; 3] = [Strategy::Default, Strategy::Filtered, Strategy::HuffmanOnly];

    /// The wire-format code used by the patch container's recompress ranges
    /// (§6): `0 = default`, `1 = filtered`, `2 = huffman-only`.
    pub const fn to_wire_code(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Filtered => 1,
            Self::HuffmanOnly => 2,
        }
    }

    /// Decodes a wire-format strategy code, returning `None` for any value
    /// other than `0`, `1`, or `2`.
    pub const fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Default),
            1 => Some(Self::Filtered),
            2 => Some(Self::HuffmanOnly),
            _ => None,
        }
    }
}

/// The `(level, strategy, nowrap)` triple that parameterizes one DEFLATE
/// stream. `level` ranges `1..=9`; `nowrap=true` selects raw DEFLATE output,
/// `false` wraps it in zlib framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeflateParams {
    /// Compression level, `1..=9`.
    pub level: u8,
    /// Compression strategy.
    pub strategy: Strategy,
    /// `true` selects raw DEFLATE (no zlib wrapper); `false` wraps in zlib framing.
    pub nowrap: bool,
}

impl DeflateParams {
    /// Convenience constructor for the common `(level, Default, nowrap)` case.
    pub const fn new(level: u8, strategy: Strategy, nowrap: bool) -> Self {
        Self {
            level,
            strategy,
            nowrap,
        }
    }
}

/// Capability set an implementation of the DEFLATE reproduction engine must
/// provide: inflate, deflate, and self-check against a reference corpus.
///
/// The compatibility-window id persisted in a patch (§6) identifies which
/// implementation of this trait the applier must use; an applier presented
/// with an unknown id must fail fatally rather than guess.
pub trait DeflateEngine: Send + Sync {
    /// Inflates `compressed` under the given `nowrap` setting.
    ///
    /// # Errors
    ///
    /// Returns [`DeflateError::BadStream`] if the compressed bytes are not a
    /// valid DEFLATE (or zlib, if `nowrap` is `false`) stream.
    fn inflate(&self, compressed: &[u8], nowrap: bool) -> DeflateResult<Vec<u8>>;

    /// Deflates `uncompressed` under `params`, byte-identical to a conforming
    /// baseline implementation at the same parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DeflateError::BadStream`] only in pathological cases (e.g.
    /// the underlying library reporting a failure); under normal conditions
    /// deflation cannot fail.
    fn deflate(&self, uncompressed: &[u8], params: DeflateParams) -> DeflateResult<Vec<u8>>;

    /// Returns the combinations of `(level, strategy, nowrap)` for which this
    /// engine's output over the embedded reference corpus diverges from the
    /// baseline's recorded SHA-256, i.e. the combinations under which this
    /// host is *not* safe to use for patch generation.
    fn incompatible_values(&self) -> Vec<DeflateParams>;

    /// Whether this engine reproduces the baseline bit-for-bit across every
    /// `(level, strategy, nowrap)` combination.
    fn is_compatible(&self) -> bool {
        self.incompatible_values().is_empty()
    }
}

/// The production [`DeflateEngine`], backed by `miniz_oxide`'s core
/// compressor (for strategy-aware deflation) and its convenience inflate
/// functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinizEngine;

impl MinizEngine {
    /// Creates a new engine instance. Stateless; cheap to construct per call.
    pub const fn new() -> Self {
        Self
    }
}

impl DeflateEngine for MinizEngine {
    fn inflate(&self, compressed: &[u8], nowrap: bool) -> DeflateResult<Vec<u8>> {
        let result = if nowrap {
            miniz_oxide::inflate::decompress_to_vec(compressed)
        } else {
            miniz_oxide::inflate::decompress_to_vec_zlib(compressed)
        };
        result.map_err(|e| DeflateError::BadStream(format!("{e:?}")))
    }

    fn deflate(&self, uncompressed: &[u8], params: DeflateParams) -> DeflateResult<Vec<u8>> {
        Ok(deflate_with_params(uncompressed, params))
    }

    fn incompatible_values(&self) -> Vec<DeflateParams> {
        super::corpus::incompatible_combinations(self)
    }
}

/// Deflates `data` under `params` using `miniz_oxide`'s low-level core API,
/// the only public surface exposing strategy control.
pub(crate) fn deflate_with_params(data: &[u8], params: DeflateParams) -> Vec<u8> {
    let window_bits = if params.nowrap { -15 } else { 15 };
    let flags = create_comp_flags_from_zip_params(
        i32::from(params.level),
        window_bits,
        params.strategy.to_zlib_constant(),
    );
    let mut compressor = CompressorOxide::new(flags);

    let mut output = vec![0u8; (data.len() / 2).max(64)];
    let mut consumed_total = 0usize;
    let mut produced_total = 0usize;

    loop {
        let (status, consumed, produced) = compress(
            &mut compressor,
            &data[consumed_total..],
            &mut output[produced_total..],
            TDEFLFlush::Finish,
        );
        consumed_total += consumed;
        produced_total += produced;

        match status {
            TDEFLStatus::Done => break,
            TDEFLStatus::Okay if produced_total == output.len() => {
                output.resize(output.len() * 2, 0);
            }
            TDEFLStatus::Okay => continue,
            _ => break,
        }
    }

    output.truncate(produced_total);
    output
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deflate_then_inflate_round_trips() {
        let engine = MinizEngine::new();
        let data = b"the quick brown fox jumps over the lazy dog, repeatedly, the quick brown fox";
        let params = DeflateParams::new(6, Strategy::Default, true);
        let compressed = engine.deflate(data, params).expect("deflate");
        let decompressed = engine.inflate(&compressed, true).expect("inflate");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn zlib_wrapped_round_trips() {
        let engine = MinizEngine::new();
        let data = b"zlib wrapped data for round trip testing purposes";
        let params = DeflateParams::new(9, Strategy::Default, false);
        let compressed = engine.deflate(data, params).expect("deflate");
        let decompressed = engine.inflate(&compressed, false).expect("inflate");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn huffman_only_ignores_level() {
        let engine = MinizEngine::new();
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let low = engine
            .deflate(data, DeflateParams::new(1, Strategy::HuffmanOnly, true))
            .expect("deflate");
        let high = engine
            .deflate(data, DeflateParams::new(9, Strategy::HuffmanOnly, true))
            .expect("deflate");
        let decompressed_low = engine.inflate(&low, true).expect("inflate");
        let decompressed_high = engine.inflate(&high, true).expect("inflate");
        assert_eq!(decompressed_low, data);
        assert_eq!(decompressed_high, data);
    }

    #[test]
    fn inflate_rejects_garbage() {
        let engine = MinizEngine::new();
        assert!(engine.inflate(&[0xFF, 0xFF, 0xFF, 0xFF], true).is_err());
    }

    #[test]
    fn strategy_wire_code_round_trips() {
        for strategy in Strategy::ALL {
            let code = strategy.to_wire_code();
            assert_eq!(Strategy::from_wire_code(code), Some(strategy));
        }
        assert_eq!(Strategy::from_wire_code(99), None);
    }
}
