//! Errors from framing or parsing a patch container (§6 Patch frame).

use thiserror::Error;

/// Failures specific to the patch container's on-disk frame.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The frame did not begin with the `"GFbFv1_0"` magic.
    #[error("bad patch frame magic")]
    BadMagic,

    /// The compatibility-window id is not one this build knows how to honor.
    #[error("unknown compatibility window id: {0}")]
    UnknownCompatibilityWindow(u8),

    /// A delta entry's format id is not one this build knows how to apply.
    #[error("unknown delta format id: {0}")]
    UnknownDeltaFormat(u8),

    /// A recompress range's strategy code is not one this build knows how to
    /// decode back into a [`crate::deflate::Strategy`].
    #[error("unknown deflate strategy code: {0}")]
    UnknownStrategyCode(u8),

    /// Delta entries did not tile their declared blob space exactly once.
    #[error("delta entry ranges overlap or leave a gap in the {space} space")]
    RangeOverlapOrGap {
        /// Which space failed to tile: `"old"` or `"new"`.
        space: &'static str,
    },

    /// The frame declared zero delta entries; at least one is required.
    #[error("patch frame declares zero delta entries")]
    NoDeltaEntries,

    /// Binary framing failed to parse (truncated or structurally invalid).
    #[error("malformed patch frame: {0}")]
    Malformed(#[from] binrw::Error),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for patch container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

impl ContainerError {
    /// Whether this error reflects a structurally invalid frame, as opposed
    /// to an unknown (but structurally valid) id.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::BadMagic | Self::RangeOverlapOrGap { .. } | Self::NoDeltaEntries | Self::Malformed(_)
        )
    }
}
