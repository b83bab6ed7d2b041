//! Resource-limit and concurrency configuration for the generator and
//! applier, populated by the CLI or by a library caller.
//!
//! The spec names no external config file format for this system, so
//! configuration is builder-style Rust structs rather than a parsed file —
//! the ambient "configuration" concern is still carried, just expressed the
//! way a library's tunables normally are.

use std::path::PathBuf;

use crate::concurrency::CancellationToken;
use crate::hybrid_buffer::DEFAULT_THRESHOLD_BYTES;
use crate::prediff::DEFAULT_RECOMPRESSION_LIMIT_BYTES;

/// Configuration for [`crate::generator::generate_patch`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of worker threads used for the divination batch (§5 Scheduling).
    pub jobs: usize,
    /// In-memory threshold before a hybrid buffer spills to disk.
    pub hybrid_buffer_threshold: u64,
    /// Cumulative recompression budget (§4.4, §9 Open Question).
    pub recompression_limit: u64,
    /// Cap on the old delta-friendly blob's size.
    pub old_blob_size_cap: u64,
    /// Directory in which spilled hybrid-buffer temp files are created.
    pub temp_dir: Option<PathBuf>,
    /// Checked at loop boundaries throughout generation (§5 Cancellation).
    pub cancellation: CancellationToken,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            hybrid_buffer_threshold: DEFAULT_THRESHOLD_BYTES,
            recompression_limit: DEFAULT_RECOMPRESSION_LIMIT_BYTES,
            old_blob_size_cap: u64::MAX,
            temp_dir: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a config with every default value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the divination worker count.
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Sets the hybrid buffer's in-memory threshold.
    #[must_use]
    pub const fn with_hybrid_buffer_threshold(mut self, threshold: u64) -> Self {
        self.hybrid_buffer_threshold = threshold;
        self
    }

    /// Sets the cumulative recompression budget.
    #[must_use]
    pub const fn with_recompression_limit(mut self, limit: u64) -> Self {
        self.recompression_limit = limit;
        self
    }

    /// Sets the cap on the old delta-friendly blob's size.
    #[must_use]
    pub const fn with_old_blob_size_cap(mut self, cap: u64) -> Self {
        self.old_blob_size_cap = cap;
        self
    }

    /// Sets the directory for spilled temp files.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Sets the token checked at loop boundaries during generation.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Configuration for [`crate::applier::apply_patch`].
#[derive(Debug, Clone)]
pub struct ApplierConfig {
    /// In-memory threshold before a hybrid buffer spills to disk.
    pub hybrid_buffer_threshold: u64,
    /// Directory in which spilled hybrid-buffer temp files are created.
    pub temp_dir: Option<PathBuf>,
    /// Checked at loop boundaries throughout application (§5 Cancellation).
    pub cancellation: CancellationToken,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            hybrid_buffer_threshold: DEFAULT_THRESHOLD_BYTES,
            temp_dir: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl ApplierConfig {
    /// Creates a config with every default value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hybrid buffer's in-memory threshold.
    #[must_use]
    pub const fn with_hybrid_buffer_threshold(mut self, threshold: u64) -> Self {
        self.hybrid_buffer_threshold = threshold;
        self
    }

    /// Sets the directory for spilled temp files.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Sets the token checked at loop boundaries during application.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}
