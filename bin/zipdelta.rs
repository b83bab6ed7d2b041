use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use zipdelta::byte_source::FileSource;
use zipdelta::{apply_patch, generate_patch, ApplierConfig, GeneratorConfig};

#[derive(Parser)]
#[command(
    name = "zipdelta",
    about = "Generates and applies binary patches between ZIP archives",
    version
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Number of worker threads for divination (`make-patch` only)
    #[arg(short = 'j', long, default_value_t = 1, global = true)]
    jobs: usize,

    /// In-memory threshold in bytes before a hybrid buffer spills to disk
    #[arg(long, global = true)]
    hybrid_buffer_threshold: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a patch transforming `old` into `new`, writing it to `out`
    MakePatch {
        old: PathBuf,
        new: PathBuf,
        out: PathBuf,
    },
    /// Applies `patch` to `old`, writing the reconstructed archive to `out`
    ApplyPatch {
        old: PathBuf,
        patch: PathBuf,
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    match cli.command {
        Commands::MakePatch { old, new, out } => {
            let old_source = FileSource::open(&old)?;
            let new_source = FileSource::open(&new)?;

            let mut config = GeneratorConfig::new().with_jobs(cli.jobs);
            if let Some(threshold) = cli.hybrid_buffer_threshold {
                config = config.with_hybrid_buffer_threshold(threshold);
            }

            let patch = generate_patch(&old_source, &new_source, &config)?;
            std::fs::write(&out, patch)?;
            tracing::info!(out = %out.display(), "patch written");
        }
        Commands::ApplyPatch { old, patch, out } => {
            let old_source = FileSource::open(&old)?;
            let patch_bytes = std::fs::read(&patch)?;

            let mut config = ApplierConfig::new();
            if let Some(threshold) = cli.hybrid_buffer_threshold {
                config = config.with_hybrid_buffer_threshold(threshold);
            }

            let applied = apply_patch(&old_source, &patch_bytes, &config)?;
            std::fs::write(&out, applied)?;
            tracing::info!(out = %out.display(), "archive reconstructed");
        }
    }

    Ok(())
}
