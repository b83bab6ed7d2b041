//! A byte sink that stays entirely in memory below a configurable threshold
//! and spills to a uniquely named, owner-only temporary file above it (§5
//! Resources).
//!
//! Readers see a single monotonic byte sequence regardless of which storage
//! tier backs it; the spill is transparent once writing is complete and
//! [`HybridBuffer::into_source`] is called.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::byte_source::{ByteSource, FileSource, MemorySource};

/// Default in-memory threshold before spilling to disk: 32 MiB.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 32 * 1024 * 1024;

enum Inner {
    Memory(Vec<u8>),
    File { file: tempfile::NamedTempFile, len: u64 },
}

/// A write sink that transparently spills from memory to a temp file once
/// `threshold` bytes have been written.
pub struct HybridBuffer {
    threshold: u64,
    dir: Option<PathBuf>,
    inner: Inner,
}

impl HybridBuffer {
    /// Creates a new buffer with the given in-memory threshold, spilling to
    /// the OS default temp directory if exceeded.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            dir: None,
            inner: Inner::Memory(Vec::new()),
        }
    }

    /// Creates a new buffer that spills into `dir` instead of the OS default
    /// temp directory.
    pub fn new_in(threshold: u64, dir: impl Into<PathBuf>) -> Self {
        Self {
            threshold,
            dir: Some(dir.into()),
            inner: Inner::Memory(Vec::new()),
        }
    }

    /// Creates a buffer at `threshold`, spilling into `dir` when given.
    pub fn with_threshold_and_dir(threshold: u64, dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::new_in(threshold, dir),
            None => Self::new(threshold),
        }
    }

    /// Creates a new buffer at the default 32 MiB threshold.
    pub fn with_default_threshold() -> Self {
        Self::new(DEFAULT_THRESHOLD_BYTES)
    }

    /// Current length in bytes, regardless of storage tier.
    pub fn len(&self) -> u64 {
        match &self.inner {
            Inner::Memory(v) => v.len() as u64,
            Inner::File { len, .. } => *len,
        }
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spill_to_disk(&mut self) -> io::Result<()> {
        let Inner::Memory(existing) = std::mem::replace(&mut self.inner, Inner::Memory(Vec::new())) else {
            return Ok(());
        };
        let mut file = match &self.dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new()?,
        };
        set_owner_only_permissions(file.as_file())?;
        file.write_all(&existing)?;
        let len = existing.len() as u64;
        debug!(len, "hybrid buffer spilled to temp file");
        self.inner = Inner::File { file, len };
        Ok(())
    }

    /// Consumes the buffer, returning a [`ByteSource`] over its contents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the spilled temp file cannot be converted to
    /// a persisted path.
    pub fn into_source(self) -> io::Result<Box<dyn ByteSource>> {
        match self.inner {
            Inner::Memory(data) => Ok(Box::new(MemorySource::new(data))),
            Inner::File { file, .. } => {
                let (_handle, path) = file.keep().map_err(|e| e.error)?;
                Ok(Box::new(FileSource::open(path)?))
            }
        }
    }
}

impl Write for HybridBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Inner::Memory(data) = &self.inner {
            if data.len() as u64 + buf.len() as u64 > self.threshold {
                self.spill_to_disk()?;
            }
        }
        match &mut self.inner {
            Inner::Memory(data) => {
                data.extend_from_slice(buf);
                Ok(buf.len())
            }
            Inner::File { file, len } => {
                file.seek(SeekFrom::End(0))?;
                let written = file.write(buf)?;
                *len += written as u64;
                Ok(written)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Inner::File { file, .. } = &mut self.inner {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(file: &std::fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = u32::from(libc::S_IRUSR) | u32::from(libc::S_IWUSR);
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_file: &std::fs::File) -> io::Result<()> {
    Ok(())
}
