use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{check_range, ByteSource, OutOfRangeError};

/// A file-backed byte source covering `[offset, offset + length)` of the file at `path`.
///
/// Each call to [`ByteSource::open_stream`] opens an independent file handle
/// via [`File::open`], so concurrent readers never contend on a shared cursor.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: Arc<PathBuf>,
    offset: u64,
    length: u64,
}

impl FileSource {
    /// Opens `path` and covers its entire contents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file's metadata cannot be read.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let length = std::fs::metadata(&path)?.len();
        Ok(Self {
            path: Arc::new(path),
            offset: 0,
            length,
        })
    }
}

impl ByteSource for FileSource {
    fn length(&self) -> u64 {
        self.length
    }

    fn open_stream(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let mut file = File::open(self.path.as_path())?;
        file.seek(SeekFrom::Start(self.offset))?;
        let limited: Take<File> = file.take(self.length);
        Ok(Box::new(limited))
    }

    fn slice(&self, offset: u64, length: u64) -> Result<Box<dyn ByteSource>, OutOfRangeError> {
        check_range(offset, length, self.length)?;
        Ok(Box::new(Self {
            path: self.path.clone(),
            offset: self.offset + offset,
            length,
        }))
    }

    fn supports_multiple_streams(&self) -> bool {
        true
    }
}
