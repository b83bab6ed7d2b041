use std::io::Cursor;
use std::sync::Arc;

use super::{check_range, ByteSource, OutOfRangeError};

/// An in-memory byte source backed by an `Arc<[u8]>`.
///
/// Cloning is cheap (reference-counted); any number of concurrent readers
/// may be opened since each reader gets its own [`Cursor`] over a clone of
/// the `Arc`.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
    offset: u64,
    length: u64,
}

impl MemorySource {
    /// Wraps an owned byte vector as a [`MemorySource`].
    pub fn new(data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        Self {
            data: Arc::from(data),
            offset: 0,
            length,
        }
    }

    /// Wraps a pre-shared `Arc<[u8]>`, covering the whole buffer.
    pub fn from_arc(data: Arc<[u8]>) -> Self {
        let length = data.len() as u64;
        Self {
            data,
            offset: 0,
            length,
        }
    }
}

impl ByteSource for MemorySource {
    fn length(&self) -> u64 {
        self.length
    }

    fn open_stream(&self) -> std::io::Result<Box<dyn std::io::Read + Send>> {
        let start = self.offset as usize;
        let end = start + self.length as usize;
        Ok(Box::new(Cursor::new(SliceOwner {
            data: self.data.clone(),
            start,
            end,
        })))
    }

    fn slice(&self, offset: u64, length: u64) -> Result<Box<dyn ByteSource>, OutOfRangeError> {
        check_range(offset, length, self.length)?;
        Ok(Box::new(Self {
            data: self.data.clone(),
            offset: self.offset + offset,
            length,
        }))
    }

    fn supports_multiple_streams(&self) -> bool {
        true
    }
}

/// Cheap `AsRef<[u8]>` adapter so `Cursor` can read a bounded window of a
/// shared `Arc<[u8]>` without copying.
struct SliceOwner {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl AsRef<[u8]> for SliceOwner {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}
