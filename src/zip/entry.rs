//! In-memory representation of a single archive entry, reconciled from its
//! central-directory record and local header.

use super::header::{FLAG_DATA_DESCRIPTOR, FLAG_UTF8_NAME, METHOD_DEFLATE, METHOD_STORED};

/// Compression method of an entry's raw file data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored (no compression).
    Stored,
    /// DEFLATE (RFC 1951).
    Deflate,
    /// Any other method code; out of scope for rewriting, passed through verbatim.
    Other(u16),
}

impl CompressionMethod {
    pub(crate) fn from_code(code: u16) -> Self {
        match code {
            METHOD_STORED => Self::Stored,
            METHOD_DEFLATE => Self::Deflate,
            other => Self::Other(other),
        }
    }

    pub(crate) fn to_code(self) -> u16 {
        match self {
            Self::Stored => METHOD_STORED,
            Self::Deflate => METHOD_DEFLATE,
            Self::Other(code) => code,
        }
    }
}

/// Byte ranges, relative to the archive's byte source, that make up one
/// entry's local section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSectionRanges {
    /// Offset and length of the local file header (including name/extra field).
    pub local_header: (u64, u64),
    /// Offset and length of the raw (still-compressed, if applicable) file data.
    pub raw_data: (u64, u64),
    /// Offset and length of the optional trailing data descriptor, if present.
    pub data_descriptor: Option<(u64, u64)>,
}

/// One archive entry, reconciling its central-directory record with its
/// local-section layout.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// Entry path, decoded per [`FLAG_UTF8_NAME`].
    pub path: String,
    /// Raw path bytes as stored (UTF-8 or IBM-437).
    pub raw_path: Vec<u8>,
    /// Compression method of the raw file data.
    pub compression_method: CompressionMethod,
    /// General-purpose bit flags.
    pub flags: u16,
    /// MS-DOS packed last-modified time.
    pub last_mod_time: u16,
    /// MS-DOS packed last-modified date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the compressed data.
    pub compressed_size: u32,
    /// Size of the uncompressed data.
    pub uncompressed_size: u32,
    /// Extra field bytes from the central directory record.
    pub extra_field: Vec<u8>,
    /// File comment bytes.
    pub file_comment: Vec<u8>,
    /// Disk number on which the local header starts.
    pub disk_number_start: u16,
    /// Internal file attributes.
    pub internal_attributes: u16,
    /// External file attributes.
    pub external_attributes: u32,
    /// Version made by / version needed to extract, as stored in the central directory.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// Offset of the local file header within the archive's byte source.
    pub local_header_offset: u64,
    /// Precomputed byte ranges of this entry's local section.
    pub local_section: LocalSectionRanges,
}

impl ZipEntry {
    /// Whether the data-descriptor flag is set for this entry.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Whether the UTF-8 name flag is set for this entry.
    pub fn has_utf8_name(&self) -> bool {
        self.flags & FLAG_UTF8_NAME != 0
    }
}

/// A fully parsed archive: an ordered list of entries plus a lookup index by path.
///
/// Entries are exposed in central-directory order (the ordering guarantee of
/// the ZIP parser); `path_index` gives O(1) lookup without re-deriving order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    /// Entries in central-directory order.
    pub entries: Vec<ZipEntry>,
    path_index: std::collections::HashMap<String, usize>,
}

impl ArchiveIndex {
    /// Builds an index from an ordered entry list, recording path → position.
    pub fn new(entries: Vec<ZipEntry>) -> Self {
        let path_index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        Self { entries, path_index }
    }

    /// Looks up an entry by path.
    pub fn get(&self, path: &str) -> Option<&ZipEntry> {
        self.path_index.get(path).map(|&i| &self.entries[i])
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_entry(path: &str) -> ZipEntry {
        ZipEntry {
            path: path.to_string(),
            raw_path: path.as_bytes().to_vec(),
            compression_method: CompressionMethod::Deflate,
            flags: FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
            local_header_offset: 0,
            local_section: LocalSectionRanges {
                local_header: (0, 30),
                raw_data: (30, 0),
                data_descriptor: None,
            },
        }
    }

    #[test]
    fn index_looks_up_by_path() {
        let idx = ArchiveIndex::new(vec![sample_entry("a.txt"), sample_entry("b.txt")]);
        assert_eq!(idx.len(), 2);
        assert!(idx.get("a.txt").is_some());
        assert!(idx.get("missing").is_none());
    }

    #[test]
    fn entry_flag_helpers() {
        let entry = sample_entry("a.txt");
        assert!(entry.has_utf8_name());
        assert!(!entry.has_data_descriptor());
    }
}
