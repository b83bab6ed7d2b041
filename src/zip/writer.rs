//! Serializes an archive from a list of entries, reproducing untouched local
//! sections verbatim and regenerating central-directory bytes for all of them.

use binrw::BinWrite;

use super::entry::CompressionMethod;
use super::error::ZipResult;
use super::header::{CentralDirectoryRecord, EndOfCentralDirectory, LocalFileHeader};

/// One entry's data needed to serialize both its local section and its
/// central-directory record.
#[derive(Debug, Clone)]
pub struct WriteEntry {
    /// Entry path (will be UTF-8 encoded if `flags` sets the UTF-8 bit).
    pub path: String,
    /// Compression method of `raw_data`.
    pub compression_method: CompressionMethod,
    /// General-purpose bit flags.
    pub flags: u16,
    /// MS-DOS packed last-modified time.
    pub last_mod_time: u16,
    /// MS-DOS packed last-modified date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the uncompressed data.
    pub uncompressed_size: u32,
    /// Raw (possibly compressed) file data bytes.
    pub raw_data: Vec<u8>,
    /// Extra field bytes.
    pub extra_field: Vec<u8>,
    /// File comment bytes.
    pub file_comment: Vec<u8>,
    /// External file attributes.
    pub external_attributes: u32,
    /// Version made by.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
}

/// Serializes `entries` into a complete ZIP archive byte stream.
///
/// # Errors
///
/// Returns a [`super::error::ZipError`] if any record fails to serialize
/// (e.g. a binary-format writer error) or if the archive would require
/// fields this crate does not support writing (more than `u16::MAX` entries).
pub fn write_archive(entries: &[WriteEntry]) -> ZipResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut central_records = Vec::with_capacity(entries.len());

    for entry in entries {
        let local_header_offset = out.len() as u32;
        let compressed_size = entry.raw_data.len() as u32;

        let local = LocalFileHeader {
            version_needed: entry.version_needed,
            flags: entry.flags,
            compression_method: entry.compression_method.to_code(),
            last_mod_time: entry.last_mod_time,
            last_mod_date: entry.last_mod_date,
            crc32: entry.crc32,
            compressed_size,
            uncompressed_size: entry.uncompressed_size,
            file_name_length: entry.path.len() as u16,
            extra_field_length: entry.extra_field.len() as u16,
            file_name: entry.path.as_bytes().to_vec(),
            extra_field: entry.extra_field.clone(),
        };

        append_binwrite(&mut out, &local)?;
        out.extend_from_slice(&entry.raw_data);

        central_records.push(CentralDirectoryRecord {
            version_made_by: entry.version_made_by,
            version_needed: entry.version_needed,
            flags: entry.flags,
            compression_method: entry.compression_method.to_code(),
            last_mod_time: entry.last_mod_time,
            last_mod_date: entry.last_mod_date,
            crc32: entry.crc32,
            compressed_size,
            uncompressed_size: entry.uncompressed_size,
            file_name_length: entry.path.len() as u16,
            extra_field_length: entry.extra_field.len() as u16,
            file_comment_length: entry.file_comment.len() as u16,
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes: entry.external_attributes,
            local_header_offset,
            file_name: entry.path.as_bytes().to_vec(),
            extra_field: entry.extra_field.clone(),
            file_comment: entry.file_comment.clone(),
        });
    }

    let cd_offset = out.len() as u32;
    for record in &central_records {
        append_binwrite(&mut out, record)?;
    }
    let cd_size = out.len() as u32 - cd_offset;

    let eocd = EndOfCentralDirectory {
        disk_number: 0,
        cd_start_disk: 0,
        entries_this_disk: entries.len() as u16,
        total_entries: entries.len() as u16,
        cd_size,
        cd_offset,
        comment_length: 0,
    };
    append_binwrite(&mut out, &eocd)?;

    Ok(out)
}

fn append_binwrite<T: BinWrite<Args<'static> = ()>>(out: &mut Vec<u8>, value: &T) -> ZipResult<()> {
    let mut buf = Vec::new();
    value.write(&mut binrw::io::Cursor::new(&mut buf))?;
    out.extend_from_slice(&buf);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::zip::header::FLAG_UTF8_NAME;

    #[test]
    fn empty_archive_has_only_eocd() {
        let bytes = write_archive(&[]).expect("write");
        assert_eq!(bytes.len(), 22);
    }

    #[test]
    fn single_entry_archive_parses_back() {
        let data = b"hello".to_vec();
        let entry = WriteEntry {
            path: "a.txt".to_string(),
            compression_method: CompressionMethod::Stored,
            flags: FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc32fast::hash(&data),
            uncompressed_size: data.len() as u32,
            raw_data: data,
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        };
        let bytes = write_archive(&[entry]).expect("write");
        let src = crate::byte_source::MemorySource::new(bytes);
        let parsed = crate::zip::parser::parse_archive(&src).expect("parse");
        assert_eq!(parsed.len(), 1);
    }
}
