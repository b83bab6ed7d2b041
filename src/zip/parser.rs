//! Locates the EOCD, walks the central directory, and reconciles each entry
//! against its local header to build an [`ArchiveIndex`].

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use tracing::{debug, instrument};

use super::entry::{ArchiveIndex, CompressionMethod, LocalSectionRanges, ZipEntry};
use super::error::{ZipError, ZipResult};
use super::header::{
    CentralDirectoryRecord, DataDescriptor, EndOfCentralDirectory, LocalFileHeader,
    CENTRAL_DIRECTORY_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE, EOCD_SIGNATURE, FLAG_DATA_DESCRIPTOR,
    FLAG_UTF8_NAME, MAX_EOCD_SEARCH_WINDOW,
};
use crate::byte_source::ByteSource;

/// Scans backward from the end of `source` for the EOCD signature, returning
/// its byte offset. Considers up to [`MAX_EOCD_SEARCH_WINDOW`] trailing bytes
/// to admit a maximum-length comment.
#[instrument(skip(source))]
fn find_eocd_offset(source: &dyn ByteSource) -> ZipResult<u64> {
    let len = source.length();
    let window = MAX_EOCD_SEARCH_WINDOW.min(len);
    let start = len - window;

    let mut buf = vec![0u8; window as usize];
    let mut reader = source
        .slice(start, window)
        .map_err(|e| ZipError::Truncated {
            offset: start,
            reason: e.to_string(),
        })?
        .open_stream()?;
    reader.read_exact(&mut buf)?;

    let sig_bytes = EOCD_SIGNATURE.to_le_bytes();
    for idx in (0..=buf.len().saturating_sub(4)).rev() {
        if buf[idx..idx + 4] == sig_bytes {
            debug!(offset = start + idx as u64, "found EOCD signature");
            return Ok(start + idx as u64);
        }
    }
    Err(ZipError::EocdNotFound)
}

/// Parses a ZIP archive from a [`ByteSource`], returning its [`ArchiveIndex`].
///
/// # Errors
///
/// Returns [`ZipError::EocdNotFound`] if no EOCD signature is found,
/// [`ZipError::BadSignature`] if a central-directory or local-header record
/// is malformed, and [`ZipError::EntryCountMismatch`] if the EOCD's declared
/// entry count disagrees with the number of records actually read.
#[instrument(skip(source))]
pub fn parse_archive(source: &dyn ByteSource) -> ZipResult<ArchiveIndex> {
    let eocd_offset = find_eocd_offset(source)?;
    let mut reader = source.open_stream()?;
    reader.seek(SeekFrom::Start(eocd_offset))?;
    let eocd = EndOfCentralDirectory::read(&mut reader)?;

    debug!(
        total_entries = eocd.total_entries,
        cd_offset = eocd.cd_offset,
        cd_size = eocd.cd_size,
        "parsed EOCD"
    );

    reader.seek(SeekFrom::Start(u64::from(eocd.cd_offset)))?;
    let mut entries = Vec::with_capacity(eocd.total_entries as usize);

    for _ in 0..eocd.total_entries {
        let record = CentralDirectoryRecord::read(&mut reader)?;
        let entry = reconcile_entry(source, &record)?;
        entries.push(entry);
    }

    if entries.len() as u16 != eocd.total_entries {
        return Err(ZipError::EntryCountMismatch {
            declared: eocd.total_entries,
            actual: entries.len() as u16,
        });
    }

    Ok(ArchiveIndex::new(entries))
}

/// Reads the local header for one central-directory record and reconciles
/// sizes/CRC between the two, honoring the data-descriptor flag.
fn reconcile_entry(source: &dyn ByteSource, record: &CentralDirectoryRecord) -> ZipResult<ZipEntry> {
    let local_offset = u64::from(record.local_header_offset);
    let mut local_reader = source.open_stream()?;
    local_reader.seek(SeekFrom::Start(local_offset))?;
    let local = LocalFileHeader::read(&mut local_reader)?;

    let local_header_len = 30 + u64::from(local.file_name_length) + u64::from(local.extra_field_length);
    let raw_data_offset = local_offset + local_header_len;

    let (raw_data_len, data_descriptor_range) = if record.flags & FLAG_DATA_DESCRIPTOR != 0 {
        let declared_len = u64::from(record.compressed_size);
        let dd_offset = raw_data_offset + declared_len;
        let dd_len = peek_data_descriptor_length(source, dd_offset)?;
        (declared_len, Some((dd_offset, dd_len)))
    } else {
        (u64::from(record.compressed_size), None)
    };

    let path = decode_name(&record.file_name, record.flags & FLAG_UTF8_NAME != 0);

    Ok(ZipEntry {
        path,
        raw_path: record.file_name.clone(),
        compression_method: CompressionMethod::from_code(record.compression_method),
        flags: record.flags,
        last_mod_time: record.last_mod_time,
        last_mod_date: record.last_mod_date,
        crc32: record.crc32,
        compressed_size: record.compressed_size,
        uncompressed_size: record.uncompressed_size,
        extra_field: record.extra_field.clone(),
        file_comment: record.file_comment.clone(),
        disk_number_start: record.disk_number_start,
        internal_attributes: record.internal_attributes,
        external_attributes: record.external_attributes,
        version_made_by: record.version_made_by,
        version_needed: record.version_needed,
        local_header_offset: local_offset,
        local_section: LocalSectionRanges {
            local_header: (local_offset, local_header_len),
            raw_data: (raw_data_offset, raw_data_len),
            data_descriptor: data_descriptor_range,
        },
    })
}

/// Data descriptors are 12 bytes without the optional signature or 16 bytes
/// with it; peek the first four bytes to decide which.
fn peek_data_descriptor_length(source: &dyn ByteSource, offset: u64) -> ZipResult<u64> {
    let mut reader = source.open_stream()?;
    reader.seek(SeekFrom::Start(offset))?;
    let mut sig = [0u8; 4];
    reader.read_exact(&mut sig)?;
    if u32::from_le_bytes(sig) == DATA_DESCRIPTOR_SIGNATURE {
        Ok(4 + std::mem::size_of::<DataDescriptor>() as u64)
    } else {
        Ok(std::mem::size_of::<DataDescriptor>() as u64)
    }
}

fn decode_name(raw: &[u8], is_utf8: bool) -> String {
    if is_utf8 {
        String::from_utf8_lossy(raw).into_owned()
    } else {
        // IBM-437 codepage: for the ASCII-compatible range this is identical
        // to Latin-1; bytes above 0x7F are approximated rather than mapped
        // through the full code page table, which is out of scope here.
        raw.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::byte_source::MemorySource;
    use crate::zip::writer::{write_archive, WriteEntry};

    fn archive_with_one_stored_entry(name: &str, data: &[u8]) -> Vec<u8> {
        let crc = crc32fast::hash(data);
        let entry = WriteEntry {
            path: name.to_string(),
            compression_method: CompressionMethod::Stored,
            flags: FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc,
            uncompressed_size: data.len() as u32,
            raw_data: data.to_vec(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        };
        write_archive(&[entry]).expect("write archive")
    }

    #[test]
    fn finds_eocd_with_no_comment() {
        let bytes = archive_with_one_stored_entry("a.txt", b"hello");
        let src = MemorySource::new(bytes);
        let offset = find_eocd_offset(&src).expect("eocd found");
        assert!(offset < src.length());
    }

    #[test]
    fn parses_single_entry_archive() {
        let bytes = archive_with_one_stored_entry("a.txt", b"hello world");
        let src = MemorySource::new(bytes);
        let index = parse_archive(&src).expect("parse archive");
        assert_eq!(index.len(), 1);
        let entry = index.get("a.txt").expect("entry present");
        assert_eq!(entry.uncompressed_size, 11);
        assert_eq!(entry.compression_method, CompressionMethod::Stored);
    }

    #[test]
    fn rejects_truncated_archive() {
        let bytes = vec![0u8; 10];
        let src = MemorySource::new(bytes);
        assert!(parse_archive(&src).is_err());
    }

    #[test]
    fn entry_order_matches_central_directory() {
        let e1 = WriteEntry {
            path: "b.txt".to_string(),
            compression_method: CompressionMethod::Stored,
            flags: FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc32fast::hash(b"second"),
            uncompressed_size: 6,
            raw_data: b"second".to_vec(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        };
        let e2 = WriteEntry {
            path: "a.txt".to_string(),
            compression_method: CompressionMethod::Stored,
            flags: FLAG_UTF8_NAME,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: crc32fast::hash(b"first!"),
            uncompressed_size: 6,
            raw_data: b"first!".to_vec(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
            external_attributes: 0,
            version_made_by: 20,
            version_needed: 20,
        };
        let bytes = write_archive(&[e1, e2]).expect("write archive");
        let src = MemorySource::new(bytes);
        let index = parse_archive(&src).expect("parse archive");
        assert_eq!(index.entries[0].path, "b.txt");
        assert_eq!(index.entries[1].path, "a.txt");
    }
}
