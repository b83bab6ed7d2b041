//! Binary layouts for ZIP records, per PKWARE APPNOTE. All multi-byte fields
//! are little-endian.

use binrw::{BinRead, BinWrite};

/// Local file header signature, `PK\003\004`.
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// Central directory file header signature, `PK\001\002`.
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
/// End-of-central-directory record signature, `PK\005\006`.
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
/// Optional data descriptor signature, `PK\007\010`.
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Bit 3 of the general-purpose flag field: sizes and CRC-32 are deferred to
/// a trailing data descriptor rather than stored in the local header.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// Bit 11 of the general-purpose flag field: the name and comment are UTF-8
/// rather than IBM-437.
pub const FLAG_UTF8_NAME: u16 = 1 << 11;

/// Compression method: no compression.
pub const METHOD_STORED: u16 = 0;
/// Compression method: DEFLATE.
pub const METHOD_DEFLATE: u16 = 8;

/// Maximum length of an EOCD comment field (16-bit length), bounding the
/// trailing window that must be searched for the EOCD signature.
pub const MAX_EOCD_SEARCH_WINDOW: u64 = 22 + 65535;

/// End-of-central-directory record, fixed 22-byte portion (comment excluded;
/// read separately since its length is self-describing but the field is not
/// a fixed-size array).
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = 0x0605_4b50u32)]
#[bw(little, magic = 0x0605_4b50u32)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk on which the central directory starts.
    pub cd_start_disk: u16,
    /// Number of central directory entries on this disk.
    pub entries_this_disk: u16,
    /// Total number of central directory entries.
    pub total_entries: u16,
    /// Size in bytes of the central directory.
    pub cd_size: u32,
    /// Offset of the central directory from the start of the archive.
    pub cd_offset: u32,
    /// Length of the trailing comment.
    pub comment_length: u16,
}

/// Central directory file header, fixed 46-byte portion (name, extra field,
/// and comment follow and are read with `count` driven by the length fields).
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = 0x0201_4b50u32)]
#[bw(little, magic = 0x0201_4b50u32)]
pub struct CentralDirectoryRecord {
    /// Version of the tool that made the archive.
    pub version_made_by: u16,
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General-purpose bit flags.
    pub flags: u16,
    /// Compression method (0 = stored, 8 = deflate).
    pub compression_method: u16,
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
    /// Length in bytes of the file name field.
    pub file_name_length: u16,
    /// Length in bytes of the extra field.
    pub extra_field_length: u16,
    /// Length in bytes of the file comment field.
    pub file_comment_length: u16,
    /// Disk number on which this entry's local header starts.
    pub disk_number_start: u16,
    /// Internal file attributes.
    pub internal_attributes: u16,
    /// External file attributes.
    pub external_attributes: u32,
    /// Offset of the local file header from the start of its disk.
    pub local_header_offset: u32,
    /// File name bytes (UTF-8 or IBM-437 per [`super::header::FLAG_UTF8_NAME`]).
    #[br(count = file_name_length)]
    pub file_name: Vec<u8>,
    /// Extra field bytes.
    #[br(count = extra_field_length)]
    pub extra_field: Vec<u8>,
    /// File comment bytes.
    #[br(count = file_comment_length)]
    pub file_comment: Vec<u8>,
}

/// Local file header, fixed 30-byte portion (name and extra field follow).
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = 0x0403_4b50u32)]
#[bw(little, magic = 0x0403_4b50u32)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General-purpose bit flags.
    pub flags: u16,
    /// Compression method (0 = stored, 8 = deflate).
    pub compression_method: u16,
    /// MS-DOS packed last-modified time.
    pub last_mod_time: u16,
    /// MS-DOS packed last-modified date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data (zero when the data-descriptor flag is set).
    pub crc32: u32,
    /// Size of the compressed data (zero when the data-descriptor flag is set).
    pub compressed_size: u32,
    /// Size of the uncompressed data (zero when the data-descriptor flag is set).
    pub uncompressed_size: u32,
    /// Length in bytes of the file name field.
    pub file_name_length: u16,
    /// Length in bytes of the extra field.
    pub extra_field_length: u16,
    /// File name bytes.
    #[br(count = file_name_length)]
    pub file_name: Vec<u8>,
    /// Extra field bytes.
    #[br(count = extra_field_length)]
    pub extra_field: Vec<u8>,
}

/// Optional trailing data descriptor, used when
/// [`FLAG_DATA_DESCRIPTOR`] is set in the local header's flags. The leading
/// signature is optional per APPNOTE; callers should attempt to read it and
/// fall back to treating the first four bytes as `crc32` if the signature
/// does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
pub struct DataDescriptor {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the compressed data.
    pub compressed_size: u32,
    /// Size of the uncompressed data.
    pub uncompressed_size: u32,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    #[test]
    fn eocd_round_trips() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            cd_start_disk: 0,
            entries_this_disk: 3,
            total_entries: 3,
            cd_size: 200,
            cd_offset: 1000,
            comment_length: 0,
        };
        let mut buf = Vec::new();
        eocd.write(&mut Cursor::new(&mut buf)).expect("write");
        assert_eq!(buf.len(), 22);
        let parsed = EndOfCentralDirectory::read(&mut Cursor::new(&buf)).expect("read");
        assert_eq!(parsed, eocd);
    }

    #[test]
    fn central_directory_record_round_trips() {
        let record = CentralDirectoryRecord {
            version_made_by: 20,
            version_needed: 20,
            flags: FLAG_UTF8_NAME,
            compression_method: METHOD_DEFLATE,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 0xDEAD_BEEF,
            compressed_size: 50,
            uncompressed_size: 100,
            file_name_length: 5,
            extra_field_length: 0,
            file_comment_length: 0,
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes: 0,
            local_header_offset: 0,
            file_name: b"a.txt".to_vec(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
        };
        let mut buf = Vec::new();
        record.write(&mut Cursor::new(&mut buf)).expect("write");
        let parsed = CentralDirectoryRecord::read(&mut Cursor::new(&buf)).expect("read");
        assert_eq!(parsed, record);
    }

    #[test]
    fn local_file_header_round_trips() {
        let header = LocalFileHeader {
            version_needed: 20,
            flags: 0,
            compression_method: METHOD_STORED,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32: 1,
            compressed_size: 4,
            uncompressed_size: 4,
            file_name_length: 4,
            extra_field_length: 0,
            file_name: b"b.in".to_vec(),
            extra_field: Vec::new(),
        };
        let mut buf = Vec::new();
        header.write(&mut Cursor::new(&mut buf)).expect("write");
        let parsed = LocalFileHeader::read(&mut Cursor::new(&buf)).expect("read");
        assert_eq!(parsed, header);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let garbage = [0u8; 30];
        assert!(LocalFileHeader::read(&mut Cursor::new(&garbage)).is_err());
    }
}
