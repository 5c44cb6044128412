use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Width of every framing signature.
pub const SIGNATURE_LEN: usize = 4;

/// Local File Header without its signature - 26 bytes
pub const LFH_PREAMBLE_SIZE: usize = 26;

/// General purpose flag bit 3: CRC and sizes follow the payload in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// General purpose flag bit 11: file name is UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// The framing markers recognised in a streamed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// `PK\x03\x04`
    LocalFileHeader,
    /// `PK\x01\x02`
    CentralDirectory,
    /// `PK\x07\x08`
    DataDescriptor,
}

impl Signature {
    pub const LOCAL_FILE_HEADER: u32 = 0x04034b50;
    pub const CENTRAL_DIRECTORY: u32 = 0x02014b50;
    pub const DATA_DESCRIPTOR: u32 = 0x08074b50;

    /// Map a little-endian magic value to its signature.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            Self::LOCAL_FILE_HEADER => Some(Signature::LocalFileHeader),
            Self::CENTRAL_DIRECTORY => Some(Signature::CentralDirectory),
            Self::DATA_DESCRIPTOR => Some(Signature::DataDescriptor),
            _ => None,
        }
    }

    /// Decode the first [`SIGNATURE_LEN`] bytes of `window`.
    ///
    /// # Returns
    ///
    /// The signature, or `None` if the window is shorter than four bytes or
    /// holds no known marker.
    pub fn from_window(window: &[u8]) -> Option<Self> {
        window
            .get(..SIGNATURE_LEN)
            .map(LittleEndian::read_u32)
            .and_then(Self::from_u32)
    }

    /// The magic value as read from the stream.
    pub fn as_u32(&self) -> u32 {
        match self {
            Signature::LocalFileHeader => Self::LOCAL_FILE_HEADER,
            Signature::CentralDirectory => Self::CENTRAL_DIRECTORY,
            Signature::DataDescriptor => Self::DATA_DESCRIPTOR,
        }
    }

    /// The four bytes as they appear on the wire.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.as_u32().to_le_bytes()
    }

    /// Whether this marker can start the element that follows a data descriptor.
    pub fn is_entry_boundary(&self) -> bool {
        matches!(
            self,
            Signature::LocalFileHeader | Signature::CentralDirectory
        )
    }
}

/// Fixed-width fields of a Local File Header, as they appear after the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Preamble {
    pub version: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl Preamble {
    pub fn from_bytes(data: &[u8; LFH_PREAMBLE_SIZE]) -> std::io::Result<Self> {
        let mut cursor = Cursor::new(&data[..]);

        Ok(Self {
            version: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// Parsed Local File Header of one archive entry.
///
/// `crc32`, `compressed_size` and `uncompressed_size` are only meaningful when
/// [`has_data_descriptor`](Self::has_data_descriptor) is false; streaming
/// writers leave them zeroed and append a data descriptor instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_name: String,
    pub extra_field: Vec<u8>,
    pub is_directory: bool,
}

impl LocalFileHeader {
    pub(crate) fn new(preamble: Preamble, file_name: String, extra_field: Vec<u8>) -> Self {
        // Directory entries end with '/'
        let is_directory = file_name.ends_with('/');

        Self {
            version: preamble.version,
            flags: preamble.flags,
            compression_method: CompressionMethod::from_u16(preamble.compression_method),
            last_mod_time: preamble.last_mod_time,
            last_mod_date: preamble.last_mod_date,
            crc32: preamble.crc32,
            compressed_size: preamble.compressed_size,
            uncompressed_size: preamble.uncompressed_size,
            file_name_length: preamble.file_name_length,
            extra_field_length: preamble.extra_field_length,
            file_name,
            extra_field,
            is_directory,
        }
    }

    /// Whether a data descriptor follows the payload (flag bit 3).
    ///
    /// When set, `crc32` and both sizes in this header are placeholders.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Whether the file name is flagged as UTF-8 (flag bit 11).
    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
