//! Local File Header parser.
//!
//! Reads the 26-byte preamble that follows a `PK\x03\x04` signature, then the
//! variable-length file name and extra field. Any short read is a truncated
//! archive: a streamed ZIP has no second copy of the header to fall back on.

use std::io::Read;

use crate::error::{Result, ZipStreamError};
use crate::io::read_full;

use super::structures::{LFH_PREAMBLE_SIZE, LocalFileHeader, Preamble};

/// A header plus the number of bytes it occupied after the signature.
#[derive(Debug)]
pub(crate) struct ParsedHeader {
    pub header: LocalFileHeader,
    pub consumed: usize,
}

/// Parse one Local File Header whose signature has already been consumed.
pub(crate) fn parse_local_header<R: Read + ?Sized>(reader: &mut R) -> Result<ParsedHeader> {
    let mut raw = [0u8; LFH_PREAMBLE_SIZE];
    read_exactly(reader, &mut raw, "local file header")?;
    let preamble = Preamble::from_bytes(&raw)?;

    if preamble.file_name_length == 0 {
        return Err(ZipStreamError::EmptyFileName);
    }

    let mut file_name_bytes = vec![0u8; preamble.file_name_length as usize];
    read_exactly(reader, &mut file_name_bytes, "file name")?;
    // Use lossy conversion to handle non-UTF8 filenames gracefully
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let mut extra_field = vec![0u8; preamble.extra_field_length as usize];
    read_exactly(reader, &mut extra_field, "extra field")?;

    let consumed = LFH_PREAMBLE_SIZE + file_name_bytes.len() + extra_field.len();
    Ok(ParsedHeader {
        header: LocalFileHeader::new(preamble, file_name, extra_field),
        consumed,
    })
}

fn read_exactly<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    let got = read_full(reader, buf)?;
    if got != buf.len() {
        return Err(ZipStreamError::Truncated {
            what,
            expected: buf.len(),
            got,
        });
    }
    Ok(())
}
