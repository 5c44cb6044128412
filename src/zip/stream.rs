//! Forward-only ZIP demultiplexer.
//!
//! Entries are found by their Local File Header signature and end where the
//! next framing signature begins. The declared sizes are never used for
//! framing: with general purpose bit 3 set they are zero until the data
//! descriptor that follows the payload.
//!
//! Bytes pulled from the source but not yet handed out live in the carry
//! buffer, which always sits logically ahead of the source's position.
//!
//! ## Known limitation
//!
//! Payload bytes that happen to spell a signature are taken as a boundary.
//! Nothing in a streamed archive can tell the two apart.

use std::fmt;
use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use log::{debug, trace, warn};

use crate::error::{Result, ZipStreamError};
use crate::io::{CarrySource, read_full};

use super::parser::parse_local_header;
use super::scan::{DESCRIPTOR_SCAN_WINDOW, Scan, find_entry_boundary, scan};
use super::structures::{CompressionMethod, LocalFileHeader, SIGNATURE_LEN, Signature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    StreamingEntry,
    /// The central directory was reached.
    Exhausted,
    /// An error was returned; the stream position is unknown.
    Failed,
}

/// Raw bytes of the current entry, ending at the next framing signature.
///
/// This is the byte source handed to callers for stored entries and wrapped
/// by the deflate decoder for compressed ones.
pub(crate) struct EntryReader<R: Read> {
    inner: R,
    carry: Vec<u8>,
    scratch: Vec<u8>,
    /// Bytes at the front of `carry` that are known to be payload.
    ready: usize,
    /// The end of the current entry has been located in `carry`.
    at_boundary: bool,
    /// A read failed; the position in the source is no longer known.
    failed: bool,
}

impl<R: Read> EntryReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            carry: Vec::new(),
            scratch: Vec::new(),
            ready: 0,
            at_boundary: false,
            failed: false,
        }
    }

    fn is_finished(&self) -> bool {
        self.at_boundary && self.ready == 0
    }

    /// Read the next signature and, for a Local File Header, the header
    /// itself. `None` means the central directory starts here.
    fn next_header(&mut self) -> Result<Option<LocalFileHeader>> {
        let mut src = CarrySource::new(&self.carry, &mut self.inner);

        let mut sig = [0u8; SIGNATURE_LEN];
        let got = read_full(&mut src, &mut sig)?;
        if got != SIGNATURE_LEN {
            return Err(ZipStreamError::Truncated {
                what: "signature",
                expected: SIGNATURE_LEN,
                got,
            });
        }

        let value = LittleEndian::read_u32(&sig);
        match Signature::from_u32(value) {
            Some(Signature::CentralDirectory) => Ok(None),
            Some(Signature::LocalFileHeader) => {
                let parsed = parse_local_header(&mut src)?;

                // The source drains the carry first, so it supplied the
                // leading part of what was consumed.
                let consumed = SIGNATURE_LEN + parsed.consumed;
                let from_carry = consumed.min(self.carry.len());
                self.carry.drain(..from_carry);

                self.ready = 0;
                self.at_boundary = false;
                Ok(Some(parsed.header))
            }
            _ => Err(ZipStreamError::UnrecognizedSignature(value)),
        }
    }

    /// Pull up to `room` fresh bytes behind the carry and rescan it.
    fn pull(&mut self, room: usize) -> io::Result<()> {
        let held = self.carry.len();
        self.scratch.resize(held + room, 0);
        let n = CarrySource::new(&self.carry, &mut self.inner).read(&mut self.scratch)?;
        std::mem::swap(&mut self.carry, &mut self.scratch);
        self.carry.truncate(n);
        // The source had room behind the carry, so nothing new means it is
        // exhausted.
        let fresh = n - held;

        match scan(&self.carry) {
            Scan::Boundary { offset, signature } => {
                trace!("{signature:?} signature after {offset} payload bytes");
                if signature == Signature::DataDescriptor {
                    self.skip_descriptor(offset)?;
                }
                self.ready = offset;
                self.at_boundary = true;
            }
            Scan::Clear { safe } if fresh > 0 => self.ready = safe,
            Scan::Clear { .. } => {
                warn!(
                    "source ended inside an entry, releasing {} held bytes",
                    self.carry.len()
                );
                self.ready = self.carry.len();
                self.at_boundary = true;
            }
        }
        Ok(())
    }

    /// Append one read from the source to the carry.
    fn read_more(&mut self, room: usize) -> io::Result<usize> {
        let start = self.carry.len();
        self.carry.resize(start + room, 0);
        let result = loop {
            match self.inner.read(&mut self.carry[start..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let n = *result.as_ref().unwrap_or(&0);
        self.carry.truncate(start + n);
        result
    }

    /// Drop the data descriptor starting at `offset`, leaving the carry at
    /// the following entry boundary.
    fn skip_descriptor(&mut self, offset: usize) -> io::Result<()> {
        let window_end = offset + DESCRIPTOR_SCAN_WINDOW;
        while self.carry.len() < window_end {
            if self.read_more(window_end - self.carry.len())? == 0 {
                break;
            }
        }

        let search_from = offset + SIGNATURE_LEN;
        let search_end = self.carry.len().min(window_end);
        match find_entry_boundary(&self.carry[search_from..search_end]) {
            Some(rel) => {
                let next = search_from + rel;
                trace!("skipped {}-byte data descriptor", next - offset);
                self.carry.drain(offset..next);
                Ok(())
            }
            None => Err(ZipStreamError::MissingBoundary(DESCRIPTOR_SCAN_WINDOW).into()),
        }
    }
}

impl<R: Read> Read for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.ready > 0 {
                let n = self.ready.min(buf.len());
                buf[..n].copy_from_slice(&self.carry[..n]);
                self.carry.drain(..n);
                self.ready -= n;
                return Ok(n);
            }
            if self.at_boundary {
                return Ok(0);
            }
            if self.failed {
                return Err(ZipStreamError::Poisoned.into());
            }
            if let Err(e) = self.pull(buf.len()) {
                if e.kind() != io::ErrorKind::Interrupted {
                    self.failed = true;
                }
                return Err(e);
            }
        }
    }
}

/// Sequential reader over the entries of a streamed ZIP archive.
///
/// ```no_run
/// use std::io::Read;
/// use zipstream::ZipStream;
///
/// fn main() -> zipstream::Result<()> {
///     let mut archive = ZipStream::new(std::io::stdin().lock());
///     while let Some(mut entry) = archive.next_entry()? {
///         let mut data = Vec::new();
///         entry.read_to_end(&mut data)?;
///         println!("{}: {} bytes", entry.header().file_name, data.len());
///     }
///     Ok(())
/// }
/// ```
///
/// One `ZipStream` owns its source for the whole archive. After any error
/// the stream position is unknown and every later call fails with
/// [`ZipStreamError::Poisoned`].
pub struct ZipStream<R: Read> {
    reader: EntryReader<R>,
    state: State,
}

impl<R: Read> ZipStream<R> {
    /// Create a cursor positioned before the first entry of `inner`.
    ///
    /// Nothing is read until [`next_entry`](Self::next_entry) is called.
    pub fn new(inner: R) -> Self {
        Self {
            reader: EntryReader::new(inner),
            state: State::AwaitingHeader,
        }
    }

    /// Advance to the next entry.
    ///
    /// Unread payload of the previous entry is skipped. Returns `Ok(None)`
    /// once the central directory is reached.
    pub fn next_entry(&mut self) -> Result<Option<ZipEntry<'_, R>>> {
        let header = match self.advance() {
            Ok(Some(header)) => header,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };

        let payload = match header.compression_method {
            CompressionMethod::Stored => Payload::Stored(&mut self.reader),
            CompressionMethod::Deflate => Payload::Deflate(DeflateDecoder::new(&mut self.reader)),
            CompressionMethod::Unknown(method) => {
                self.state = State::Failed;
                return Err(ZipStreamError::UnsupportedCompression(method));
            }
        };

        Ok(Some(ZipEntry { header, payload }))
    }

    /// Whether the central directory has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    fn advance(&mut self) -> Result<Option<LocalFileHeader>> {
        match self.state {
            State::Exhausted => return Ok(None),
            State::Failed => return Err(ZipStreamError::Poisoned),
            _ if self.reader.failed => return Err(ZipStreamError::Poisoned),
            State::StreamingEntry => {
                if !self.reader.is_finished() {
                    let skipped = io::copy(&mut self.reader, &mut io::sink())?;
                    debug!("skipped {skipped} unread bytes of previous entry");
                }
                self.state = State::AwaitingHeader;
            }
            State::AwaitingHeader => {}
        }

        match self.reader.next_header()? {
            Some(header) => {
                debug!(
                    "entry {:?}: method {}, flags {:#06x}, {} bytes declared",
                    header.file_name,
                    header.compression_method.as_u16(),
                    header.flags,
                    header.uncompressed_size
                );
                self.state = State::StreamingEntry;
                Ok(Some(header))
            }
            None => {
                debug!("central directory reached, end of archive");
                self.state = State::Exhausted;
                Ok(None)
            }
        }
    }
}

enum Payload<'a, R: Read> {
    Stored(&'a mut EntryReader<R>),
    Deflate(DeflateDecoder<&'a mut EntryReader<R>>),
}

/// One archive entry: its header and a reader over its (decompressed) payload.
///
/// Reading returns `Ok(0)` once the entry's payload is exhausted. Errors
/// raised by the archive framing come back as [`io::ErrorKind::InvalidData`]
/// and convert back into [`ZipStreamError`] with `From`.
pub struct ZipEntry<'a, R: Read> {
    header: LocalFileHeader,
    payload: Payload<'a, R>,
}

impl<R: Read> ZipEntry<'_, R> {
    /// The Local File Header this entry was parsed from.
    pub fn header(&self) -> &LocalFileHeader {
        &self.header
    }
}

impl<R: Read> Read for ZipEntry<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.payload {
            Payload::Stored(reader) => reader.read(buf),
            Payload::Deflate(decoder) => decoder.read(buf),
        }
    }
}

impl<R: Read> fmt::Debug for ZipEntry<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipEntry")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_at_entry(payload_and_rest: &[u8]) -> EntryReader<Cursor<Vec<u8>>> {
        EntryReader::new(Cursor::new(payload_and_rest.to_vec()))
    }

    #[test]
    fn test_holds_back_signature_width() {
        let mut reader = reader_at_entry(b"abcdefPK\x01\x02");
        let mut buf = [0u8; 6];
        // six bytes pulled, the last four may start a signature
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(reader.carry, b"cdef");
        assert!(!reader.is_finished());
    }

    #[test]
    fn test_boundary_leaves_signature_in_carry() {
        let mut reader = reader_at_entry(b"abcdefPK\x03\x04next");
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
        assert!(reader.is_finished());
        assert!(reader.carry.starts_with(b"PK\x03\x04"));
    }

    #[test]
    fn test_descriptor_is_dropped() {
        let mut data = b"payload".to_vec();
        data.extend_from_slice(b"PK\x07\x08");
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(b"PK\x01\x02tail");
        let mut reader = reader_at_entry(&data);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
        assert_eq!(reader.carry, b"PK\x01\x02tail");
    }

    #[test]
    fn test_descriptor_without_boundary() {
        let mut data = b"payload".to_vec();
        data.extend_from_slice(b"PK\x07\x08");
        data.extend_from_slice(&[0u8; 60]);
        let mut reader = reader_at_entry(&data);

        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            ZipStreamError::from(err),
            ZipStreamError::MissingBoundary(DESCRIPTOR_SCAN_WINDOW)
        ));
    }

    /// Payload followed by a data descriptor of `descriptor_len` bytes
    /// (signature included) and then `next`.
    fn with_descriptor(descriptor_len: usize, next: &[u8]) -> Vec<u8> {
        let mut data = b"payload".to_vec();
        data.extend_from_slice(b"PK\x07\x08");
        data.resize(data.len() + descriptor_len - SIGNATURE_LEN, 0);
        data.extend_from_slice(next);
        data
    }

    #[test]
    fn test_descriptor_boundary_at_window_edge() {
        // next signature ends exactly at the last byte of the window
        let mut reader = reader_at_entry(&with_descriptor(36, b"PK\x03\x04rest"));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
        assert_eq!(reader.carry, b"PK\x03\x04rest");

        // one byte further and it no longer fits
        let mut reader = reader_at_entry(&with_descriptor(37, b"PK\x03\x04rest"));
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert!(matches!(
            ZipStreamError::from(err),
            ZipStreamError::MissingBoundary(DESCRIPTOR_SCAN_WINDOW)
        ));
    }

    #[test]
    fn test_zip64_descriptor_is_dropped() {
        // signature, crc32 and two 8-byte sizes
        let mut data = b"payload".to_vec();
        data.extend_from_slice(b"PK\x07\x08");
        data.extend_from_slice(&0x1234_5678u32.to_le_bytes());
        data.extend_from_slice(&7u64.to_le_bytes());
        data.extend_from_slice(&7u64.to_le_bytes());
        data.extend_from_slice(b"PK\x01\x02tail");
        let mut reader = reader_at_entry(&data);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
        assert_eq!(reader.carry, b"PK\x01\x02tail");
    }

    /// Counts reads issued after the source first reported end of stream.
    struct EofCounter {
        data: Cursor<Vec<u8>>,
        at_eof: bool,
        reads_after_eof: usize,
    }

    impl Read for EofCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.at_eof {
                self.reads_after_eof += 1;
            }
            let n = self.data.read(buf)?;
            self.at_eof |= n == 0;
            Ok(n)
        }
    }

    #[test]
    fn test_no_read_after_source_end() {
        let mut reader = EntryReader::new(EofCounter {
            data: Cursor::new(b"no boundary here".to_vec()),
            at_eof: false,
            reads_after_eof: 0,
        });
        let mut buf = [0u8; 5];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"no boundary here");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.inner.reads_after_eof, 0);
    }

    /// Fails once with `kind` on its second read, then behaves.
    struct FailsOnce {
        data: Cursor<Vec<u8>>,
        reads: usize,
        kind: io::ErrorKind,
    }

    impl Read for FailsOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.reads == 2 {
                return Err(self.kind.into());
            }
            self.data.read(buf)
        }
    }

    fn fails_once(kind: io::ErrorKind) -> EntryReader<FailsOnce> {
        EntryReader::new(FailsOnce {
            data: Cursor::new(b"abcdefghijklPK\x01\x02".to_vec()),
            reads: 0,
            kind,
        })
    }

    #[test]
    fn test_read_error_poisons_reader() {
        let mut reader = fails_once(io::ErrorKind::TimedOut);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        // the source would deliver again, but the position is lost
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(ZipStreamError::from(err), ZipStreamError::Poisoned));
        assert_eq!(reader.inner.reads, 2);
    }

    #[test]
    fn test_interrupted_read_is_retryable() {
        let mut reader = fails_once(io::ErrorKind::Interrupted);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);

        let mut out = buf[..4].to_vec();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefghijkl");
        assert!(reader.is_finished());
    }

    #[test]
    fn test_source_end_releases_held_bytes() {
        let mut reader = reader_at_entry(b"no boundary here");
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"no boundary here");
        assert!(reader.is_finished());
        assert!(reader.carry.is_empty());
    }
}
