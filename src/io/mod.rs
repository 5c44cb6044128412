mod carry;

pub use carry::CarrySource;

use std::io::{self, Read};

/// Fill `buf` from `reader`, tolerating short reads.
///
/// Unlike [`Read::read_exact`] this reports how many bytes arrived when the
/// source runs dry, so the caller can tell a truncated archive apart from an
/// upstream failure.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct OneByte(Cursor<Vec<u8>>);

    impl Read for OneByte {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(1);
            self.0.read(&mut buf[..n])
        }
    }

    #[test]
    fn test_read_full_across_short_reads() {
        let mut reader = OneByte(Cursor::new(b"PK\x03\x04".to_vec()));
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"PK\x03\x04");
    }

    #[test]
    fn test_read_full_reports_short_count() {
        let mut reader = Cursor::new(vec![1, 2]);
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
    }
}
