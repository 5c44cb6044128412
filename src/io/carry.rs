use std::io::{self, Read};

/// Read surface over "carried bytes, then the underlying stream".
///
/// Bytes in the carry were already pulled from the underlying stream, so
/// they always come out first. A single `read` copies as much of the carry
/// as fits and then issues at most one read against the underlying stream
/// for the remaining room.
pub enum CarrySource<'a, R: Read> {
    Buffered { carry: &'a [u8], inner: &'a mut R },
    Underlying(&'a mut R),
}

impl<'a, R: Read> CarrySource<'a, R> {
    /// Create a read surface over `carry` followed by `inner`.
    ///
    /// An empty carry yields [`CarrySource::Underlying`], so reads go
    /// straight to the stream.
    pub fn new(carry: &'a [u8], inner: &'a mut R) -> Self {
        if carry.is_empty() {
            CarrySource::Underlying(inner)
        } else {
            CarrySource::Buffered { carry, inner }
        }
    }
}

impl<'a, R: Read> Read for CarrySource<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CarrySource::Underlying(inner) => inner.read(buf),
            CarrySource::Buffered { carry, inner } => {
                let pending: &'a [u8] = *carry;
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                *carry = &pending[n..];
                if n == buf.len() {
                    return Ok(n);
                }

                // The carry is drained; whatever the stream hands back in one
                // read completes this pull. Exhaustion here is not an error,
                // the bytes gathered so far are still returned.
                match inner.read(&mut buf[n..]) {
                    Ok(m) => Ok(n + m),
                    Err(e) => {
                        // an error consumes nothing, so a retry sees the carry again
                        *carry = pending;
                        Err(e)
                    }
                }
            }
        }
    }
}
