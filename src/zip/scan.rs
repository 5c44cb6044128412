//! Signature scanning over a window of raw entry bytes.
//!
//! A window that holds no signature may still end in the first one to three
//! bytes of one, so the last [`SIGNATURE_LEN`] bytes are never declared
//! payload until more data (or the end of the stream) arrives.

use super::structures::{SIGNATURE_LEN, Signature};

/// Bytes inspected after a data descriptor signature while looking for the
/// next Local File Header or Central Directory signature. Covers the 16-byte
/// descriptor, its 24-byte ZIP64 variant and the following signature.
pub const DESCRIPTOR_SCAN_WINDOW: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// A signature starts at `offset`; everything before it is payload.
    Boundary { offset: usize, signature: Signature },
    /// No signature; the first `safe` bytes are payload.
    Clear { safe: usize },
}

pub(crate) fn scan(window: &[u8]) -> Scan {
    match find(window, |_| true) {
        Some((offset, signature)) => Scan::Boundary { offset, signature },
        None => Scan::Clear {
            safe: window.len().saturating_sub(SIGNATURE_LEN),
        },
    }
}

/// Offset of the first entry boundary (Local File Header or Central
/// Directory) in `window`.
pub(crate) fn find_entry_boundary(window: &[u8]) -> Option<usize> {
    find(window, Signature::is_entry_boundary).map(|(offset, _)| offset)
}

fn find(window: &[u8], accept: impl Fn(&Signature) -> bool) -> Option<(usize, Signature)> {
    window
        .windows(SIGNATURE_LEN)
        .enumerate()
        .find_map(|(offset, candidate)| {
            Signature::from_window(candidate)
                .filter(|signature| accept(signature))
                .map(|signature| (offset, signature))
        })
}
