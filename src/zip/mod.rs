//! Streaming ZIP parsing.
//!
//! ## Architecture
//!
//! - [`structures`]: signatures and the Local File Header
//! - [`parser`]: Local File Header parsing from any [`Read`](std::io::Read)
//! - [`scan`]: signature scanning over raw entry bytes
//! - [`stream`]: the entry engine and the [`ZipStream`] cursor
//!
//! ## ZIP Format Overview
//!
//! ```text
//! [LFH][payload]([data descriptor])  ...  [central directory][EOCD]
//! ```
//!
//! The central directory sits at the end and needs random access, so it is
//! only used here as the end-of-archive marker. Each entry is read straight
//! from its Local File Header.
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only
//! - No ZIP64, encryption or multi-disk archives
//! - A data descriptor written without its optional signature is not
//!   recognised; its bytes stay at the end of a stored payload

mod parser;
mod scan;
mod stream;
mod structures;

pub use scan::DESCRIPTOR_SCAN_WINDOW;
pub use stream::{ZipEntry, ZipStream};
pub use structures::*;
