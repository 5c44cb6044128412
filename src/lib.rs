//! # zipstream
//!
//! Extract entries from a ZIP archive that arrives as a forward-only byte
//! stream, such as an HTTP response body or a pipe.
//!
//! The central directory at the end of an archive needs random access, so
//! this crate never reads it. Entries are found by scanning for the 4-byte
//! framing signatures as bytes arrive, including signatures that straddle
//! two reads of the underlying source.
//!
//! ## Features
//!
//! - Any [`std::io::Read`] as the source; no seeking
//! - STORED and DEFLATE entries, decompressed through `flate2`
//! - Entries written with a trailing data descriptor (general purpose bit 3)
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use zipstream::ZipStream;
//!
//! fn main() -> anyhow::Result<()> {
//!     let file = std::fs::File::open("archive.zip")?;
//!     let mut archive = ZipStream::new(file);
//!
//!     while let Some(mut entry) = archive.next_entry()? {
//!         if entry.header().is_directory {
//!             continue;
//!         }
//!         let mut contents = Vec::new();
//!         entry.read_to_end(&mut contents)?;
//!         println!("{}: {} bytes", entry.header().file_name, contents.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod io;
pub mod zip;

pub use error::{ErrorCategory, Result, ZipStreamError};
pub use io::CarrySource;
pub use zip::{CompressionMethod, LocalFileHeader, Signature, ZipEntry, ZipStream};
