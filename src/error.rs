//! Error types for streaming ZIP extraction.
//!
//! Every error is fatal for the archive being read: a malformed archive is
//! not a transient condition, so nothing here is retried.
//!
//! | Category | Variants |
//! |----------|----------|
//! | [`ErrorCategory::Format`] | [`Truncated`], [`UnrecognizedSignature`], [`MissingBoundary`] |
//! | [`ErrorCategory::Unsupported`] | [`UnsupportedCompression`] |
//! | [`ErrorCategory::InvalidState`] | [`EmptyFileName`], [`Poisoned`] |
//! | [`ErrorCategory::Upstream`] | [`Io`] |
//!
//! [`Truncated`]: ZipStreamError::Truncated
//! [`UnrecognizedSignature`]: ZipStreamError::UnrecognizedSignature
//! [`MissingBoundary`]: ZipStreamError::MissingBoundary
//! [`UnsupportedCompression`]: ZipStreamError::UnsupportedCompression
//! [`EmptyFileName`]: ZipStreamError::EmptyFileName
//! [`Poisoned`]: ZipStreamError::Poisoned
//! [`Io`]: ZipStreamError::Io

use std::io;

use thiserror::Error;

/// Coarse classification of a [`ZipStreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The archive bytes are malformed or truncated.
    Format,
    /// The archive uses a feature this crate does not implement.
    Unsupported,
    /// The cursor cannot continue in its current state.
    InvalidState,
    /// The underlying byte source failed.
    Upstream,
}

/// Errors raised while demultiplexing a ZIP stream.
#[derive(Error, Debug)]
pub enum ZipStreamError {
    /// The source ended before a fixed-width field was complete.
    #[error("truncated {what}: expected {expected} bytes, got {got}")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// An entry boundary held a signature that is neither a Local File
    /// Header nor the Central Directory.
    #[error("unrecognized signature 0x{0:08x}")]
    UnrecognizedSignature(u32),
    /// No entry boundary followed a data descriptor within the scan window.
    #[error("invalid read: data descriptor not followed by an entry boundary within {0} bytes")]
    MissingBoundary(usize),
    /// The entry uses a compression method other than STORED or DEFLATE.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),
    /// A Local File Header declared a zero-length file name.
    #[error("local file header has an empty file name")]
    EmptyFileName,
    /// An earlier call failed, so the position in the source is unknown.
    #[error("archive stream cannot be resumed after an earlier error")]
    Poisoned,
    /// The underlying byte source failed. The error is passed through as is.
    #[error(transparent)]
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, ZipStreamError>;

impl ZipStreamError {
    /// Classify the error.
    ///
    /// # Returns
    ///
    /// The [`ErrorCategory`] callers can branch on without matching every variant.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Truncated { .. } | Self::UnrecognizedSignature(_) | Self::MissingBoundary(_) => {
                ErrorCategory::Format
            }
            Self::UnsupportedCompression(_) => ErrorCategory::Unsupported,
            Self::EmptyFileName | Self::Poisoned => ErrorCategory::InvalidState,
            Self::Io(_) => ErrorCategory::Upstream,
        }
    }
}

/// Unwraps a [`ZipStreamError`] that travelled through an [`io::Error`]
/// (payload reads only speak `io::Error`); anything else is upstream.
impl From<io::Error> for ZipStreamError {
    fn from(err: io::Error) -> Self {
        if !err
            .get_ref()
            .is_some_and(|inner| inner.is::<ZipStreamError>())
        {
            return Self::Io(err);
        }

        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<ZipStreamError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::new(kind, other)),
            None => Self::Io(kind.into()),
        }
    }
}

impl From<ZipStreamError> for io::Error {
    fn from(err: ZipStreamError) -> Self {
        match err {
            ZipStreamError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
