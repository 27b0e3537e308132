//! # Codec Error Types
//!
//! All errors that can occur while writing, reading or converting ray streams.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The header check that rejected a stream on open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatFault {
    /// The file ended before a complete header could be read.
    TruncatedHeader {
        /// Bytes actually present.
        found: usize,
    },
    /// The magic constant did not match.
    BadMagic {
        /// The value found in the file.
        found: u32,
    },
}

impl fmt::Display for FormatFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader { found } => {
                write!(f, "truncated header ({found} of {} bytes)", crate::format::HEADER_SIZE)
            }
            Self::BadMagic { found } => write!(
                f,
                "bad magic 0x{found:08x} (expected 0x{:08x})",
                crate::format::STREAM_MAGIC
            ),
        }
    }
}

/// Errors that can occur in the ray stream codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A path could not be opened or created.
    #[error("cannot open {path:?}: {source}")]
    Configuration {
        /// The path that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The image dimensions cannot be represented by the target.
    #[error("unsupported dimensions {width}x{height}: {reason}")]
    Dimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Why they were rejected.
        reason: &'static str,
    },

    /// The stream header failed validation.
    #[error("invalid ray stream {path:?}: {fault}")]
    Format {
        /// The offending file.
        path: PathBuf,
        /// Which check failed.
        fault: FormatFault,
    },

    /// The handle was already closed.
    #[error("ray stream already closed")]
    Closed,

    /// A destination buffer cannot hold the whole image.
    #[error("buffer too small: need {needed} floats, got {got}")]
    BufferTooSmall {
        /// Floats required (`width * height * 3`).
        needed: usize,
        /// Floats provided.
        got: usize,
    },

    /// A pixel sink refused a decoded pixel, aborting the parse.
    #[error("pixel ({x}, {y}) rejected: {reason}")]
    Rejected {
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
        /// Why the sink refused it.
        reason: String,
    },

    /// I/O failure on an already-open handle.
    #[error("ray stream I/O: {0}")]
    Io(#[from] io::Error),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
