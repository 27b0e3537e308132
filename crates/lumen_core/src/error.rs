//! # Core Error Types

use std::io;

use lumen_codec::CodecError;
use thiserror::Error;

/// Errors raised by the render core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rejected before any work started: zero dimensions, zero workers,
    /// zero span width.
    #[error("invalid render configuration: {0}")]
    Configuration(String),

    /// A write addressed a pixel outside the image.
    #[error("pixel ({x}, {y}) outside {width}x{height} image")]
    OutOfRange {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// The operation is not available on this surface backend.
    #[error("unsupported on this surface: {0}")]
    Unsupported(&'static str),

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// Ray stream failure on a streaming surface.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
