//! # Ray Stream Writer
//!
//! Append-only writer for the ray stream format. The header is written once
//! on creation, every append adds exactly one record, and closing appends the
//! terminating `EOF` record.
//!
//! ## Live Tailing
//!
//! Pixel runs are flushed as soon as they are appended so a reader on the
//! same file sees whole rows while the render is still in progress. Single
//! pixels stay in the write buffer until the next run, `flush()` or `close()`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytemuck::{bytes_of, cast_slice};

use crate::error::{CodecError, CodecResult};
use crate::format::{ImageHeader, RawHeader, RawPixel, RawRunHeader, RecordTag};

/// Write buffer size; large enough for several full-HD rows of runs.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// A ray stream open in write mode.
#[derive(Debug)]
pub struct RayStreamWriter {
    /// Path of the stream file.
    path: PathBuf,
    /// Header written at creation.
    header: ImageHeader,
    /// File handle; `None` once closed.
    file: Option<BufWriter<File>>,
    /// Records appended so far (excluding `EOF`).
    records: u64,
}

impl RayStreamWriter {
    /// Creates (or truncates) `path` and writes the stream header.
    ///
    /// # Errors
    ///
    /// `CodecError::Configuration` if the file cannot be created,
    /// `CodecError::Io` if the header cannot be written.
    pub fn create(path: impl AsRef<Path>, width: u32, height: u32) -> CodecResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| CodecError::Configuration { path: path.clone(), source })?;

        let mut file = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        file.write_all(bytes_of(&RawHeader::new(width, height)))?;
        // Readers may open the file before the first record arrives.
        file.flush()?;

        tracing::debug!(path = %path.display(), width, height, "ray stream created");

        Ok(Self {
            path,
            header: ImageHeader { width, height },
            file: Some(file),
            records: 0,
        })
    }

    /// Header of this stream.
    #[inline]
    #[must_use]
    pub fn header(&self) -> ImageHeader {
        self.header
    }

    /// Path of this stream.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far, excluding the final `EOF`.
    #[inline]
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Whether `close()` has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn handle(&mut self) -> CodecResult<&mut BufWriter<File>> {
        self.file.as_mut().ok_or(CodecError::Closed)
    }

    /// Appends a single `PIXEL` record.
    ///
    /// # Errors
    ///
    /// `CodecError::Closed` after `close()`, `CodecError::Io` on write failure.
    pub fn write_pixel(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        let [r, g, b] = rgb;
        let pixel = RawPixel { x, y, r, g, b };

        let file = self.handle()?;
        file.write_all(&RecordTag::Pixel.to_bytes())?;
        file.write_all(bytes_of(&pixel))?;

        self.records += 1;
        Ok(())
    }

    /// Appends a `PIXEL_RUN` record covering `(x + i, y)` for every color,
    /// then flushes. An empty run writes nothing.
    ///
    /// # Errors
    ///
    /// `CodecError::Closed` after `close()`, `CodecError::Rejected` if the run
    /// does not fit a `u32` length, `CodecError::Io` on write failure.
    pub fn write_pixel_run(&mut self, x: u32, y: u32, colors: &[[f32; 3]]) -> CodecResult<()> {
        if colors.is_empty() {
            return Ok(());
        }

        let length = u32::try_from(colors.len()).map_err(|_| CodecError::Rejected {
            x,
            y,
            reason: format!("run of {} pixels exceeds the record limit", colors.len()),
        })?;

        let file = self.handle()?;
        file.write_all(&RecordTag::PixelRun.to_bytes())?;
        file.write_all(bytes_of(&RawRunHeader { x, y, length }))?;
        file.write_all(cast_slice(colors))?;
        file.flush()?;

        self.records += 1;
        Ok(())
    }

    /// Flushes buffered records to the file.
    ///
    /// # Errors
    ///
    /// `CodecError::Closed` after `close()`, `CodecError::Io` on write failure.
    pub fn flush(&mut self) -> CodecResult<()> {
        self.handle()?.flush()?;
        Ok(())
    }

    /// Appends the `EOF` record and closes the file. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// `CodecError::Io` if the trailer cannot be written. The handle is
    /// released either way.
    pub fn close(&mut self) -> CodecResult<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        file.write_all(&RecordTag::Eof.to_bytes())?;
        file.flush()?;

        tracing::debug!(path = %self.path.display(), records = self.records, "ray stream closed");
        Ok(())
    }
}

impl Drop for RayStreamWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to close ray stream");
        }
    }
}
