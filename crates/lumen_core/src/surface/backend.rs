//! Pixel storage behind a [`RenderSurface`](super::RenderSurface).

use lumen_codec::{CodecError, CodecResult, RayStreamWriter};
use lumen_shared::ColorF;
use parking_lot::Mutex;

/// Where written pixels go.
#[derive(Debug)]
pub(crate) enum SurfaceBackend {
    /// Dense row-major store, initialised to the background.
    Memory(Mutex<Vec<ColorF>>),
    /// Appends to a ray stream.
    Streaming(Mutex<StreamState>),
}

/// A ray stream writer plus the run being coalesced.
#[derive(Debug)]
pub(crate) struct StreamState {
    writer: RayStreamWriter,
    run: PendingRun,
}

/// Consecutive same-row pixels not yet appended.
#[derive(Debug, Default)]
struct PendingRun {
    x: u32,
    y: u32,
    colors: Vec<[f32; 3]>,
}

impl PendingRun {
    /// End column (exclusive) of the run.
    #[allow(clippy::cast_possible_truncation)]
    fn end(&self) -> u32 {
        self.x + self.colors.len() as u32
    }

    fn extends_to(&self, x: u32, y: u32) -> bool {
        !self.colors.is_empty() && self.y == y && self.end() == x
    }
}

impl StreamState {
    pub(crate) fn new(writer: RayStreamWriter) -> Self {
        Self { writer, run: PendingRun::default() }
    }

    pub(crate) fn writer(&self) -> &RayStreamWriter {
        &self.writer
    }

    /// Adds one pixel. It joins the pending run when it continues it,
    /// otherwise the pending run is appended and a new one starts. A run
    /// that reaches the right edge is appended immediately.
    pub(crate) fn push(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        if self.writer.is_closed() {
            return Err(CodecError::Closed);
        }
        if !self.run.extends_to(x, y) {
            self.flush_run()?;
            self.run.x = x;
            self.run.y = y;
        }
        self.run.colors.push(rgb);

        if self.run.end() >= self.writer.header().width {
            self.flush_run()?;
        }
        Ok(())
    }

    /// Appends a whole run as one record, after any pending pixels.
    pub(crate) fn push_run(&mut self, x: u32, y: u32, colors: &[[f32; 3]]) -> CodecResult<()> {
        self.flush_run()?;
        self.writer.write_pixel_run(x, y, colors)
    }

    /// Appends the pending run, if any.
    pub(crate) fn flush_run(&mut self) -> CodecResult<()> {
        match self.run.colors.len() {
            0 => Ok(()),
            1 => {
                let rgb = self.run.colors[0];
                self.run.colors.clear();
                self.writer.write_pixel(self.run.x, self.run.y, rgb)
            }
            _ => {
                let result = self.writer.write_pixel_run(self.run.x, self.run.y, &self.run.colors);
                self.run.colors.clear();
                result
            }
        }
    }

    /// Appends the pending run and pushes buffered bytes to the file, so a
    /// tailing reader sees everything written so far. No-op once closed.
    pub(crate) fn flush(&mut self) -> CodecResult<()> {
        if self.writer.is_closed() {
            return Ok(());
        }
        self.flush_run()?;
        self.writer.flush()
    }

    /// Appends the pending run and closes the stream.
    pub(crate) fn finish(&mut self) -> CodecResult<()> {
        if self.writer.is_closed() {
            return Ok(());
        }
        self.flush_run()?;
        self.writer.close()
    }
}

impl Drop for StreamState {
    // Runs before the writer's own drop appends EOF.
    fn drop(&mut self) {
        if self.writer.is_closed() {
            return;
        }
        if let Err(e) = self.flush_run() {
            tracing::warn!(
                path = %self.writer.path().display(),
                error = %e,
                "failed to append pending pixels"
            );
        }
    }
}
