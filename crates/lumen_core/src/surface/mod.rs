//! # Render Surface
//!
//! The shared destination for every computed pixel.
//!
//! ## Backends
//!
//! - **Memory** - a dense `width * height` store, readable at any time
//! - **Streaming** - pixels go straight into a ray stream; consecutive
//!   same-row writes are coalesced into `PIXEL_RUN` records. A pending run
//!   is appended when the next write breaks it, on [`flush`](RenderSurface::flush),
//!   on [`finish`](RenderSurface::finish), or when the surface is dropped
//!
//! ## Notification
//!
//! At most one [`PixelObserver`] may be registered. It is called on the
//! writing thread after the pixel is stored and before `write` returns. The
//! storage lock is released before the call, so an observer may read the
//! surface.

mod backend;
mod observer;

use std::path::Path;
use std::sync::Arc;

use bytemuck::cast_slice;
use lumen_codec::RayStreamWriter;
use lumen_shared::ColorF;
use parking_lot::{Mutex, RwLock};

use crate::error::{CoreError, CoreResult};
use backend::{StreamState, SurfaceBackend};

pub use observer::{ChannelObserver, PixelEvent, PixelObserver};

/// Pixel store shared by all workers of a render.
pub struct RenderSurface {
    width: u32,
    height: u32,
    background: ColorF,
    backend: SurfaceBackend,
    observer: RwLock<Option<Arc<dyn PixelObserver>>>,
}

impl RenderSurface {
    /// Creates an in-memory surface filled with `background`.
    ///
    /// # Errors
    ///
    /// `CoreError::Configuration` for a zero dimension.
    pub fn in_memory(width: u32, height: u32, background: ColorF) -> CoreResult<Self> {
        check_dimensions(width, height)?;
        let store = vec![background; width as usize * height as usize];
        Ok(Self::with_backend(width, height, background, SurfaceBackend::Memory(Mutex::new(store))))
    }

    /// Creates a streaming surface writing a new ray stream at `path`.
    ///
    /// # Errors
    ///
    /// `CoreError::Configuration` for a zero dimension, `CoreError::Codec`
    /// if the stream cannot be created.
    pub fn streaming(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        background: ColorF,
    ) -> CoreResult<Self> {
        check_dimensions(width, height)?;
        let writer = RayStreamWriter::create(path, width, height)?;
        Ok(Self::from_writer(writer, background))
    }

    /// Creates a streaming surface around an already open writer. The image
    /// size is taken from the writer's header.
    #[must_use]
    pub fn from_writer(writer: RayStreamWriter, background: ColorF) -> Self {
        let header = writer.header();
        let backend = SurfaceBackend::Streaming(Mutex::new(StreamState::new(writer)));
        Self::with_backend(header.width, header.height, background, backend)
    }

    fn with_backend(width: u32, height: u32, background: ColorF, backend: SurfaceBackend) -> Self {
        Self { width, height, background, backend, observer: RwLock::new(None) }
    }

    /// Image width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color of pixels never written.
    #[inline]
    #[must_use]
    pub fn background(&self) -> ColorF {
        self.background
    }

    /// Whether pixels go to a ray stream.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.backend, SurfaceBackend::Streaming(_))
    }

    fn check_bounds(&self, x: u32, y: u32) -> CoreResult<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(CoreError::OutOfRange { x, y, width: self.width, height: self.height })
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn observer(&self) -> Option<Arc<dyn PixelObserver>> {
        self.observer.read().clone()
    }

    /// Stores one pixel, then notifies the observer.
    ///
    /// # Errors
    ///
    /// `CoreError::OutOfRange` outside the image, `CoreError::Codec` if the
    /// stream append fails (including after [`finish`](Self::finish)).
    pub fn write(&self, x: u32, y: u32, color: ColorF) -> CoreResult<()> {
        self.check_bounds(x, y)?;

        match &self.backend {
            SurfaceBackend::Memory(store) => {
                let offset = self.offset(x, y);
                store.lock()[offset] = color;
            }
            SurfaceBackend::Streaming(state) => state.lock().push(x, y, color.to_array())?,
        }

        if let Some(observer) = self.observer() {
            observer.on_pixel(x, y, color);
        }
        Ok(())
    }

    /// Stores a contiguous run of row `y` starting at column `x`. A streaming
    /// surface appends it as one record. The observer sees every pixel.
    ///
    /// # Errors
    ///
    /// `CoreError::OutOfRange` if any pixel of the run falls outside the
    /// image, `CoreError::Codec` if the stream append fails.
    pub fn write_run(&self, x: u32, y: u32, colors: &[ColorF]) -> CoreResult<()> {
        if colors.is_empty() {
            return Ok(());
        }
        let len = u32::try_from(colors.len()).unwrap_or(u32::MAX);
        let last = x.saturating_add(len - 1);
        self.check_bounds(x, y)?;
        self.check_bounds(last, y)?;

        match &self.backend {
            SurfaceBackend::Memory(store) => {
                let start = self.offset(x, y);
                store.lock()[start..start + colors.len()].copy_from_slice(colors);
            }
            SurfaceBackend::Streaming(state) => state.lock().push_run(x, y, cast_slice(colors))?,
        }

        if let Some(observer) = self.observer() {
            for (dx, color) in (0..).zip(colors) {
                observer.on_pixel(x + dx, y, *color);
            }
        }
        Ok(())
    }

    /// The last color written at `(x, y)`, or the background.
    ///
    /// # Errors
    ///
    /// `CoreError::OutOfRange` outside the image, `CoreError::Unsupported`
    /// on a streaming surface.
    pub fn read(&self, x: u32, y: u32) -> CoreResult<ColorF> {
        self.check_bounds(x, y)?;
        match &self.backend {
            SurfaceBackend::Memory(store) => Ok(store.lock()[self.offset(x, y)]),
            SurfaceBackend::Streaming(_) => {
                Err(CoreError::Unsupported("read from a streaming surface"))
            }
        }
    }

    /// Registers the observer, replacing any previous one.
    pub fn set_notification(&self, observer: Arc<dyn PixelObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Removes the observer, if any.
    pub fn clear_notification(&self) {
        *self.observer.write() = None;
    }

    /// Copy of every pixel in row-major order.
    ///
    /// # Errors
    ///
    /// `CoreError::Unsupported` on a streaming surface.
    pub fn snapshot(&self) -> CoreResult<Vec<ColorF>> {
        match &self.backend {
            SurfaceBackend::Memory(store) => Ok(store.lock().clone()),
            SurfaceBackend::Streaming(_) => {
                Err(CoreError::Unsupported("snapshot of a streaming surface"))
            }
        }
    }

    /// Writes a memory surface out as a ray stream, one run per row.
    ///
    /// # Errors
    ///
    /// `CoreError::Unsupported` on a streaming surface, `CoreError::Codec`
    /// if the stream cannot be written.
    pub fn persist(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let SurfaceBackend::Memory(store) = &self.backend else {
            return Err(CoreError::Unsupported("persist a streaming surface"));
        };

        let pixels = store.lock().clone();
        let mut writer = RayStreamWriter::create(path, self.width, self.height)?;
        for (y, row) in (0..).zip(pixels.chunks_exact(self.width as usize)) {
            writer.write_pixel_run(0, y, cast_slice(row))?;
        }
        writer.close()?;

        tracing::debug!(path = %writer.path().display(), rows = self.height, "surface persisted");
        Ok(())
    }

    /// Appends any coalesced run and flushes the stream so readers tailing
    /// the file see every pixel written so far. A no-op for memory surfaces
    /// and after [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// `CoreError::Codec` if the append or flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        if let SurfaceBackend::Streaming(state) = &self.backend {
            state.lock().flush()?;
        }
        Ok(())
    }

    /// Appends any coalesced run and closes the stream. Idempotent; a no-op
    /// for memory surfaces.
    ///
    /// # Errors
    ///
    /// `CoreError::Codec` if the final appends fail.
    pub fn finish(&self) -> CoreResult<()> {
        if let SurfaceBackend::Streaming(state) = &self.backend {
            let mut state = state.lock();
            state.finish()?;
            tracing::debug!(
                path = %state.writer().path().display(),
                records = state.writer().records_written(),
                "streaming surface finished"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .field("streaming", &self.is_streaming())
            .field("observed", &self.observer.read().is_some())
            .finish_non_exhaustive()
    }
}

fn check_dimensions(width: u32, height: u32) -> CoreResult<()> {
    if width == 0 || height == 0 {
        return Err(CoreError::Configuration(format!(
            "surface dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}
