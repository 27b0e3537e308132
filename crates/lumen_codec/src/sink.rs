//! # Pixel Sinks
//!
//! The visitor side of [`RayStreamReader::parse`](crate::RayStreamReader::parse).
//! A sink receives one call per decoded pixel; returning an error aborts the
//! parse immediately and the error is handed back to the caller unchanged.

use crate::error::CodecResult;

/// Receives decoded pixels in append order.
pub trait PixelSink {
    /// Accepts one pixel. Runs are delivered as consecutive calls with the
    /// same `y` and increasing `x`.
    ///
    /// # Errors
    ///
    /// Any error aborts the parse and is propagated to its caller.
    fn accept(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()>;
}

impl<F> PixelSink for F
where
    F: FnMut(u32, u32, [f32; 3]) -> CodecResult<()>,
{
    #[inline]
    fn accept(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        self(x, y, rgb)
    }
}

/// One decoded pixel, as collected by [`SampleCollector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSample {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Red, green, blue.
    pub rgb: [f32; 3],
}

/// Sink that keeps every pixel it sees, in order.
#[derive(Debug, Default)]
pub struct SampleCollector {
    /// Collected samples.
    pub samples: Vec<PixelSample>,
}

impl PixelSink for SampleCollector {
    fn accept(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        self.samples.push(PixelSample { x, y, rgb });
        Ok(())
    }
}
