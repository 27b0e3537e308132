//! # Ray Stream Format
//!
//! ```text
//! [12 bytes: header]       magic:u32  width:u32  height:u32
//!
//! Record format:
//! [4 bytes: tag]
//!   NULL      (0)  no payload, ignored padding
//!   PIXEL     (1)  x:u32 y:u32 r:f32 g:f32 b:f32
//!   PIXEL_RUN (2)  x:u32 y:u32 length:u32, then length x (r:f32 g:f32 b:f32)
//!   EOF       (3)  no payload, terminates the stream
//! ```
//!
//! All fields are written in native byte order. The magic constant is the
//! only validity check; the format is not portable across endianness.

use bytemuck::{Pod, Zeroable};

/// Magic constant at the start of every ray stream ("RAYF").
pub const STREAM_MAGIC: u32 = 0x5241_5946;

/// Size of [`RawHeader`] on disk.
pub const HEADER_SIZE: usize = std::mem::size_of::<RawHeader>();

/// Size of a record tag on disk.
pub const TAG_SIZE: usize = std::mem::size_of::<u32>();

/// Size of one RGB triplet inside a pixel run.
pub const TRIPLET_SIZE: usize = std::mem::size_of::<[f32; 3]>();

/// Stream header.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RawHeader {
    /// Always [`STREAM_MAGIC`].
    pub magic: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl RawHeader {
    /// Creates a header for an image of the given size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { magic: STREAM_MAGIC, width, height }
    }
}

/// Payload of a `PIXEL` record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RawPixel {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
}

/// Fixed part of a `PIXEL_RUN` record; `length` triplets follow.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RawRunHeader {
    /// Column of the first pixel.
    pub x: u32,
    /// Row shared by every pixel of the run.
    pub y: u32,
    /// Number of triplets that follow.
    pub length: u32,
}

/// Record type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RecordTag {
    /// Reserved padding, skipped by readers.
    Null = 0,
    /// A single pixel.
    Pixel = 1,
    /// A run of same-row pixels.
    PixelRun = 2,
    /// End of stream.
    Eof = 3,
}

impl RecordTag {
    /// Converts from the on-disk value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Null),
            1 => Some(Self::Pixel),
            2 => Some(Self::PixelRun),
            3 => Some(Self::Eof),
            _ => None,
        }
    }

    /// The on-disk bytes of this tag.
    #[inline]
    #[must_use]
    pub fn to_bytes(self) -> [u8; TAG_SIZE] {
        (self as u32).to_ne_bytes()
    }
}

/// Header read from (or written to) a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageHeader {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl ImageHeader {
    /// Total pixel count, or `None` if it does not fit in `usize`.
    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Number of `f32` channels in a flat RGB buffer for this image, or
    /// `None` if it does not fit in `usize`.
    #[inline]
    #[must_use]
    pub fn float_count(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(3)
    }

    /// Whether `(x, y)` lies inside the image.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}
