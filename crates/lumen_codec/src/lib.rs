//! # LUMEN Codec
//!
//! The ray stream: an append-only binary container for rendered pixels.
//!
//! ## Design Principles
//!
//! 1. **Append-only** - one writer appends records, readers decode in order
//! 2. **Tail-friendly** - a reader may follow a file that is still growing
//! 3. **Order-free** - records arrive in whatever order workers finish, so
//!    every consumer places pixels by coordinate
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumen_codec::{RayStreamWriter, RayStreamReader, convert_to_tga};
//!
//! let mut out = RayStreamWriter::create("out.ray", 800, 600)?;
//! out.write_pixel_run(0, 0, &row)?;
//! out.close()?;
//!
//! let mut input = RayStreamReader::open("out.ray")?;
//! convert_to_tga(&mut input, "out.tga")?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod convert;
pub mod error;
pub mod format;
pub mod reader;
pub mod sink;
pub mod writer;

pub use convert::{channel_to_u8, convert_to_tga, map_to_file, read_into_buffer, MappedImage};
pub use error::{CodecError, CodecResult, FormatFault};
pub use format::{ImageHeader, RecordTag, STREAM_MAGIC};
pub use reader::{ParseSummary, RayStreamReader, StreamEnd};
pub use sink::{PixelSample, PixelSink, SampleCollector};
pub use writer::RayStreamWriter;
