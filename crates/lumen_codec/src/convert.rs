//! # Ray Stream Converters
//!
//! Everything here is built on [`RayStreamReader::parse`]: each converter is
//! just a [`PixelSink`] that places pixels by coordinate. Records may arrive in
//! any order, so every sink addresses its target directly instead of
//! appending.
//!
//! Pixels that never appear in the stream keep the target's initial value:
//! whatever the caller put in the buffer for [`read_into_buffer`], and black
//! for [`convert_to_tga`] and [`map_to_file`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{CodecError, CodecResult};
use crate::format::ImageHeader;
use crate::reader::{ParseSummary, RayStreamReader, StreamEnd};
use crate::sink::PixelSink;

/// Size of the TGA header written by [`convert_to_tga`].
pub const TGA_HEADER_SIZE: u64 = 18;

/// Converts a linear channel value to an 8-bit intensity.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn channel_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

fn too_large(header: ImageHeader) -> CodecError {
    CodecError::Dimensions {
        width: header.width,
        height: header.height,
        reason: "image size overflows the address space",
    }
}

fn rejected(x: u32, y: u32, header: ImageHeader) -> CodecError {
    CodecError::Rejected {
        x,
        y,
        reason: format!("outside {}x{} image", header.width, header.height),
    }
}

/// Writes pixels into a flat RGB float array at `(y * width + x) * 3`.
struct BufferSink<'a> {
    header: ImageHeader,
    buf: &'a mut [f32],
}

impl PixelSink for BufferSink<'_> {
    fn accept(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        if !self.header.contains(x, y) {
            return Err(rejected(x, y, self.header));
        }
        let index = (y as usize * self.header.width as usize + x as usize) * 3;
        self.buf[index..index + 3].copy_from_slice(&rgb);
        Ok(())
    }
}

/// Decodes the whole stream into `buf`, which must hold at least
/// `width * height * 3` floats.
///
/// # Errors
///
/// `CodecError::Dimensions` if the header's size overflows `usize`,
/// `CodecError::BufferTooSmall` before reading anything if `buf` is short,
/// `CodecError::Rejected` on the first out-of-range record, plus any read
/// error from the stream.
pub fn read_into_buffer(
    reader: &mut RayStreamReader,
    buf: &mut [f32],
) -> CodecResult<ParseSummary> {
    let header = reader.header();
    let needed = header.float_count().ok_or_else(|| too_large(header))?;
    if buf.len() < needed {
        return Err(CodecError::BufferTooSmall { needed, got: buf.len() });
    }

    reader.parse(&mut BufferSink { header, buf })
}

/// Seeks to each pixel's offset in a TGA body and writes B, G, R bytes.
struct TgaSink {
    header: ImageHeader,
    out: BufWriter<File>,
    /// Offset the writer is positioned at, to skip redundant seeks.
    cursor: u64,
}

impl PixelSink for TgaSink {
    fn accept(&mut self, x: u32, y: u32, rgb: [f32; 3]) -> CodecResult<()> {
        if !self.header.contains(x, y) {
            return Err(rejected(x, y, self.header));
        }

        let offset = TGA_HEADER_SIZE
            + (u64::from(y) * u64::from(self.header.width) + u64::from(x)) * 3;
        if offset != self.cursor {
            self.out.seek(SeekFrom::Start(offset))?;
        }

        let [r, g, b] = rgb.map(channel_to_u8);
        self.out.write_all(&[b, g, r])?;
        self.cursor = offset + 3;
        Ok(())
    }
}

/// Builds an uncompressed 24-bit truecolor TGA header, origin top-left.
fn tga_header(width: u16, height: u16) -> [u8; TGA_HEADER_SIZE as usize] {
    let [w0, w1] = width.to_le_bytes();
    let [h0, h1] = height.to_le_bytes();
    [
        0, // id length
        0, // no color map
        2, // uncompressed truecolor
        0, 0, 0, 0, 0, // color map spec
        0, 0, // x origin
        0, 0, // y origin
        w0, w1, // width
        h0, h1, // height
        24,   // bits per pixel
        0x20, // top-left origin
    ]
}

fn create_output(path: &Path) -> CodecResult<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| CodecError::Configuration { path: path.to_path_buf(), source })
}

/// Converts the stream into a TGA file at `path`.
///
/// # Errors
///
/// `CodecError::Dimensions` if the image exceeds TGA's 16-bit size fields,
/// `CodecError::Configuration` if `path` cannot be created, plus any parse
/// or write error.
pub fn convert_to_tga(
    reader: &mut RayStreamReader,
    path: impl AsRef<Path>,
) -> CodecResult<ParseSummary> {
    let header = reader.header();
    let (Ok(width), Ok(height)) = (u16::try_from(header.width), u16::try_from(header.height)) else {
        return Err(CodecError::Dimensions {
            width: header.width,
            height: header.height,
            reason: "TGA sizes are limited to 65535",
        });
    };

    let path = path.as_ref();
    let file = create_output(path)?;
    // Pre-size the body so pixels missing from the stream stay black.
    file.set_len(TGA_HEADER_SIZE + u64::from(width) * u64::from(height) * 3)?;

    let mut out = BufWriter::new(file);
    out.write_all(&tga_header(width, height))?;

    let mut sink = TgaSink { header, out, cursor: TGA_HEADER_SIZE };
    let summary = reader.parse(&mut sink)?;
    sink.out.flush()?;

    tracing::info!(
        path = %path.display(),
        pixels = summary.pixels,
        complete = summary.end == StreamEnd::EofRecord,
        "converted ray stream to TGA"
    );
    Ok(summary)
}

/// A file-backed `width * height * 3` float buffer filled from a ray stream.
pub struct MappedImage {
    path: PathBuf,
    header: ImageHeader,
    summary: ParseSummary,
    map: MmapMut,
}

impl MappedImage {
    /// Image header.
    #[must_use]
    pub fn header(&self) -> ImageHeader {
        self.header
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counters from the parse that filled this image.
    #[must_use]
    pub fn summary(&self) -> ParseSummary {
        self.summary
    }

    /// Flat RGB floats in raster order.
    #[must_use]
    pub fn pixels(&self) -> &[f32] {
        // The mapping is page-aligned and its length is a multiple of four.
        bytemuck::cast_slice(&self.map[..])
    }

    /// The color at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if !self.header.contains(x, y) {
            return None;
        }
        let index = (y as usize * self.header.width as usize + x as usize) * 3;
        let p = &self.pixels()[index..index + 3];
        Some([p[0], p[1], p[2]])
    }

    /// Flushes the mapping to its file.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `msync` failure.
    pub fn flush(&self) -> CodecResult<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for MappedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedImage")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Decodes the stream into a memory-mapped float file at `path`.
///
/// # Errors
///
/// `CodecError::Dimensions` for an empty image or one whose byte size
/// overflows, `CodecError::Configuration`
/// if `path` cannot be created, plus any parse, mapping or sink error.
#[allow(unsafe_code)]
pub fn map_to_file(
    reader: &mut RayStreamReader,
    path: impl AsRef<Path>,
) -> CodecResult<MappedImage> {
    let header = reader.header();
    let bytes = header
        .float_count()
        .and_then(|floats| floats.checked_mul(std::mem::size_of::<f32>()))
        .and_then(|bytes| u64::try_from(bytes).ok())
        .ok_or_else(|| too_large(header))?;
    if bytes == 0 {
        return Err(CodecError::Dimensions {
            width: header.width,
            height: header.height,
            reason: "cannot map an empty image",
        });
    }

    let path = path.as_ref().to_path_buf();
    let file = create_output(&path)?;
    file.set_len(bytes)?;

    // SAFETY: the file was just created and truncated by us; nothing else in
    // this process touches it while the mapping lives.
    let mut map = unsafe { MmapMut::map_mut(&file)? };

    let summary = {
        let buf: &mut [f32] = bytemuck::try_cast_slice_mut(&mut map[..])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        reader.parse(&mut BufferSink { header, buf })?
    };
    map.flush()?;

    tracing::debug!(
        path = %path.display(),
        pixels = summary.pixels,
        "mapped ray stream to float file"
    );

    Ok(MappedImage { path, header, summary, map })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_stream_path;
    use crate::writer::RayStreamWriter;
    use std::fs;

    fn sample_stream(tag: &str) -> PathBuf {
        let path = temp_stream_path(tag);
        let mut writer = RayStreamWriter::create(&path, 3, 2).unwrap();
        // Out of raster order on purpose.
        writer.write_pixel(2, 1, [1.0, 0.0, 0.0]).unwrap();
        writer.write_pixel_run(0, 0, &[[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        writer.close().unwrap();
        path
    }

    #[test]
    fn test_channel_to_u8_clamps() {
        assert_eq!(channel_to_u8(-1.0), 0);
        assert_eq!(channel_to_u8(0.0), 0);
        assert_eq!(channel_to_u8(1.0), 255);
        assert_eq!(channel_to_u8(7.5), 255);
        assert_eq!(channel_to_u8(0.5), 128);
    }

    #[test]
    fn test_read_into_buffer_places_by_coordinate() {
        let path = sample_stream("convert_buffer");
        let mut reader = RayStreamReader::open(&path).unwrap();

        let mut buf = vec![-1.0f32; 3 * 2 * 3];
        let summary = read_into_buffer(&mut reader, &mut buf).unwrap();
        assert_eq!(summary.pixels, 3);

        assert_eq!(&buf[0..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&buf[3..6], &[0.0, 0.0, 1.0]);
        assert_eq!(&buf[15..18], &[1.0, 0.0, 0.0]);
        // Never written: untouched.
        assert_eq!(&buf[6..9], &[-1.0, -1.0, -1.0]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_into_buffer_rejects_short_buffer() {
        let path = sample_stream("convert_short");
        let mut reader = RayStreamReader::open(&path).unwrap();

        let mut buf = vec![0.0f32; 5];
        let err = read_into_buffer(&mut reader, &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::BufferTooSmall { needed: 18, got: 5 }));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_out_of_range_record_aborts_conversion() {
        let path = temp_stream_path("convert_out_of_range");
        {
            let mut writer = RayStreamWriter::create(&path, 2, 2).unwrap();
            writer.write_pixel(0, 0, [1.0; 3]).unwrap();
            writer.write_pixel(5, 0, [1.0; 3]).unwrap();
            writer.write_pixel(1, 1, [1.0; 3]).unwrap();
        }

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut buf = vec![0.0f32; 12];
        let err = read_into_buffer(&mut reader, &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::Rejected { x: 5, y: 0, .. }));
        // The pixel after the bad record was never applied.
        assert_eq!(&buf[9..12], &[0.0, 0.0, 0.0]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_oversized_header_is_an_error() {
        let path = temp_stream_path("convert_huge");
        drop(RayStreamWriter::create(&path, u32::MAX, u32::MAX).unwrap());

        let mut reader = RayStreamReader::open(&path).unwrap();
        let err = read_into_buffer(&mut reader, &mut [0.0; 3]).unwrap_err();
        assert!(matches!(err, CodecError::Dimensions { width: u32::MAX, .. }));

        let out = temp_stream_path("convert_huge_map");
        let err = map_to_file(&mut reader, &out).unwrap_err();
        assert!(matches!(err, CodecError::Dimensions { height: u32::MAX, .. }));
        assert!(!out.exists());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_convert_to_tga_layout() {
        let path = sample_stream("convert_tga_src");
        let tga = temp_stream_path("convert_tga_out");
        let mut reader = RayStreamReader::open(&path).unwrap();

        let summary = convert_to_tga(&mut reader, &tga).unwrap();
        assert_eq!(summary.pixels, 3);

        let bytes = fs::read(&tga).unwrap();
        assert_eq!(bytes.len(), 18 + 3 * 2 * 3);
        assert_eq!(bytes[2], 2);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 3);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 2);
        assert_eq!(bytes[16], 24);
        assert_eq!(bytes[17], 0x20);

        let body = &bytes[18..];
        // (0,0) green, (1,0) blue, stored B,G,R.
        assert_eq!(&body[0..3], &[0, 255, 0]);
        assert_eq!(&body[3..6], &[255, 0, 0]);
        // (2,0) and the rest of row 1 never written: black.
        assert_eq!(&body[6..9], &[0, 0, 0]);
        assert_eq!(&body[9..15], &[0; 6]);
        // (2,1) red.
        assert_eq!(&body[15..18], &[0, 0, 255]);

        fs::remove_file(&path).ok();
        fs::remove_file(&tga).ok();
    }

    #[test]
    fn test_convert_to_tga_rejects_oversized_image() {
        let path = temp_stream_path("convert_tga_big");
        drop(RayStreamWriter::create(&path, 70_000, 1).unwrap());

        let mut reader = RayStreamReader::open(&path).unwrap();
        let err = convert_to_tga(&mut reader, temp_stream_path("convert_tga_big_out")).unwrap_err();
        assert!(matches!(err, CodecError::Dimensions { width: 70_000, .. }));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_map_to_file_round_trip() {
        let path = sample_stream("convert_map_src");
        let out = temp_stream_path("convert_map_out");
        let mut reader = RayStreamReader::open(&path).unwrap();

        let image = map_to_file(&mut reader, &out).unwrap();
        assert_eq!(image.pixels().len(), 18);
        assert_eq!(image.pixel(2, 1), Some([1.0, 0.0, 0.0]));
        assert_eq!(image.pixel(1, 1), Some([0.0, 0.0, 0.0]));
        assert_eq!(image.pixel(3, 0), None);
        assert_eq!(image.summary().pixels, 3);
        drop(image);

        let bytes = fs::read(&out).unwrap();
        assert_eq!(bytes.len(), 18 * 4);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[3..6], &[0.0, 0.0, 1.0]);

        fs::remove_file(&path).ok();
        fs::remove_file(&out).ok();
    }
}
