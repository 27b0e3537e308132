//! # Ray Stream Reader
//!
//! Sequential, restartable decoder for the ray stream format.
//!
//! ## Tailing
//!
//! A stream may still be growing while it is read. Reaching the physical end
//! of the file without an `EOF` record is a clean end: `parse()` returns what
//! it decoded so far. A record cut off mid-way is not consumed; the reader
//! rewinds to the last complete boundary (for a pixel run, the last complete
//! triplet) so calling `parse()` again resumes exactly where the data ran out
//! without delivering any pixel twice.
//!
//! ```text
//!   parse #1:  [hdr][PIXEL][RUN 0..5 | 6..]       -> 1 + 6 pixels, EndOfData
//!   parse #2:                       [..6..9][EOF] -> 4 pixels, EofRecord
//! ```

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::mem::size_of;
use std::path::{Path, PathBuf};

use bytemuck::pod_read_unaligned;

use crate::error::{CodecError, CodecResult, FormatFault};
use crate::format::{
    ImageHeader, RawHeader, RawPixel, RawRunHeader, RecordTag, HEADER_SIZE, STREAM_MAGIC,
    TAG_SIZE, TRIPLET_SIZE,
};
use crate::sink::PixelSink;

/// How a `parse()` call stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamEnd {
    /// The physical end of the data was reached; more may be appended later.
    #[default]
    EndOfData,
    /// The `EOF` record was read; the stream is complete.
    EofRecord,
}

/// Counters for one `parse()` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Records decoded, including `NULL` and `EOF`.
    pub records: u64,
    /// Pixels delivered to the sink.
    pub pixels: u64,
    /// Why decoding stopped.
    pub end: StreamEnd,
}

/// Run whose triplets are still being delivered.
#[derive(Clone, Copy, Debug)]
struct PendingRun {
    x: u32,
    y: u32,
    length: u32,
    next: u32,
}

/// A ray stream open in read mode.
#[derive(Debug)]
pub struct RayStreamReader {
    /// Path of the stream file.
    path: PathBuf,
    /// Validated header.
    header: ImageHeader,
    /// File handle; `None` once closed.
    reader: Option<BufReader<File>>,
    /// Byte offset of the next unconsumed byte.
    offset: u64,
    /// Partially delivered run, if the data ended inside one.
    pending: Option<PendingRun>,
    /// Set once the `EOF` record has been read.
    finished: bool,
}

/// Reads until `buf` is full or the data ends. Returns bytes read.
fn read_fully(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl RayStreamReader {
    /// Opens an existing stream and validates its header.
    ///
    /// # Errors
    ///
    /// `CodecError::Configuration` if the file cannot be opened,
    /// `CodecError::Format` if the header is truncated or the magic mismatches.
    pub fn open(path: impl AsRef<Path>) -> CodecResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path)
            .map_err(|source| CodecError::Configuration { path: path.clone(), source })?;
        let mut reader = BufReader::new(file);

        let mut buf = [0u8; HEADER_SIZE];
        let found = read_fully(&mut reader, &mut buf)?;
        if found < HEADER_SIZE {
            return Err(CodecError::Format {
                path,
                fault: FormatFault::TruncatedHeader { found },
            });
        }

        let raw: RawHeader = pod_read_unaligned(&buf);
        if raw.magic != STREAM_MAGIC {
            return Err(CodecError::Format {
                path,
                fault: FormatFault::BadMagic { found: raw.magic },
            });
        }

        tracing::debug!(
            path = %path.display(),
            width = raw.width,
            height = raw.height,
            "ray stream opened"
        );

        Ok(Self {
            path,
            header: ImageHeader { width: raw.width, height: raw.height },
            reader: Some(reader),
            offset: HEADER_SIZE as u64,
            pending: None,
            finished: false,
        })
    }

    /// Header of this stream.
    #[inline]
    #[must_use]
    pub fn header(&self) -> ImageHeader {
        self.header
    }

    /// Image width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Image height.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Path of this stream.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next record boundary (or triplet inside a run).
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Whether the `EOF` record has been read.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Closes the file. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(
                path = %self.path.display(),
                offset = self.offset,
                "ray stream reader closed"
            );
        }
    }

    /// Fills `buf` from the cursor. If the data ends first, nothing is
    /// consumed and `false` is returned.
    fn take(&mut self, buf: &mut [u8]) -> CodecResult<bool> {
        let reader = self.reader.as_mut().ok_or(CodecError::Closed)?;
        let n = read_fully(reader, buf)?;
        if n == buf.len() {
            self.offset += n as u64;
            return Ok(true);
        }
        reader.seek(SeekFrom::Start(self.offset))?;
        Ok(false)
    }

    /// Moves the cursor back to `offset`.
    fn rewind(&mut self, offset: u64) -> CodecResult<()> {
        let reader = self.reader.as_mut().ok_or(CodecError::Closed)?;
        reader.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Decodes records until `EOF` or the end of the data, handing every
    /// pixel to `sink`. Runs expand into one call per pixel.
    ///
    /// Calling `parse()` again continues after the last complete record, so a
    /// growing file can be tailed by calling it repeatedly. After the `EOF`
    /// record every call returns immediately.
    ///
    /// # Errors
    ///
    /// The first error returned by `sink` aborts decoding and is returned
    /// as-is; the pixel that failed counts as consumed. `CodecError::Closed`
    /// after `close()`, `CodecError::Io` on read failure.
    pub fn parse<S>(&mut self, sink: &mut S) -> CodecResult<ParseSummary>
    where
        S: PixelSink + ?Sized,
    {
        if self.reader.is_none() {
            return Err(CodecError::Closed);
        }

        let mut summary = ParseSummary::default();
        if self.finished {
            summary.end = StreamEnd::EofRecord;
            return Ok(summary);
        }

        loop {
            if self.pending.is_some() && !self.drain_run(sink, &mut summary)? {
                return Ok(summary);
            }

            let record_start = self.offset;
            let mut tag = [0u8; TAG_SIZE];
            if !self.take(&mut tag)? {
                return Ok(summary);
            }

            match RecordTag::from_u32(u32::from_ne_bytes(tag)) {
                Some(RecordTag::Pixel) => {
                    let mut buf = [0u8; size_of::<RawPixel>()];
                    if !self.take(&mut buf)? {
                        self.rewind(record_start)?;
                        return Ok(summary);
                    }
                    let pixel: RawPixel = pod_read_unaligned(&buf);
                    summary.records += 1;
                    sink.accept(pixel.x, pixel.y, [pixel.r, pixel.g, pixel.b])?;
                    summary.pixels += 1;
                }
                Some(RecordTag::PixelRun) => {
                    let mut buf = [0u8; size_of::<RawRunHeader>()];
                    if !self.take(&mut buf)? {
                        self.rewind(record_start)?;
                        return Ok(summary);
                    }
                    let run: RawRunHeader = pod_read_unaligned(&buf);
                    summary.records += 1;
                    self.pending =
                        Some(PendingRun { x: run.x, y: run.y, length: run.length, next: 0 });
                }
                Some(RecordTag::Eof) => {
                    summary.records += 1;
                    summary.end = StreamEnd::EofRecord;
                    self.finished = true;
                    tracing::debug!(path = %self.path.display(), "hit EOF record");
                    return Ok(summary);
                }
                Some(RecordTag::Null) => summary.records += 1,
                None => {
                    // Unknown tags carry no payload we could size; skip them like NULL.
                    tracing::debug!(
                        tag = u32::from_ne_bytes(tag),
                        offset = record_start,
                        "skipping unknown record tag"
                    );
                }
            }
        }
    }

    /// Delivers the remaining triplets of the pending run. Returns `false`
    /// if the data ended before the run was complete.
    fn drain_run<S>(&mut self, sink: &mut S, summary: &mut ParseSummary) -> CodecResult<bool>
    where
        S: PixelSink + ?Sized,
    {
        while let Some(mut run) = self.pending {
            if run.next >= run.length {
                self.pending = None;
                break;
            }

            let mut buf = [0u8; TRIPLET_SIZE];
            if !self.take(&mut buf)? {
                return Ok(false);
            }
            let rgb: [f32; 3] = pod_read_unaligned(&buf);
            let x = run.x.wrapping_add(run.next);

            run.next += 1;
            self.pending = Some(run);

            sink.accept(x, run.y, rgb)?;
            summary.pixels += 1;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{PixelSample, SampleCollector};
    use crate::test_support::temp_stream_path;
    use crate::writer::RayStreamWriter;
    use bytemuck::bytes_of;
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    fn append_bytes(path: &Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn test_round_trip_pixel_and_run() {
        let path = temp_stream_path("reader_round_trip");
        let run = [
            [0.0, 0.1, 0.2],
            [1.0, 1.1, 1.2],
            [2.0, 2.1, 2.2],
            [3.0, 3.1, 3.2],
            [4.0, 4.1, 4.2],
        ];
        {
            let mut writer = RayStreamWriter::create(&path, 10, 10).unwrap();
            writer.write_pixel(3, 4, [0.1, 0.2, 0.3]).unwrap();
            writer.write_pixel_run(0, 5, &run).unwrap();
            writer.close().unwrap();
        }

        let mut reader = RayStreamReader::open(&path).unwrap();
        assert_eq!(reader.header(), ImageHeader { width: 10, height: 10 });

        let mut collector = SampleCollector::default();
        let summary = reader.parse(&mut collector).unwrap();

        assert_eq!(summary.pixels, 6);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.end, StreamEnd::EofRecord);

        let mut expected = vec![PixelSample { x: 3, y: 4, rgb: [0.1, 0.2, 0.3] }];
        expected.extend(
            run.iter().enumerate().map(|(i, rgb)| PixelSample { x: i as u32, y: 5, rgb: *rgb }),
        );
        assert_eq!(collector.samples, expected);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        let path = temp_stream_path("reader_bad_magic");
        fs::write(&path, bytes_of(&RawHeader { magic: 0xDEAD_BEEF, width: 4, height: 4 })).unwrap();

        match RayStreamReader::open(&path) {
            Err(CodecError::Format { fault: FormatFault::BadMagic { found }, .. }) => {
                assert_eq!(found, 0xDEAD_BEEF);
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncated_header_is_format_error() {
        let path = temp_stream_path("reader_short_header");
        fs::write(&path, &STREAM_MAGIC.to_ne_bytes()).unwrap();

        let err = RayStreamReader::open(&path).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format { fault: FormatFault::TruncatedHeader { found: 4 }, .. }
        ));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let path = temp_stream_path("reader_missing");
        assert!(matches!(RayStreamReader::open(&path), Err(CodecError::Configuration { .. })));
    }

    #[test]
    fn test_truncated_run_delivers_prefix_then_clean_end() {
        let path = temp_stream_path("reader_truncated_run");
        {
            let mut writer = RayStreamWriter::create(&path, 8, 2).unwrap();
            writer.write_pixel(7, 1, [0.5; 3]).unwrap();
            writer.write_pixel_run(0, 0, &[[0.25; 3]; 8]).unwrap();
            writer.close().unwrap();
        }

        // Cut the file three and a half triplets into the run.
        let full = fs::read(&path).unwrap();
        let run_payload = HEADER_SIZE + TAG_SIZE + 20 + TAG_SIZE + 12;
        fs::write(&path, &full[..run_payload + 3 * TRIPLET_SIZE + 6]).unwrap();

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut collector = SampleCollector::default();
        let summary = reader.parse(&mut collector).unwrap();

        assert_eq!(summary.end, StreamEnd::EndOfData);
        assert_eq!(summary.pixels, 4);
        assert_eq!(collector.samples[0], PixelSample { x: 7, y: 1, rgb: [0.5; 3] });
        assert_eq!(
            collector.samples[1..].iter().map(|s| s.x).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(reader.position(), (run_payload + 3 * TRIPLET_SIZE) as u64);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_resume_after_tail_grows() {
        let path = temp_stream_path("reader_resume");
        let colors: Vec<[f32; 3]> = (0..6).map(|i| [i as f32, 0.0, 0.0]).collect();

        // Build the complete byte image, then expose it in slices.
        {
            let mut writer = RayStreamWriter::create(&path, 6, 1).unwrap();
            writer.write_pixel_run(0, 0, &colors).unwrap();
            writer.close().unwrap();
        }
        let full = fs::read(&path).unwrap();
        let cut = HEADER_SIZE + TAG_SIZE + 12 + 2 * TRIPLET_SIZE + 5;
        fs::write(&path, &full[..cut]).unwrap();

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut collector = SampleCollector::default();

        let first = reader.parse(&mut collector).unwrap();
        assert_eq!(first.pixels, 2);
        assert_eq!(first.end, StreamEnd::EndOfData);

        append_bytes(&path, &full[cut..]);

        let second = reader.parse(&mut collector).unwrap();
        assert_eq!(second.pixels, 4);
        assert_eq!(second.end, StreamEnd::EofRecord);
        assert!(reader.is_finished());

        let xs: Vec<u32> = collector.samples.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4, 5]);
        assert!(collector.samples.iter().all(|s| s.rgb[0] == s.x as f32));

        // Nothing more after EOF.
        let third = reader.parse(&mut collector).unwrap();
        assert_eq!(third.pixels, 0);
        assert_eq!(third.end, StreamEnd::EofRecord);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_partial_tag_is_not_consumed() {
        let path = temp_stream_path("reader_partial_tag");
        {
            let mut writer = RayStreamWriter::create(&path, 2, 2).unwrap();
            writer.write_pixel(1, 1, [1.0; 3]).unwrap();
            writer.close().unwrap();
        }
        // Drop the EOF record and leave half a tag in its place.
        let full = fs::read(&path).unwrap();
        let without_eof = &full[..full.len() - TAG_SIZE];
        fs::write(&path, without_eof).unwrap();
        append_bytes(&path, &RecordTag::Pixel.to_bytes()[..2]);

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut collector = SampleCollector::default();
        let summary = reader.parse(&mut collector).unwrap();

        assert_eq!(summary.pixels, 1);
        assert_eq!(reader.position(), without_eof.len() as u64);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_null_and_unknown_records_are_skipped() {
        let path = temp_stream_path("reader_null");
        fs::write(&path, bytes_of(&RawHeader::new(4, 4))).unwrap();
        append_bytes(&path, &RecordTag::Null.to_bytes());
        append_bytes(&path, &77u32.to_ne_bytes());
        append_bytes(&path, &RecordTag::Pixel.to_bytes());
        append_bytes(&path, bytes_of(&RawPixel { x: 2, y: 3, r: 0.5, g: 0.25, b: 0.125 }));
        append_bytes(&path, &RecordTag::Eof.to_bytes());

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut collector = SampleCollector::default();
        let summary = reader.parse(&mut collector).unwrap();

        assert_eq!(collector.samples, vec![PixelSample { x: 2, y: 3, rgb: [0.5, 0.25, 0.125] }]);
        assert_eq!(summary.end, StreamEnd::EofRecord);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_sink_failure_aborts_parse() {
        let path = temp_stream_path("reader_abort");
        {
            let mut writer = RayStreamWriter::create(&path, 4, 1).unwrap();
            writer.write_pixel_run(0, 0, &[[1.0; 3]; 4]).unwrap();
        }

        let mut reader = RayStreamReader::open(&path).unwrap();
        let mut seen = 0u32;
        let mut sink = |x: u32, y: u32, _rgb: [f32; 3]| -> CodecResult<()> {
            seen += 1;
            if x == 1 {
                return Err(CodecError::Rejected { x, y, reason: "stop".to_string() });
            }
            Ok(())
        };

        let err = reader.parse(&mut sink).unwrap_err();
        assert!(matches!(err, CodecError::Rejected { x: 1, y: 0, .. }));
        assert_eq!(seen, 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_parse_after_close_fails() {
        let path = temp_stream_path("reader_close");
        drop(RayStreamWriter::create(&path, 1, 1).unwrap());

        let mut reader = RayStreamReader::open(&path).unwrap();
        reader.close();
        reader.close();
        let mut collector = SampleCollector::default();
        assert!(matches!(reader.parse(&mut collector), Err(CodecError::Closed)));

        fs::remove_file(&path).ok();
    }
}
