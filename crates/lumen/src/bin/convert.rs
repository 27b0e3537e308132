//! # LUMEN Convert
//!
//! Converts a ray stream into an image.
//!
//! ```bash
//! # 24-bit TGA
//! lumen_convert out.ray out.tga
//!
//! # Memory-mapped float file (width * height * 3 native-endian f32)
//! lumen_convert out.ray out.f32
//!
//! # Header and coverage only
//! lumen_convert out.ray
//! ```
//!
//! A stream still being written converts fine; pixels not yet appended come
//! out black.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lumen::codec::{convert_to_tga, map_to_file, CodecResult, ParseSummary, RayStreamReader};
use lumen::init_tracing;

fn convert(input: &Path, output: Option<&Path>) -> CodecResult<ParseSummary> {
    let mut reader = RayStreamReader::open(input)?;
    let header = reader.header();
    tracing::info!(
        input = %input.display(),
        width = header.width,
        height = header.height,
        "ray stream opened"
    );

    let Some(output) = output else {
        let mut count_only = |_x: u32, _y: u32, _rgb: [f32; 3]| -> CodecResult<()> { Ok(()) };
        return reader.parse(&mut count_only);
    };

    let is_tga = output.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("tga"));
    if is_tga {
        convert_to_tga(&mut reader, output)
    } else {
        let mapped = map_to_file(&mut reader, output)?;
        mapped.flush()?;
        Ok(mapped.summary())
    }
}

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(input) = args.next() else {
        eprintln!("usage: lumen_convert <input.ray> [output.tga | output.f32]");
        return ExitCode::from(2);
    };
    let output = args.next();

    match convert(&input, output.as_deref()) {
        Ok(summary) => {
            tracing::info!(
                records = summary.records,
                pixels = summary.pixels,
                complete = matches!(summary.end, lumen::codec::StreamEnd::EofRecord),
                "conversion done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "conversion failed");
            ExitCode::FAILURE
        }
    }
}
