//! # LUMEN Render
//!
//! Renders the demo scene to a ray stream.
//!
//! ```bash
//! # Defaults: 800x600, 8 workers, out.ray
//! lumen_render
//!
//! # From a config file
//! lumen_render scene.toml
//!
//! # More log detail
//! RUST_LOG=debug lumen_render scene.toml
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use lumen::{init_tracing, RenderConfig, RenderSession, SessionError, SphereScene};

fn run() -> Result<(), SessionError> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    let session = RenderSession::new(config)?;
    let report = session.run(Arc::new(SphereScene::demo()))?;

    tracing::info!(
        output = %report.output.display(),
        pixels = report.stats.pixels,
        skipped = report.stats.skipped,
        seconds = report.stats.elapsed.as_secs_f64(),
        "shutting down"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "render failed");
            ExitCode::FAILURE
        }
    }
}
