//! # Render Session
//!
//! Turns a [`RenderConfig`] into a finished ray stream:
//!
//! 1. validate the config (nothing starts on failure)
//! 2. build the dispenser and the surface (streaming or in-memory)
//! 3. attach the progress observer and run the workers
//! 4. persist an in-memory surface, then optionally convert to TGA

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lumen_codec::{convert_to_tga, CodecError, ParseSummary, RayStreamReader};
use lumen_core::{
    render, CoreError, PixelObserver, RenderStats, RenderSurface, Scene, WorkDispenser,
};
use lumen_shared::ColorF;
use thiserror::Error;

use crate::config::{ConfigError, RenderConfig};

/// Errors from a render session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The render core failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persisting or converting the result failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for sessions.
pub type SessionResult<T> = Result<T, SessionError>;

/// Logs render progress in tenths as pixels arrive.
#[derive(Debug)]
pub struct ProgressObserver {
    total: u64,
    done: AtomicU64,
}

impl ProgressObserver {
    /// Tracks an image of `total` pixels.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self { total: total.max(1), done: AtomicU64::new(0) }
    }

    /// Pixels seen so far.
    #[must_use]
    pub fn pixels(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

impl PixelObserver for ProgressObserver {
    fn on_pixel(&self, _x: u32, _y: u32, _color: ColorF) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let tenth = done * 10 / self.total;
        if tenth > (done - 1) * 10 / self.total {
            tracing::info!(percent = tenth * 10, pixels = done, "render progress");
        }
    }
}

/// Outcome of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    /// Core render totals.
    pub stats: RenderStats,
    /// The ray stream written.
    pub output: PathBuf,
    /// The TGA written, with its decode summary, when requested.
    pub tga: Option<(PathBuf, ParseSummary)>,
}

/// One configured render.
#[derive(Debug)]
pub struct RenderSession {
    config: RenderConfig,
}

impl RenderSession {
    /// Validates `config` and prepares a session.
    ///
    /// # Errors
    ///
    /// `SessionError::Config` if the config is invalid.
    pub fn new(config: RenderConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders `scene` to the configured output.
    ///
    /// # Errors
    ///
    /// Core failures (surface creation, worker failures) and codec failures
    /// (persist, TGA conversion).
    pub fn run(&self, scene: Arc<dyn Scene>) -> SessionResult<RenderReport> {
        let config = &self.config;
        tracing::info!(
            width = config.width,
            height = config.height,
            workers = config.workers,
            output = %config.output.display(),
            streaming = config.streaming,
            "render session start"
        );

        let dispenser = Arc::new(WorkDispenser::new(
            config.width,
            config.height,
            config.unit_layout(),
            config.dispense_policy(),
        )?);

        let (width, height, background) = (config.width, config.height, config.background);
        let surface = Arc::new(if config.streaming {
            RenderSurface::streaming(&config.output, width, height, background)?
        } else {
            RenderSurface::in_memory(width, height, background)?
        });

        let total = u64::from(width) * u64::from(height);
        surface.set_notification(Arc::new(ProgressObserver::new(total)));

        let stats = render(&dispenser, &surface, &scene, config.build_camera(), config.workers)?;
        surface.clear_notification();

        if !config.streaming {
            surface.persist(&config.output)?;
        }

        let tga = match &config.tga {
            Some(path) => {
                let mut reader = RayStreamReader::open(&config.output)?;
                let summary = convert_to_tga(&mut reader, path)?;
                tracing::info!(path = %path.display(), pixels = summary.pixels, "tga written");
                Some((path.clone(), summary))
            }
            None => None,
        };

        Ok(RenderReport { stats, output: config.output.clone(), tga })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let config = RenderConfig { workers: 0, ..RenderConfig::default() };
        assert!(matches!(RenderSession::new(config), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_progress_counts_pixels() {
        let progress = ProgressObserver::new(20);
        for x in 0..20 {
            progress.on_pixel(x, 0, ColorF::BLACK);
        }
        assert_eq!(progress.pixels(), 20);
    }
}
