//! # Render Configuration
//!
//! Everything a render needs, loaded from TOML. Every field is optional;
//! missing fields take the defaults below.
//!
//! ```toml
//! width = 800
//! height = 600
//! workers = 8
//! output = "out.ray"
//! order = "randomized"
//! seed = 42
//! span_width = 64        # omit for one unit per scanline
//! streaming = true       # false: render in memory, persist at the end
//! tga = "out.tga"        # optional conversion after the render
//! background = { r = 0.0, g = 0.0, b = 0.0 }
//!
//! [camera]
//! origin = { x = 0.0, y = 0.0, z = 0.0 }
//! target = { x = 0.0, y = 0.0, z = -1.0 }
//! fov_degrees = 60.0
//! ```

use std::io;
use std::path::{Path, PathBuf};

use lumen_core::{Camera, DispensePolicy, UnitLayout};
use lumen_shared::{
    ColorF, Vec3, DEFAULT_FOV_DEGREES, DEFAULT_HEIGHT, DEFAULT_OUTPUT, DEFAULT_SEED,
    DEFAULT_WIDTH, DEFAULT_WORKERS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a [`RenderConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The TOML did not parse or did not match the schema.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Dispense order, as written in config files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOrder {
    /// Rows top to bottom.
    #[default]
    Sequential,
    /// Seeded shuffle of all units.
    Randomized,
}

/// Camera placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position.
    pub origin: Vec3,
    /// Point looked at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            target: Vec3::new(0.0, 0.0, -1.0),
            fov_degrees: DEFAULT_FOV_DEGREES,
        }
    }
}

/// One render job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Trace worker threads.
    pub workers: usize,
    /// Ray stream output path.
    pub output: PathBuf,
    /// Dispense order.
    pub order: TraceOrder,
    /// Seed for [`TraceOrder::Randomized`].
    pub seed: u64,
    /// Split rows into spans of this many pixels; `None` for whole rows.
    pub span_width: Option<u32>,
    /// Stream pixels to `output` as they are computed. When false the image
    /// is kept in memory and written out after the render.
    pub streaming: bool,
    /// Also convert the result to a TGA image at this path.
    pub tga: Option<PathBuf>,
    /// Color of pixels no ray reaches.
    pub background: ColorF,
    /// Camera placement.
    pub camera: CameraConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            workers: DEFAULT_WORKERS,
            output: PathBuf::from(DEFAULT_OUTPUT),
            order: TraceOrder::Sequential,
            seed: DEFAULT_SEED,
            span_width: None,
            streaming: true,
            tga: None,
            background: ColorF::BLACK,
            camera: CameraConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for bad syntax or unknown keys,
    /// `ConfigError::Invalid` for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "render config loaded");
        Ok(config)
    }

    /// Checks every value that would stop a render before it starts.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.span_width == Some(0) {
            return Err(ConfigError::Invalid("span_width must be positive".into()));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_degrees must be in (0, 180), got {}",
                self.camera.fov_degrees
            )));
        }
        if self.camera.origin == self.camera.target {
            return Err(ConfigError::Invalid("camera origin and target coincide".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path is empty".into()));
        }
        Ok(())
    }

    /// Dispense policy for the core.
    #[must_use]
    pub fn dispense_policy(&self) -> DispensePolicy {
        match self.order {
            TraceOrder::Sequential => DispensePolicy::Sequential,
            TraceOrder::Randomized => DispensePolicy::Randomized { seed: self.seed },
        }
    }

    /// Unit layout for the core.
    #[must_use]
    pub fn unit_layout(&self) -> UnitLayout {
        self.span_width.map_or(UnitLayout::Scanlines, |span_width| UnitLayout::Spans { span_width })
    }

    /// Camera for this image size.
    #[must_use]
    pub fn build_camera(&self) -> Camera {
        Camera::look_at(
            self.camera.origin,
            self.camera.target,
            self.camera.fov_degrees,
            self.width,
            self.height,
        )
    }
}
