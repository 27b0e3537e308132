//! The scene capability queried by trace workers.

use lumen_shared::{ColorF, Ray};
use thiserror::Error;

/// A shading failure for one ray. The worker logs it and skips the pixel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("shading failed: {0}")]
pub struct ShadeError(pub String);

/// Anything that can turn a primary ray into a color.
///
/// Queried concurrently by every worker, so implementations must be
/// `Send + Sync` and should not hold locks across a call.
pub trait Scene: Send + Sync {
    /// The color seen along `ray`.
    ///
    /// # Errors
    ///
    /// `ShadeError` when no color can be produced; only that pixel is lost.
    fn shade(&self, ray: &Ray) -> Result<ColorF, ShadeError>;
}

/// A scene that returns the same color for every ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatScene(pub ColorF);

impl Scene for FlatScene {
    fn shade(&self, _ray: &Ray) -> Result<ColorF, ShadeError> {
        Ok(self.0)
    }
}
