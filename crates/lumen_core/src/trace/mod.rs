//! # Tracing
//!
//! Worker threads turn work units into pixels: one primary ray per pixel
//! from the [`Camera`], shaded by the [`Scene`], written to the surface.

mod camera;
mod coordinator;
mod scene;
mod worker;

pub use camera::Camera;
pub use coordinator::{render, RenderStats};
pub use scene::{FlatScene, Scene, ShadeError};
pub use worker::{TraceWorker, WorkerStats};
