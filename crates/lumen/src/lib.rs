//! # LUMEN
//!
//! Front end for the renderer: configuration, render sessions, a demo
//! scene, and the `lumen_render` / `lumen_convert` binaries.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            lumen                              │
//! │        RenderConfig ──► RenderSession ──► RenderReport        │
//! └───────────────┬───────────────────────────────┬───────────────┘
//!                 │                               │
//!   ┌─────────────▼─────────────┐   ┌─────────────▼─────────────┐
//!   │        lumen_core         │   │        lumen_codec        │
//!   │  WorkDispenser            │──►│  RayStreamWriter          │
//!   │  RenderSurface + observer │   │  RayStreamReader          │
//!   │  TraceWorker, render()    │   │  TGA / buffer / mmap      │
//!   └─────────────┬─────────────┘   └───────────────────────────┘
//!                 │
//!   ┌─────────────▼─────────────┐
//!   │       lumen_shared        │
//!   │  ColorF, Vec3, Ray        │
//!   └───────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod demo;
pub mod session;
pub mod telemetry;

// Re-export the layers
pub use lumen_codec as codec;
pub use lumen_core as core;
pub use lumen_shared as shared;

pub use config::{CameraConfig, ConfigError, RenderConfig, TraceOrder};
pub use demo::{Sphere, SphereScene};
pub use session::{ProgressObserver, RenderReport, RenderSession, SessionError, SessionResult};
pub use telemetry::init_tracing;
