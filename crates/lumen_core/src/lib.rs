//! # LUMEN Core
//!
//! The concurrent core of the renderer.
//!
//! ## Architecture Rules
//!
//! 1. **At-most-once, no gaps** - every work unit goes to exactly one worker
//! 2. **Short locks** - the dispenser cursor and the surface storage are each
//!    behind one lock, never held across shading or an observer callback
//! 3. **No globals** - workers receive the dispenser and surface as `Arc`s
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumen_core::{render, Camera, DispensePolicy, RenderSurface, UnitLayout, WorkDispenser};
//!
//! let dispenser = Arc::new(WorkDispenser::new(800, 600, UnitLayout::Scanlines, DispensePolicy::Sequential)?);
//! let surface = Arc::new(RenderSurface::streaming("out.ray", 800, 600, ColorF::BLACK)?);
//! let stats = render(&dispenser, &surface, &scene, Camera::default_for(800, 600), 8)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod surface;
pub mod trace;
pub mod work;

pub use error::{CoreError, CoreResult};
pub use surface::{ChannelObserver, PixelEvent, PixelObserver, RenderSurface};
pub use trace::{
    render, Camera, FlatScene, RenderStats, Scene, ShadeError, TraceWorker, WorkerStats,
};
pub use work::{DispensePolicy, UnitLayout, WorkDispenser, WorkUnit};

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT: AtomicU64 = AtomicU64::new(0);

    pub fn temp_stream_path(tag: &str) -> PathBuf {
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("lumen_core_{tag}_{}_{seq}.ray", std::process::id()))
    }
}
