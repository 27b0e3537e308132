//! A trace worker: pulls units until the dispenser runs dry.

use std::sync::Arc;

use crate::error::CoreResult;
use crate::surface::RenderSurface;
use crate::work::{WorkDispenser, WorkUnit};

use super::camera::Camera;
use super::scene::Scene;

/// What one worker did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Units processed.
    pub units: usize,
    /// Pixels written.
    pub pixels: u64,
    /// Pixels skipped because shading failed.
    pub skipped: u64,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, rhs: Self) {
        self.units += rhs.units;
        self.pixels += rhs.pixels;
        self.skipped += rhs.skipped;
    }
}

/// Everything a worker thread shares with the rest of the render.
pub struct TraceWorker {
    id: usize,
    dispenser: Arc<WorkDispenser>,
    surface: Arc<RenderSurface>,
    scene: Arc<dyn Scene>,
    camera: Camera,
}

impl TraceWorker {
    /// Creates worker `id`.
    #[must_use]
    pub fn new(
        id: usize,
        dispenser: Arc<WorkDispenser>,
        surface: Arc<RenderSurface>,
        scene: Arc<dyn Scene>,
        camera: Camera,
    ) -> Self {
        Self { id, dispenser, surface, scene, camera }
    }

    /// Worker index.
    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Processes units until the dispenser is exhausted.
    ///
    /// # Errors
    ///
    /// Surface write or flush failures stop the worker. Shading failures
    /// do not.
    pub fn run(&self) -> CoreResult<WorkerStats> {
        let mut stats = WorkerStats::default();
        while let Some(unit) = self.dispenser.request_unit() {
            self.trace_unit(unit, &mut stats)?;
            // A finished unit is visible to readers tailing the stream.
            self.surface.flush()?;
            stats.units += 1;
        }

        tracing::debug!(
            worker = self.id,
            units = stats.units,
            pixels = stats.pixels,
            skipped = stats.skipped,
            "worker drained"
        );
        Ok(stats)
    }

    fn trace_unit(&self, unit: WorkUnit, stats: &mut WorkerStats) -> CoreResult<()> {
        for (x, y) in unit.pixels() {
            let ray = self.camera.primary_ray(x, y);
            match self.scene.shade(&ray) {
                Ok(color) => {
                    self.surface.write(x, y, color)?;
                    stats.pixels += 1;
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, x, y, error = %e, "pixel skipped");
                    stats.skipped += 1;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TraceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceWorker").field("id", &self.id).finish_non_exhaustive()
    }
}
