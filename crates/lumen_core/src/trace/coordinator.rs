//! # Render Coordinator
//!
//! Runs one render to completion:
//!
//! ```text
//!   spawn N workers ──► open start gate ──► wait_for_done ──► join all ──► finish surface
//!        │                    │
//!        └── each blocks ─────┘ then pulls units until Exhausted
//! ```
//!
//! Workers are released together so none of them gets a head start on the
//! dispenser while the rest are still being spawned.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::error::{CoreError, CoreResult};
use crate::surface::RenderSurface;
use crate::work::WorkDispenser;

use super::camera::Camera;
use super::scene::Scene;
use super::worker::{TraceWorker, WorkerStats};

/// How often the coordinator checks for workers that died early.
const LIVENESS_POLL: Duration = Duration::from_millis(50);

/// Totals for one finished render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Worker threads used.
    pub workers: usize,
    /// Units processed across all workers.
    pub units: usize,
    /// Pixels written.
    pub pixels: u64,
    /// Pixels lost to shading failures.
    pub skipped: u64,
    /// Wall time from first spawn to surface finish.
    pub elapsed: Duration,
}

/// Renders every unit of `dispenser` into `surface` using `workers` threads.
///
/// Blocks until the dispenser is exhausted and every worker has been joined,
/// then finishes the surface.
///
/// # Errors
///
/// - `CoreError::Configuration` if `workers` is zero (nothing is started)
/// - `CoreError::Spawn` if a thread cannot be created (workers already
///   spawned are released without rendering and joined)
/// - `CoreError::WorkerPanicked` or the first worker error otherwise
pub fn render(
    dispenser: &Arc<WorkDispenser>,
    surface: &Arc<RenderSurface>,
    scene: &Arc<dyn Scene>,
    camera: Camera,
    workers: usize,
) -> CoreResult<RenderStats> {
    if workers == 0 {
        return Err(CoreError::Configuration("worker count must be positive".into()));
    }

    let started = Instant::now();
    let (width, height) = dispenser.dimensions();
    tracing::info!(
        width,
        height,
        workers,
        units = dispenser.total_units(),
        policy = ?dispenser.policy(),
        "trace start"
    );

    // Each worker waits for one `true`; a dropped gate sends it home unrun.
    let (gate, start) = crossbeam_channel::unbounded::<bool>();
    let mut handles = Vec::with_capacity(workers);

    for id in 0..workers {
        let worker = TraceWorker::new(
            id,
            Arc::clone(dispenser),
            Arc::clone(surface),
            Arc::clone(scene),
            camera,
        );
        let start = start.clone();
        let spawned = thread::Builder::new()
            .name(format!("lumen-trace-{id}"))
            .spawn(move || run_gated(&worker, &start));

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                drop(gate);
                let _ = join_all(handles);
                return Err(CoreError::Spawn(e));
            }
        }
    }

    for _ in 0..workers {
        // Receivers live in the workers; a send only fails if all have exited.
        let _ = gate.send(true);
    }
    drop(gate);

    while !dispenser.wait_for_done_timeout(LIVENESS_POLL) {
        if handles.iter().all(JoinHandle::is_finished) {
            tracing::warn!(
                issued = dispenser.issued(),
                total = dispenser.total_units(),
                "all workers exited before the dispenser ran dry"
            );
            break;
        }
    }

    let outcome = join_all(handles);
    let finished = surface.finish();
    let totals = outcome?;
    finished?;

    let stats = RenderStats {
        workers,
        units: totals.units,
        pixels: totals.pixels,
        skipped: totals.skipped,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        pixels = stats.pixels,
        skipped = stats.skipped,
        seconds = stats.elapsed.as_secs_f64(),
        "trace end"
    );
    Ok(stats)
}

fn run_gated(worker: &TraceWorker, start: &Receiver<bool>) -> CoreResult<WorkerStats> {
    match start.recv() {
        Ok(true) => worker.run(),
        _ => Ok(WorkerStats::default()),
    }
}

/// Joins every handle, keeping the first failure.
fn join_all(handles: Vec<JoinHandle<CoreResult<WorkerStats>>>) -> CoreResult<WorkerStats> {
    let mut totals = WorkerStats::default();
    let mut first_error = None;

    for (id, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap_or_else(|_| Err(CoreError::WorkerPanicked(id)));
        match result {
            Ok(stats) => totals += stats,
            Err(e) => {
                tracing::error!(worker = id, error = %e, "worker failed");
                first_error.get_or_insert(e);
            }
        }
    }

    first_error.map_or(Ok(totals), Err)
}
