//! Live pixel notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use lumen_shared::ColorF;

/// Receives every pixel written to a surface, on the writing thread.
///
/// Calls come from many worker threads at once and must return promptly;
/// a slow observer slows the render.
pub trait PixelObserver: Send + Sync {
    /// One pixel was stored.
    fn on_pixel(&self, x: u32, y: u32, color: ColorF);
}

impl<F> PixelObserver for F
where
    F: Fn(u32, u32, ColorF) + Send + Sync,
{
    #[inline]
    fn on_pixel(&self, x: u32, y: u32, color: ColorF) {
        self(x, y, color);
    }
}

/// A pixel write, as forwarded by [`ChannelObserver`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelEvent {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Stored color.
    pub color: ColorF,
}

/// Forwards pixel events into a bounded channel without ever blocking the
/// writer. Events that do not fit are dropped and counted.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<PixelEvent>,
    dropped: AtomicU64,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Arc<Self>, Receiver<PixelEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Arc::new(Self { tx, dropped: AtomicU64::new(0) }), rx)
    }

    /// Events dropped because the channel was full or disconnected.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl PixelObserver for ChannelObserver {
    fn on_pixel(&self, x: u32, y: u32, color: ColorF) {
        match self.tx.try_send(PixelEvent { x, y, color }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    tracing::warn!("preview channel full, dropping pixel events");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    tracing::warn!("preview receiver gone, dropping pixel events");
                }
            }
        }
    }
}
