//! # Work Dispenser
//!
//! Hands out [`WorkUnit`]s to any number of threads. Every unit is issued to
//! exactly one caller and no unit is skipped.
//!
//! ```text
//!   worker 0 ──┐
//!   worker 1 ──┼──► request_unit() ──► [ cursor | order table ] ──► WorkUnit
//!   worker N ──┘                            │
//!                                           ▼ cursor == total
//!   coordinator ◄── wait_for_done() ◄── Condvar::notify_all
//! ```
//!
//! The cursor is the only mutable state. It sits behind one mutex that is
//! held just long enough to read and advance it. The randomized order is a
//! permutation computed once at construction and never changes afterwards.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::unit::{UnitLayout, WorkUnit};
use crate::error::{CoreError, CoreResult};

/// Order in which units are issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispensePolicy {
    /// Strictly increasing index order.
    #[default]
    Sequential,
    /// A fixed pseudo-random permutation. Same seed, same order.
    Randomized {
        /// Seed for the permutation.
        seed: u64,
    },
}

/// Thread-safe source of work units for one render.
#[derive(Debug)]
pub struct WorkDispenser {
    width: u32,
    height: u32,
    layout: UnitLayout,
    policy: DispensePolicy,
    total: usize,
    /// Issue order for `Randomized`; `None` means identity.
    order: Option<Box<[usize]>>,
    /// Count of units issued so far.
    cursor: Mutex<usize>,
    done: Condvar,
}

impl WorkDispenser {
    /// Creates a dispenser covering a `width x height` image.
    ///
    /// # Errors
    ///
    /// `CoreError::Configuration` for a zero dimension or a zero span width.
    pub fn new(
        width: u32,
        height: u32,
        layout: UnitLayout,
        policy: DispensePolicy,
    ) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::Configuration(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let layout = layout.validate()?;
        let total = layout.unit_count(width, height);

        let order = match policy {
            DispensePolicy::Sequential => None,
            DispensePolicy::Randomized { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut order: Vec<usize> = (0..total).collect();
                order.shuffle(&mut rng);
                Some(order.into_boxed_slice())
            }
        };

        tracing::debug!(width, height, total, ?layout, ?policy, "work dispenser ready");

        Ok(Self {
            width,
            height,
            layout,
            policy,
            total,
            order,
            cursor: Mutex::new(0),
            done: Condvar::new(),
        })
    }

    /// Issues the next unit, or `None` once every unit has been handed out.
    ///
    /// Safe to call from any number of threads. After the first `None` every
    /// later call also returns `None`.
    pub fn request_unit(&self) -> Option<WorkUnit> {
        let slot = {
            let mut cursor = self.cursor.lock();
            if *cursor >= self.total {
                return None;
            }
            let slot = *cursor;
            *cursor += 1;
            if *cursor == self.total {
                self.done.notify_all();
            }
            slot
        };

        let index = self.order.as_ref().map_or(slot, |order| order[slot]);
        Some(self.layout.unit_at(index, self.width))
    }

    /// Blocks until every unit has been issued.
    ///
    /// Returns once the last unit has been handed out. Workers may still be
    /// processing it; join them afterwards.
    pub fn wait_for_done(&self) {
        let mut cursor = self.cursor.lock();
        while *cursor < self.total {
            self.done.wait(&mut cursor);
        }
    }

    /// Like [`wait_for_done`](Self::wait_for_done), giving up after `timeout`.
    /// Returns `true` if every unit has been issued.
    pub fn wait_for_done_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cursor = self.cursor.lock();
        while *cursor < self.total {
            if self.done.wait_until(&mut cursor, deadline).timed_out() {
                return *cursor >= self.total;
            }
        }
        true
    }

    /// Units issued so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        *self.cursor.lock()
    }

    /// Units in the whole image.
    #[inline]
    #[must_use]
    pub fn total_units(&self) -> usize {
        self.total
    }

    /// Whether every unit has been issued.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.issued() >= self.total
    }

    /// The unit layout.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> UnitLayout {
        self.layout
    }

    /// The dispense policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> DispensePolicy {
        self.policy
    }

    /// Image size as `(width, height)`.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
