//! # Work Distribution
//!
//! An image is cut into [`WorkUnit`]s by a [`UnitLayout`] and handed out by
//! a [`WorkDispenser`] under a [`DispensePolicy`].

mod dispenser;
mod unit;

pub use dispenser::{DispensePolicy, WorkDispenser};
pub use unit::{UnitLayout, WorkUnit};
