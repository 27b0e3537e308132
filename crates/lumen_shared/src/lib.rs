//! # LUMEN Shared
//!
//! Plain value types used across the renderer: linear colors, vectors, rays
//! and the render defaults.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod color;
pub mod constants;
pub mod math;

pub use color::ColorF;
pub use constants::{
    DEFAULT_FOV_DEGREES, DEFAULT_HEIGHT, DEFAULT_OUTPUT, DEFAULT_SEED, DEFAULT_WIDTH,
    DEFAULT_WORKERS,
};
pub use math::{Ray, Vec3};
