//! # Render Defaults
//!
//! Values used when a render config leaves a field out.

/// Default image width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Default number of trace worker threads.
pub const DEFAULT_WORKERS: usize = 8;

/// Default ray stream output path.
pub const DEFAULT_OUTPUT: &str = "out.ray";

/// Default seed for the randomized dispense order.
pub const DEFAULT_SEED: u64 = 0x5EED_1234_ABCD_0001;

/// Default vertical field of view in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
