//! Linear float colors and their 8-bit display form.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Linear RGB color with float channels, nominally in `[0, 1]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ColorF {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl ColorF {
    /// Creates a color.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Black, the default background.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// White
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Channels as an array, the layout used on disk.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Creates from an `[r, g, b]` array.
    #[inline]
    #[must_use]
    pub const fn from_array(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    /// Multiplies every channel by `k`.
    #[must_use]
    pub fn scale(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    /// Channel-wise product.
    #[must_use]
    pub fn modulate(self, other: Self) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    /// Every channel clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.r.clamp(0.0, 1.0), self.g.clamp(0.0, 1.0), self.b.clamp(0.0, 1.0))
    }
}

impl std::ops::Add for ColorF {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl From<[f32; 3]> for ColorF {
    fn from(rgb: [f32; 3]) -> Self {
        Self::from_array(rgb)
    }
}

impl From<ColorF> for [f32; 3] {
    fn from(c: ColorF) -> Self {
        c.to_array()
    }
}
