//! Work units and the layouts that cut an image into them.

use crate::error::{CoreError, CoreResult};

/// An indivisible, immutable slice of image work: `len` pixels of row `y`
/// starting at column `x_start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkUnit {
    /// Position in the unit index space `[0, total)`.
    pub index: usize,
    /// Row.
    pub y: u32,
    /// First column.
    pub x_start: u32,
    /// Pixel count, never zero.
    pub len: u32,
}

impl WorkUnit {
    /// Columns covered by this unit.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> std::ops::Range<u32> {
        self.x_start..self.x_start + self.len
    }

    /// Every `(x, y)` coordinate of the unit, left to right.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> {
        let y = self.y;
        self.columns().map(move |x| (x, y))
    }
}

/// How the unit index space maps onto the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitLayout {
    /// One unit per row.
    #[default]
    Scanlines,
    /// Each row cut into spans of at most `span_width` pixels.
    Spans {
        /// Maximum span length in pixels.
        span_width: u32,
    },
}

impl UnitLayout {
    /// Rejects a zero span width.
    ///
    /// # Errors
    ///
    /// `CoreError::Configuration` for `Spans { span_width: 0 }`.
    pub fn validate(self) -> CoreResult<Self> {
        match self {
            Self::Spans { span_width: 0 } => {
                Err(CoreError::Configuration("span width must be positive".into()))
            }
            other => Ok(other),
        }
    }

    /// Units per row for an image `width` pixels wide.
    #[must_use]
    pub fn units_per_row(self, width: u32) -> u32 {
        match self {
            Self::Scanlines => 1,
            Self::Spans { span_width } => width.div_ceil(span_width),
        }
    }

    /// Total unit count for a `width x height` image.
    #[must_use]
    pub fn unit_count(self, width: u32, height: u32) -> usize {
        self.units_per_row(width) as usize * height as usize
    }

    /// The unit with the given index. `index` must be below
    /// [`unit_count`](Self::unit_count).
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn unit_at(self, index: usize, width: u32) -> WorkUnit {
        match self {
            Self::Scanlines => WorkUnit { index, y: index as u32, x_start: 0, len: width },
            Self::Spans { span_width } => {
                let per_row = self.units_per_row(width) as usize;
                let y = (index / per_row) as u32;
                let x_start = (index % per_row) as u32 * span_width;
                let len = span_width.min(width - x_start);
                WorkUnit { index, y, x_start, len }
            }
        }
    }
}
