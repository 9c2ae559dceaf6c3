//! Axis-aligned map extents.

/// Axis-aligned bounding rectangle in map units.
///
/// An extent whose width or height is not positive is considered empty.
/// Empty extents are legal values; strategies answer them with an empty
/// tile list rather than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Create an extent from its corner coordinates.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create an extent of the given size centered on a point.
    pub fn from_center(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self::new(
            center_x - half_w,
            center_y - half_h,
            center_x + half_w,
            center_y + half_h,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// Center point as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns true if the extent has no area (or NaN coordinates).
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Returns true if the two extents overlap with a non-zero area.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Grow the extent on every side by `percent` of its width/height.
    ///
    /// A margin of 10% turns a 100-unit-wide extent into a 120-unit-wide one
    /// with the same center. Non-positive margins return the extent unchanged.
    pub fn expand_by_percent(&self, percent: f64) -> Extent {
        if percent.is_nan() || percent <= 0.0 {
            return *self;
        }
        let dx = self.width() * percent / 100.0;
        let dy = self.height() * percent / 100.0;
        Extent::new(
            self.min_x - dx,
            self.min_y - dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Squared distance between the centers of two extents.
    pub(crate) fn center_distance_sq(&self, other: &Extent) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).powi(2) + (ay - by).powi(2)
    }
}
