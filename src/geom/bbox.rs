//! Axis-aligned bounding boxes.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis and grows by
/// [`expand_to_include`](BoundingBox::expand_to_include).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Create a box from explicit corners.
    #[inline]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// The empty box (contains nothing, unions as identity).
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing all the given points.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f64>>>(points: I) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    /// Whether the box contains no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grow the box to contain a point.
    pub fn expand_to_include(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut bb = *self;
        if !other.is_empty() {
            bb.expand_to_include(&other.min);
            bb.expand_to_include(&other.max);
        }
        bb
    }

    /// Center of the box. Meaningless for an empty box.
    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grows_from_points() {
        let bb = BoundingBox::from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-1.0, 0.5, 1.0),
        ]);
        assert_relative_eq!(bb.min.x, -1.0);
        assert_relative_eq!(bb.max.y, 2.0);
        assert_relative_eq!(bb.max.z, 3.0);
        assert!(!bb.is_empty());
    }

    #[test]
    fn empty_unions_as_identity() {
        let bb = BoundingBox::from_points(&[Point3::new(1.0, 1.0, 1.0)]);
        let u = BoundingBox::empty().union(&bb);
        assert_relative_eq!(u.min.x, 1.0);
        assert_relative_eq!(u.max.x, 1.0);
        assert!(BoundingBox::empty().is_empty());
    }
}
