//! Infinite oriented planes.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::PLANE_EPSILON;

/// An infinite oriented plane in 3D space.
///
/// Stored as a unit normal and the offset `w` such that a point `p` lies on
/// the plane when `normal.dot(p) == w`. The signed distance of any point is
/// `normal.dot(p) - w`, positive on the side the normal points into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal of the plane.
    pub normal: Vector3<f64>,
    /// Offset along the normal.
    pub w: f64,
}

impl Plane {
    /// Create a plane from a (not necessarily unit) normal and a point on it.
    ///
    /// A zero-length normal falls back to the XY plane through the point.
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        let n = normal.norm();
        let normal = if n < 1e-12 {
            Vector3::z()
        } else {
            normal / n
        };
        Plane {
            normal,
            w: normal.dot(&point.coords),
        }
    }

    /// Create the plane through three points, oriented by their winding.
    ///
    /// Degenerate (collinear) input falls back to the XY plane through `a`.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Self {
        let normal = (b - a).cross(&(c - a));
        Self::from_point_normal(a, &normal)
    }

    /// Signed distance from a point to the plane.
    #[inline]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.w
    }

    /// Orthogonal projection of a point onto the plane.
    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.normal * self.distance(point)
    }

    /// The same plane with opposite orientation.
    #[inline]
    pub fn flipped(&self) -> Plane {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Intersection of the open segment `a..b` with the plane.
    ///
    /// Returns the crossing only when the endpoints lie strictly on opposite
    /// sides; endpoints on the plane itself yield `None`.
    pub fn intersect_segment(&self, a: &Point3<f64>, b: &Point3<f64>) -> Option<Point3<f64>> {
        let da = self.distance(a);
        let db = self.distance(b);
        if da * db >= 0.0 {
            return None;
        }
        let t = da / (da - db);
        Some(a + (b - a) * t)
    }

    /// Split a triangle into the polygons in front of and behind the plane.
    ///
    /// Vertices within [`PLANE_EPSILON`] of the plane are treated as on it
    /// and emitted to both sides. Either polygon may be empty; each has at
    /// most four vertices.
    pub fn clip_triangle(
        &self,
        a: &Point3<f64>,
        b: &Point3<f64>,
        c: &Point3<f64>,
    ) -> (Vec<Point3<f64>>, Vec<Point3<f64>>) {
        let corners = [a, b, c];
        let dists: Vec<f64> = corners.iter().map(|p| self.distance(p)).collect();
        let mut front = Vec::with_capacity(4);
        let mut back = Vec::with_capacity(4);
        for i in 0..3 {
            let j = (i + 1) % 3;
            let (p, d) = (corners[i], dists[i]);
            if d >= -PLANE_EPSILON {
                front.push(*p);
            }
            if d <= PLANE_EPSILON {
                back.push(*p);
            }
            // Strict crossing between consecutive corners.
            if (dists[i] > PLANE_EPSILON && dists[j] < -PLANE_EPSILON)
                || (dists[i] < -PLANE_EPSILON && dists[j] > PLANE_EPSILON)
            {
                let t = dists[i] / (dists[i] - dists[j]);
                let x = corners[i] + (corners[j] - corners[i]) * t;
                front.push(x);
                back.push(x);
            }
        }
        (front, back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_and_projection() {
        let plane = Plane::from_point_normal(&Point3::new(0.0, 2.0, 0.0), &Vector3::y());
        let p = Point3::new(3.0, 5.0, -1.0);
        assert_relative_eq!(plane.distance(&p), 3.0);
        let q = plane.project(&p);
        assert_relative_eq!(q.y, 2.0);
        assert_relative_eq!(q.x, 3.0);
        assert_relative_eq!(q.z, -1.0);
    }

    #[test]
    fn from_points_orientation() {
        let plane = Plane::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(plane.normal.z, 1.0);
        assert_relative_eq!(plane.w, 0.0);
    }

    #[test]
    fn degenerate_points_fall_back() {
        let plane = Plane::from_points(
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::new(3.0, 3.0, 3.0),
        );
        assert_relative_eq!(plane.normal.norm(), 1.0);
        assert_relative_eq!(plane.normal.z, 1.0);
    }

    #[test]
    fn segment_intersection() {
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::x());
        let hit = plane
            .intersect_segment(&Point3::new(-1.0, 0.0, 0.0), &Point3::new(3.0, 4.0, 0.0))
            .unwrap();
        assert_relative_eq!(hit.x, 0.0);
        assert_relative_eq!(hit.y, 1.0);
        // Parallel segment misses.
        assert!(plane
            .intersect_segment(&Point3::new(1.0, 0.0, 0.0), &Point3::new(1.0, 5.0, 0.0))
            .is_none());
    }

    #[test]
    fn triangle_clip_splits_area() {
        let plane = Plane::from_point_normal(&Point3::new(0.5, 0.0, 0.0), &Vector3::x());
        let (front, back) = plane.clip_triangle(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(front.len(), 3);
        assert_eq!(back.len(), 4);
        for p in front {
            assert!(p.x >= 0.5 - PLANE_EPSILON);
        }
        for p in back {
            assert!(p.x <= 0.5 + PLANE_EPSILON);
        }
    }
}
