//! Triangle, segment and ray helpers.

use nalgebra::{Point3, Vector3};

/// Interior angle at `at` formed by the directions toward `prev` and `next`.
///
/// Returns a value in `[0, pi]`; zero when either arm is degenerate.
pub fn corner_angle(at: &Point3<f64>, prev: &Point3<f64>, next: &Point3<f64>) -> f64 {
    let u = prev - at;
    let v = next - at;
    let nu = u.norm();
    let nv = v.norm();
    if nu < 1e-12 || nv < 1e-12 {
        return 0.0;
    }
    (u.dot(&v) / (nu * nv)).clamp(-1.0, 1.0).acos()
}

/// Distance from a point to the infinite line through `a` and `b`.
///
/// Degenerates to the point distance when `a == b`.
pub fn distance_point_to_line(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len < 1e-12 {
        return (p - a).norm();
    }
    (p - a).cross(&ab).norm() / len
}

/// Closest point on the closed segment `a..b` to `p`.
pub fn closest_point_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let denom = ab.norm_squared();
    if denom < 1e-24 {
        return *a;
    }
    let t = ((p - a).dot(&ab) / denom).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from a point to the closed segment `a..b`.
#[inline]
pub fn distance_point_to_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (p - closest_point_on_segment(p, a, b)).norm()
}

/// Perpendicular distance from a point to a ray, with the ray parameter.
///
/// Returns `(distance, t)` where `t` is the parameter of the foot point
/// along `direction`; `t < 0` means the point lies behind the origin.
pub fn distance_point_to_ray(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    p: &Point3<f64>,
) -> (f64, f64) {
    let denom = direction.norm_squared();
    if denom < 1e-24 {
        return ((p - origin).norm(), 0.0);
    }
    let t = (p - origin).dot(direction) / denom;
    let foot = origin + direction * t;
    ((p - foot).norm(), t)
}

/// Distance between a ray and the closed segment `a..b`.
///
/// Returns `(distance, s)` where `s >= 0` is the ray parameter of the
/// closest approach. Degenerate rays fall back to the point distance.
pub fn distance_ray_to_segment(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> (f64, f64) {
    let v = b - a;
    let w0 = origin - a;
    let ray_sq = direction.norm_squared();
    if ray_sq < 1e-24 {
        return (distance_point_to_segment(origin, a, b), 0.0);
    }
    let seg_sq = v.norm_squared();
    let cross = direction.dot(&v);
    let d0 = direction.dot(&w0);
    let e0 = v.dot(&w0);
    let denom = ray_sq * seg_sq - cross * cross;
    let mut t = if denom.abs() < 1e-24 {
        0.0
    } else {
        ((ray_sq * e0 - cross * d0) / denom).clamp(0.0, 1.0)
    };
    let mut s = (t * cross - d0) / ray_sq;
    if s < 0.0 {
        s = 0.0;
        t = if seg_sq < 1e-24 {
            0.0
        } else {
            (e0 / seg_sq).clamp(0.0, 1.0)
        };
    }
    let p = origin + direction * s;
    let q = a + v * t;
    ((p - q).norm(), s)
}

/// Ray-triangle intersection (Moller-Trumbore).
///
/// Returns the ray parameter `t >= 0` of the hit, or `None` for a miss or a
/// ray parallel to the triangle plane.
pub fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<f64> {
    let ab = b - a;
    let ac = c - a;
    let pvec = direction.cross(&ac);
    let det = ab.dot(&pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&ab);
    let v = direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = ac.dot(&qvec) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Barycentric point-in-triangle test for a point assumed near the
/// triangle plane.
pub fn point_in_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;
    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);
    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < 1e-24 {
        return false;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;
    u >= -1e-9 && v >= -1e-9 && u + v <= 1.0 + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn right_angle_corner() {
        let angle = corner_angle(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(angle, FRAC_PI_2);
    }

    #[test]
    fn line_and_segment_distances() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let p = Point3::new(1.0, 3.0, 0.0);
        assert_relative_eq!(distance_point_to_line(&p, &a, &b), 3.0);
        // Beyond the segment end the clamp kicks in.
        let q = Point3::new(4.0, 0.0, 0.0);
        assert_relative_eq!(distance_point_to_segment(&q, &a, &b), 2.0);
    }

    #[test]
    fn ray_hits_triangle_front() {
        let t = ray_triangle_intersect(
            &Point3::new(0.25, 0.25, 5.0),
            &Vector3::new(0.0, 0.0, -1.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(t, 5.0);
    }

    #[test]
    fn ray_misses_outside_and_behind() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert!(ray_triangle_intersect(
            &Point3::new(2.0, 2.0, 5.0),
            &Vector3::new(0.0, 0.0, -1.0),
            &a,
            &b,
            &c
        )
        .is_none());
        assert!(ray_triangle_intersect(
            &Point3::new(0.25, 0.25, -5.0),
            &Vector3::new(0.0, 0.0, -1.0),
            &a,
            &b,
            &c
        )
        .is_none());
    }

    #[test]
    fn barycentric_containment() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert!(point_in_triangle(&Point3::new(0.2, 0.2, 0.0), &a, &b, &c));
        assert!(!point_in_triangle(&Point3::new(0.8, 0.8, 0.0), &a, &b, &c));
    }

    #[test]
    fn ray_to_segment_clamps_both_ends() {
        let origin = Point3::new(0.5, 2.0, 0.0);
        let down = Vector3::new(0.0, -1.0, 0.0);
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        // Straight over the midspan the ray crosses the segment.
        let (d, s) = distance_ray_to_segment(&origin, &down, &a, &b);
        assert_relative_eq!(d, 0.0);
        assert_relative_eq!(s, 2.0);
        // Past the segment end the clamp reports the end point distance.
        let far = Point3::new(3.0, 2.0, 0.0);
        let (d, _) = distance_ray_to_segment(&far, &down, &a, &b);
        assert_relative_eq!(d, 2.0);
        // A segment behind the origin cannot pull `s` negative.
        let (d, s) = distance_ray_to_segment(&Point3::new(0.5, -1.0, 0.0), &down, &a, &b);
        assert_relative_eq!(d, 1.0);
        assert_relative_eq!(s, 0.0);
    }

    #[test]
    fn ray_distance_reports_parameter() {
        let (d, t) = distance_point_to_ray(
            &Point3::origin(),
            &Vector3::new(1.0, 0.0, 0.0),
            &Point3::new(3.0, 2.0, 0.0),
        );
        assert_relative_eq!(d, 2.0);
        assert_relative_eq!(t, 3.0);
    }
}
