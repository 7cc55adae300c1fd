//! Interpolating splines over 3D polylines.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{HullError, Result};
use crate::geom::{distance_point_to_line, Plane};

/// Finite-difference step used by curvature sampling.
const CURVATURE_STEP: f64 = 1e-3;
/// Fragments sampled along the curve by plane intersection.
const INTERSECT_FRAGMENTS: usize = 100;
/// Crossings closer than this in parameter collapse into one.
const PARAMETER_EPSILON: f64 = 1e-6;
/// Weight pinning endpoints and knuckles during simplification.
const PIN_WEIGHT: f64 = 1e10;

/// A crossing of a spline with a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneCrossing {
    /// Location of the crossing.
    pub point: Point3<f64>,
    /// Curve parameter of the crossing, in `0..=1`.
    pub parameter: f64,
}

/// Derived interpolation state; dropped whenever the polyline changes.
#[derive(Debug, Clone)]
struct SplineCache {
    /// Chord-length parameters normalized to `0..=1`.
    parameters: Vec<f64>,
    /// Second-derivative moments per point, one vector for all three axes.
    moments: Vec<Vector3<f64>>,
    /// Unnormalized polyline length.
    total_length: f64,
}

/// An interpolating cubic spline through an ordered 3D point list.
///
/// Points marked as knuckles interrupt smoothness: the curve passes through
/// them with zero second derivative on both sides, so a fully knuckled
/// spline degenerates to its polyline. End conditions are natural (zero end
/// moments). Interpolation state is built lazily and invalidated by every
/// mutation, so evaluating accessors take `&mut self`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spline {
    points: Vec<Point3<f64>>,
    knuckles: Vec<bool>,
    #[serde(skip)]
    cache: Option<SplineCache>,
}

impl Spline {
    /// Empty spline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spline through the given points, none of them knuckled.
    pub fn with_points(points: Vec<Point3<f64>>) -> Self {
        let knuckles = vec![false; points.len()];
        Spline {
            points,
            knuckles,
            cache: None,
        }
    }

    // --- Polyline access -------------------------------------------------

    /// Number of points.
    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    /// Whether the spline holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point at `index`.
    pub fn point(&self, index: usize) -> Result<Point3<f64>> {
        self.points
            .get(index)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("spline point", index, self.points.len()))
    }

    /// The knuckle flag at `index`.
    pub fn knuckle(&self, index: usize) -> Result<bool> {
        self.knuckles
            .get(index)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("spline point", index, self.points.len()))
    }

    /// First point, if any.
    #[inline]
    pub fn first_point(&self) -> Option<Point3<f64>> {
        self.points.first().copied()
    }

    /// Last point, if any.
    #[inline]
    pub fn last_point(&self) -> Option<Point3<f64>> {
        self.points.last().copied()
    }

    /// Whether the polyline returns to its start.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) if self.points.len() > 2 => (b - a).norm() < 1e-9,
            _ => false,
        }
    }

    // --- Mutation --------------------------------------------------------

    /// Append a point.
    pub fn add(&mut self, point: Point3<f64>) {
        self.points.push(point);
        self.knuckles.push(false);
        self.invalidate();
    }

    /// Insert a point before `index` (`index == len` appends).
    pub fn insert(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        if index > self.points.len() {
            return Err(HullError::out_of_bounds(
                "spline point",
                index,
                self.points.len(),
            ));
        }
        self.points.insert(index, point);
        self.knuckles.insert(index, false);
        self.invalidate();
        Ok(())
    }

    /// Remove the point at `index`.
    pub fn delete_point(&mut self, index: usize) -> Result<()> {
        if index >= self.points.len() {
            return Err(HullError::out_of_bounds(
                "spline point",
                index,
                self.points.len(),
            ));
        }
        self.points.remove(index);
        self.knuckles.remove(index);
        self.invalidate();
        Ok(())
    }

    /// Move the point at `index`.
    pub fn set_point(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        match self.points.get_mut(index) {
            Some(p) => {
                *p = point;
                self.invalidate();
                Ok(())
            }
            None => Err(HullError::out_of_bounds(
                "spline point",
                index,
                self.points.len(),
            )),
        }
    }

    /// Set the knuckle flag at `index`.
    pub fn set_knuckle(&mut self, index: usize, knuckle: bool) -> Result<()> {
        match self.knuckles.get_mut(index) {
            Some(k) => {
                *k = knuckle;
                self.invalidate();
                Ok(())
            }
            None => Err(HullError::out_of_bounds(
                "spline point",
                index,
                self.points.len(),
            )),
        }
    }

    /// Reverse the traversal direction in place.
    pub fn invert_direction(&mut self) {
        self.points.reverse();
        self.knuckles.reverse();
        self.invalidate();
    }

    /// Splice another spline's points in before `index`.
    ///
    /// `invert` reverses the inserted sequence first. With `duplicate`
    /// false the first inserted point is dropped as the shared boundary
    /// point; its knuckle flag is ORed into the point just before the
    /// insertion position. Knuckle flags splice along with the points.
    pub fn insert_spline(
        &mut self,
        index: usize,
        invert: bool,
        duplicate: bool,
        other: &Spline,
    ) -> Result<()> {
        if index > self.points.len() {
            return Err(HullError::out_of_bounds(
                "spline point",
                index,
                self.points.len(),
            ));
        }
        let mut points = other.points.clone();
        let mut knuckles = other.knuckles.clone();
        if invert {
            points.reverse();
            knuckles.reverse();
        }
        if !duplicate && !points.is_empty() {
            points.remove(0);
            let dropped = knuckles.remove(0);
            if dropped && index > 0 {
                self.knuckles[index - 1] = true;
            }
        }
        self.points.splice(index..index, points);
        self.knuckles.splice(index..index, knuckles);
        self.invalidate();
        Ok(())
    }

    // --- Interpolation ---------------------------------------------------

    /// Unnormalized chord length of the polyline.
    pub fn total_length(&mut self) -> f64 {
        if self.cache.is_none() {
            self.cache = Some(self.build_cache());
        }
        self.cache.as_ref().map_or(0.0, |c| c.total_length)
    }

    /// Chord-length parameter of the point at `index`, in `0..=1`.
    pub fn parameter(&mut self, index: usize) -> Result<f64> {
        let len = self.points.len();
        if index >= len {
            return Err(HullError::out_of_bounds("spline point", index, len));
        }
        if self.cache.is_none() {
            self.cache = Some(self.build_cache());
        }
        Ok(self.cache.as_ref().map_or(0.0, |c| c.parameters[index]))
    }

    /// Evaluate the curve at parameter `t` (clamped to `0..=1`).
    pub fn value(&mut self, t: f64) -> Point3<f64> {
        match self.points.len() {
            0 => return Point3::origin(),
            1 => return self.points[0],
            _ => {}
        }
        if self.cache.is_none() {
            self.cache = Some(self.build_cache());
        }
        let cache = match self.cache.as_ref() {
            Some(cache) => cache,
            None => return self.points[0],
        };
        let t = t.clamp(0.0, 1.0);

        // Bracket the segment containing t.
        let mut lo = 0;
        let mut hi = cache.parameters.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if cache.parameters[mid] > t {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let h = cache.parameters[hi] - cache.parameters[lo];
        if h < 1e-12 {
            return self.points[lo];
        }
        let a = (cache.parameters[hi] - t) / h;
        let b = (t - cache.parameters[lo]) / h;
        let cubic = (cache.moments[lo] * (a * a * a - a) + cache.moments[hi] * (b * b * b - b))
            * (h * h / 6.0);
        Point3::from(self.points[lo].coords * a + self.points[hi].coords * b + cubic)
    }

    /// Curvature magnitude at parameter `t`.
    pub fn curvature(&mut self, t: f64) -> f64 {
        self.curvature_and_normal(t).0
    }

    /// Curvature magnitude and curvature normal at parameter `t`.
    ///
    /// Both derive from symmetric finite differences with a fixed step; the
    /// sampling stencil shifts inward near the ends so it stays inside the
    /// parameter range.
    pub fn curvature_and_normal(&mut self, t: f64) -> (f64, Vector3<f64>) {
        let h = CURVATURE_STEP;
        let c = t.clamp(0.0, 1.0).clamp(h, 1.0 - h);
        let before = self.value(c - h);
        let at = self.value(c);
        let after = self.value(c + h);

        let vel = (after - before) / (2.0 * h);
        let acc = (before.coords - at.coords * 2.0 + after.coords) / (h * h);
        let speed2 = vel.norm_squared();
        if speed2 < 1e-12 {
            return (0.0, Vector3::zeros());
        }
        let kappa = vel.cross(&acc).norm() / speed2.powf(1.5);
        let normal = acc * speed2 - vel * vel.dot(&acc);
        let n = normal.norm();
        if n < 1e-12 {
            (kappa, Vector3::zeros())
        } else {
            (kappa, normal / n)
        }
    }

    /// Remove interior points that contribute less than `tolerance`.
    ///
    /// Endpoints and knuckles are pinned with a huge weight and never
    /// removed; every other point is weighted by its perpendicular
    /// deviation from the chord through its neighbors, scaled by the chord
    /// length so that long nearly-collinear spans are penalized. Points are
    /// removed lowest-weight first until the minimum reaches `tolerance`,
    /// which makes the operation idempotent for a fixed tolerance.
    pub fn simplify(&mut self, tolerance: f64) {
        if self.points.len() <= 2 {
            return;
        }
        loop {
            let mut min_weight = f64::INFINITY;
            let mut min_index = 0;
            for i in 1..self.points.len() - 1 {
                let w = self.point_weight(i);
                if w < min_weight {
                    min_weight = w;
                    min_index = i;
                }
            }
            if min_weight >= tolerance {
                break;
            }
            self.points.remove(min_index);
            self.knuckles.remove(min_index);
        }
        self.invalidate();
    }

    fn point_weight(&self, index: usize) -> f64 {
        if index == 0 || index + 1 == self.points.len() || self.knuckles[index] {
            return PIN_WEIGHT;
        }
        let prev = self.points[index - 1];
        let next = self.points[index + 1];
        let chord = (next - prev).norm();
        if chord < 1e-5 {
            return 0.0;
        }
        let deviation = distance_point_to_line(&self.points[index], &prev, &next);
        deviation * deviation * chord
    }

    /// Intersect the curve with a plane.
    ///
    /// Samples a fixed number of fragments; samples landing exactly on the
    /// plane are recorded as crossings, strict sign changes between samples
    /// are recorded at the linear interpolation of the two sample points.
    /// A crossing within [`PARAMETER_EPSILON`] of the previous one is
    /// dropped as a duplicate.
    pub fn intersect_plane(&mut self, plane: &Plane) -> Vec<PlaneCrossing> {
        let mut out: Vec<PlaneCrossing> = Vec::new();
        if self.points.is_empty() {
            return out;
        }
        let push = |out: &mut Vec<PlaneCrossing>, point: Point3<f64>, parameter: f64| {
            if out
                .last()
                .is_none_or(|c| (parameter - c.parameter).abs() >= PARAMETER_EPSILON)
            {
                out.push(PlaneCrossing { point, parameter });
            }
        };

        let mut prev_t = 0.0;
        let mut prev_p = self.value(0.0);
        let mut prev_d = plane.distance(&prev_p);
        if prev_d == 0.0 {
            push(&mut out, prev_p, 0.0);
        }
        for i in 1..=INTERSECT_FRAGMENTS {
            let t = i as f64 / INTERSECT_FRAGMENTS as f64;
            let p = self.value(t);
            let d = plane.distance(&p);
            if d == 0.0 {
                push(&mut out, p, t);
            } else if prev_d != 0.0 && (d < 0.0) != (prev_d < 0.0) {
                let frac = prev_d / (prev_d - d);
                let point = prev_p + (p - prev_p) * frac;
                push(&mut out, point, prev_t + frac * (t - prev_t));
            }
            prev_t = t;
            prev_p = p;
            prev_d = d;
        }
        out
    }

    // --- Cache -----------------------------------------------------------

    #[inline]
    fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Chord-length parameters plus the tridiagonal natural-cubic solve for
    /// the second-derivative moments. Knuckled points and degenerate
    /// parameter triples force their moments to zero, which decouples the
    /// solve on either side of them.
    fn build_cache(&self) -> SplineCache {
        let n = self.points.len();
        let mut parameters = vec![0.0; n];
        let mut total_length = 0.0;
        for i in 1..n {
            total_length += (self.points[i] - self.points[i - 1]).norm();
            parameters[i] = total_length;
        }
        if n > 1 {
            if total_length < 1e-12 {
                for (i, p) in parameters.iter_mut().enumerate() {
                    *p = i as f64 / (n - 1) as f64;
                }
            } else {
                for p in parameters.iter_mut() {
                    *p /= total_length;
                }
            }
        }

        let mut moments = vec![Vector3::zeros(); n];
        if n > 2 {
            let mut coeff = vec![0.0; n];
            let mut rhs = vec![Vector3::zeros(); n];
            for i in 1..n - 1 {
                let h0 = parameters[i] - parameters[i - 1];
                let h1 = parameters[i + 1] - parameters[i];
                let span = parameters[i + 1] - parameters[i - 1];
                if self.knuckles[i] || h0 < 1e-12 || h1 < 1e-12 || span < 1e-12 {
                    // Zero moment here; both neighbors see a natural end.
                    coeff[i] = 0.0;
                    rhs[i] = Vector3::zeros();
                    continue;
                }
                let sig = h0 / span;
                let p = sig * coeff[i - 1] + 2.0;
                coeff[i] = (sig - 1.0) / p;
                let d1 = (self.points[i + 1] - self.points[i]) / h1;
                let d0 = (self.points[i] - self.points[i - 1]) / h0;
                rhs[i] = ((d1 - d0) * (6.0 / span) - rhs[i - 1] * sig) / p;
            }
            for i in (1..n - 1).rev() {
                moments[i] = moments[i + 1] * coeff[i] + rhs[i];
            }
        }

        SplineCache {
            parameters,
            moments,
            total_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn arch() -> Spline {
        Spline::with_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ])
    }

    /// The U scenario: three unit segments with every point knuckled.
    fn knuckled_u() -> Spline {
        let mut s = Spline::with_points(vec![
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]);
        for i in 0..4 {
            s.set_knuckle(i, true).unwrap();
        }
        s
    }

    #[test]
    fn parameters_follow_chord_length() {
        let mut s = Spline::with_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ]);
        assert_relative_eq!(s.total_length(), 4.0);
        assert_relative_eq!(s.parameter(0).unwrap(), 0.0);
        assert_relative_eq!(s.parameter(1).unwrap(), 0.75);
        assert_relative_eq!(s.parameter(2).unwrap(), 1.0);
    }

    #[test]
    fn coincident_points_fall_back_to_uniform_parameters() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let mut s = Spline::with_points(vec![p, p, p]);
        assert_relative_eq!(s.parameter(1).unwrap(), 0.5);
        assert_relative_eq!((s.value(0.7) - p).norm(), 0.0);
    }

    #[test]
    fn value_reproduces_knots_exactly() {
        let mut s = arch();
        s.add(Point3::new(3.0, 2.0, 1.0));
        for i in 0..s.number_of_points() {
            let t = s.parameter(i).unwrap();
            let p = s.point(i).unwrap();
            assert_relative_eq!((s.value(t) - p).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn natural_end_conditions_assumed() {
        // End moments are pinned to zero (natural ends), so curvature dies
        // off toward the endpoints of a symmetric arch while the analytic
        // center value is reproduced.
        let mut s = arch();
        assert_relative_eq!(s.curvature(0.5), 3.0, epsilon = 1e-2);
        assert!(s.curvature(0.001) < 0.01);
        assert!(s.curvature(0.999) < 0.01);
    }

    #[test]
    fn curvature_normal_points_into_the_bend() {
        let mut s = arch();
        let (kappa, normal) = s.curvature_and_normal(0.5);
        assert!(kappa > 0.0);
        assert!(normal.dot(&Vector3::new(0.0, -1.0, 0.0)) > 0.99);
    }

    #[test]
    fn knuckle_degenerates_to_polyline() {
        let mut s = arch();
        s.set_knuckle(1, true).unwrap();
        let v = s.value(0.25);
        assert_relative_eq!(v.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(v.y, 0.5, epsilon = 1e-12);
        assert!(s.curvature(0.25) < 1e-9);
    }

    #[test]
    fn u_plane_crossings_mid_height() {
        let mut s = knuckled_u();
        let plane = Plane::from_point_normal(&Point3::new(0.0, 0.5, 0.0), &Vector3::y());
        let hits = s.intersect_plane(&plane);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!((hits[0].point - Point3::new(0.0, 0.5, 0.0)).norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!((hits[1].point - Point3::new(1.0, 0.5, 0.0)).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn u_plane_coincident_with_bottom() {
        let mut s = knuckled_u();
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::y());
        let hits = s.intersect_plane(&plane);
        assert!(!hits.is_empty());
        for hit in hits {
            assert_relative_eq!(hit.point.y, 0.0, epsilon = 1e-12);
            assert_relative_eq!(hit.point.z, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn u_plane_through_endpoints() {
        let mut s = knuckled_u();
        let plane = Plane::from_point_normal(&Point3::new(0.0, 1.0, 0.0), &Vector3::y());
        let hits = s.intersect_plane(&plane);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!((hits[0].point - Point3::new(0.0, 1.0, 0.0)).norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!((hits[1].point - Point3::new(1.0, 1.0, 0.0)).norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(hits[0].parameter, 0.0);
        assert_relative_eq!(hits[1].parameter, 1.0);
    }

    #[test]
    fn u_plane_vertical_single_crossing() {
        let mut s = knuckled_u();
        let plane = Plane::from_point_normal(&Point3::new(0.5, 0.0, 0.0), &Vector3::x());
        let hits = s.intersect_plane(&plane);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!((hits[0].point - Point3::new(0.5, 0.0, 0.0)).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn simplify_is_idempotent_and_preserves_pins() {
        let mut s = Spline::new();
        for i in 0..=10 {
            // Near-collinear run with one genuine kink at x = 5.
            let x = i as f64;
            let y = if i == 5 { 1.0 } else { 0.001 * x };
            s.add(Point3::new(x, y, 0.0));
        }
        s.set_knuckle(5, true).unwrap();
        s.simplify(1e-3);
        let after_first = s.number_of_points();
        assert!(after_first < 11);
        // The kink and both endpoints survive.
        assert_relative_eq!(s.point(0).unwrap().x, 0.0);
        assert!((0..after_first).any(|i| s.knuckle(i).unwrap()));
        assert_relative_eq!(s.point(after_first - 1).unwrap().x, 10.0);
        s.simplify(1e-3);
        assert_eq!(s.number_of_points(), after_first);
    }

    #[test]
    fn insert_spline_merges_shared_point() {
        let mut a = Spline::with_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ]);
        let mut b = Spline::with_points(vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]);
        b.set_knuckle(0, true).unwrap();
        let n = a.number_of_points();
        a.insert_spline(n, false, false, &b).unwrap();
        assert_eq!(a.number_of_points(), 3);
        assert_relative_eq!(a.point(2).unwrap().x, 2.0);
        // The dropped boundary flag lands on the junction point.
        assert!(a.knuckle(1).unwrap());
    }

    #[test]
    fn invert_direction_reverses_everything() {
        let mut s = knuckled_u();
        s.set_knuckle(0, false).unwrap();
        s.invert_direction();
        assert_relative_eq!(s.point(0).unwrap().x, 1.0);
        assert!(!s.knuckle(3).unwrap());
    }

    #[test]
    fn index_misuse_is_reported() {
        let s = arch();
        assert!(matches!(
            s.point(17),
            Err(HullError::IndexOutOfBounds { index: 17, .. })
        ));
        let mut s = arch();
        assert!(s.set_knuckle(3, true).is_err());
        assert!(s.parameter(3).is_err());
    }
}
