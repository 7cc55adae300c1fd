//! Plane sections through the mesh.
//!
//! Stations, buttocks and waterlines are all the same operation: cut a
//! set of faces with a plane and chain the per-face chords into section
//! polylines. Crossings on crease edges and crease corners carry over as
//! spline knuckles so a hard chine stays hard in the section.

use nalgebra::Point3;
use tracing::debug;

use super::Surface;
use crate::curve::{join_spline_segments, Spline};
use crate::error::Result;
use crate::geom::Plane;
use crate::mesh::{FaceId, PointId, VertexKind};

/// Crossings closer than this merge into one.
const CROSSING_EPSILON: f64 = 1e-9;
/// Gap tolerance when chaining face chords into polylines.
const SEGMENT_JOIN_ERROR: f64 = 1e-5;

impl Surface {
    /// Intersect a set of faces with a plane, chaining the per-face
    /// chords into section polylines.
    ///
    /// A face contributes a chord for every pair of crossings along its
    /// ring: vertices lying exactly on the plane and strict sign-change
    /// crossings along ring edges. A face that only touches the plane in
    /// a single point contributes nothing.
    pub fn calculate_intersections(
        &self,
        plane: &Plane,
        faces: &[FaceId],
    ) -> Result<Vec<Spline>> {
        let mut segments: Vec<Spline> = Vec::new();
        for &f in faces {
            let ring = self.store.try_face(f)?.points().to_vec();
            let crossings = self.face_crossings(plane, &ring);
            for pair in crossings.chunks(2) {
                if let &[(p, pk), (q, qk)] = pair {
                    if (q - p).norm() < CROSSING_EPSILON {
                        continue;
                    }
                    // A chord running along a shared ring edge shows up
                    // once per face.
                    if segments.iter().any(|s| same_segment(s, &p, &q)) {
                        continue;
                    }
                    let mut segment = Spline::with_points(vec![p, q]);
                    segment.set_knuckle(0, pk)?;
                    segment.set_knuckle(1, qk)?;
                    segments.push(segment);
                }
            }
        }
        join_spline_segments(SEGMENT_JOIN_ERROR, false, &mut segments)?;
        debug!(faces = faces.len(), sections = segments.len(), "plane sections");
        Ok(segments)
    }

    /// Crossings of one face ring with a plane, in cyclic walk order.
    fn face_crossings(&self, plane: &Plane, ring: &[PointId]) -> Vec<(Point3<f64>, bool)> {
        let n = ring.len();
        let dists: Vec<f64> = ring
            .iter()
            .map(|&p| plane.distance(&self.store.points[p].position()))
            .collect();
        let mut out: Vec<(Point3<f64>, bool)> = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            if dists[i] == 0.0 {
                let point = &self.store.points[ring[i]];
                let knuckle = matches!(point.kind(), VertexKind::Crease | VertexKind::Corner);
                push_crossing(&mut out, point.position(), knuckle);
            }
            if dists[i] * dists[j] < 0.0 {
                let t = dists[i] / (dists[i] - dists[j]);
                let a = self.store.points[ring[i]].position();
                let b = self.store.points[ring[j]].position();
                let knuckle = self
                    .store
                    .edge_between(ring[i], ring[j])
                    .is_some_and(|e| self.store.edges[e].acts_as_crease());
                push_crossing(&mut out, a + (b - a) * t, knuckle);
            }
        }
        // The walk is cyclic; the last crossing may duplicate the first.
        if out.len() > 1 && (out[out.len() - 1].0 - out[0].0).norm() < CROSSING_EPSILON {
            out.pop();
        }
        out
    }
}

fn push_crossing(out: &mut Vec<(Point3<f64>, bool)>, point: Point3<f64>, knuckle: bool) {
    if let Some(last) = out.last() {
        if (point - last.0).norm() < CROSSING_EPSILON {
            return;
        }
    }
    out.push((point, knuckle));
}

fn same_segment(segment: &Spline, p: &Point3<f64>, q: &Point3<f64>) -> bool {
    match (segment.first_point(), segment.last_point()) {
        (Some(a), Some(b)) => {
            ((a - p).norm() < CROSSING_EPSILON && (b - q).norm() < CROSSING_EPSILON)
                || ((a - q).norm() < CROSSING_EPSILON && (b - p).norm() < CROSSING_EPSILON)
        }
        _ => false,
    }
}
