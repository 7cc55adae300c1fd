//! Ray picking against the control cage.
//!
//! Selection resolves in element order: points beat edges beat faces.
//! A pick returns every control point inside the ray tolerance, nearest
//! first; failing that the nearest control edge; failing that the first
//! control face pierced by the ray. Elements on hidden layers never
//! register.

use std::cmp::Ordering;

use nalgebra::{Point3, Vector3};

use super::Surface;
use crate::geom::{distance_point_to_ray, distance_ray_to_segment, ray_triangle_intersect};
use crate::mesh::{EdgeId, FaceId, PointId};

/// A pick ray in model space.
#[derive(Debug, Clone, Copy)]
pub struct PickRay {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
    /// Largest distance from the ray at which points and edges register.
    pub tolerance: f64,
}

/// One pick candidate with its ranking measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickHit {
    /// A control point and its distance from the ray.
    Point(PointId, f64),
    /// A control edge and its distance from the ray.
    Edge(EdgeId, f64),
    /// A control face and the ray parameter of the hit.
    Face(FaceId, f64),
}

impl Surface {
    /// Cast a pick ray at the control cage.
    pub fn shoot_pick_ray(&self, ray: &PickRay) -> Vec<PickHit> {
        let mut points: Vec<(PointId, f64)> = Vec::new();
        for &p in &self.control_points {
            if !self.point_visible(p) {
                continue;
            }
            let position = self.store.points[p].position();
            let (d, t) = distance_point_to_ray(&ray.origin, &ray.direction, &position);
            if d <= ray.tolerance && t >= 0.0 {
                points.push((p, d));
            }
        }
        if !points.is_empty() {
            points.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            return points
                .into_iter()
                .map(|(p, d)| PickHit::Point(p, d))
                .collect();
        }

        let mut nearest_edge: Option<(EdgeId, f64)> = None;
        for &e in &self.control_edges {
            if !self.edge_visible(e) {
                continue;
            }
            let edge = &self.store.edges[e];
            let a = self.store.points[edge.start()].position();
            let b = self.store.points[edge.end()].position();
            let (d, _) = distance_ray_to_segment(&ray.origin, &ray.direction, &a, &b);
            if d <= ray.tolerance && nearest_edge.is_none_or(|(_, best)| d < best) {
                nearest_edge = Some((e, d));
            }
        }
        if let Some((e, d)) = nearest_edge {
            return vec![PickHit::Edge(e, d)];
        }

        let mut nearest_face: Option<(FaceId, f64)> = None;
        for &f in &self.control_faces {
            if !self.face_visible(f) {
                continue;
            }
            if let Some(t) = self.face_ray_hit(f, ray) {
                if nearest_face.is_none_or(|(_, best)| t < best) {
                    nearest_face = Some((f, t));
                }
            }
        }
        match nearest_face {
            Some((f, t)) => vec![PickHit::Face(f, t)],
            None => Vec::new(),
        }
    }

    /// Nearest ray parameter over the fan triangulation of one face.
    fn face_ray_hit(&self, face: FaceId, ray: &PickRay) -> Option<f64> {
        let ring = self.store.faces[face].points();
        let anchor = self.store.points[ring[0]].position();
        let mut best: Option<f64> = None;
        for i in 1..ring.len().saturating_sub(1) {
            let b = self.store.points[ring[i]].position();
            let c = self.store.points[ring[i + 1]].position();
            if let Some(t) = ray_triangle_intersect(&ray.origin, &ray.direction, &anchor, &b, &c) {
                if best.is_none_or(|bt| t < bt) {
                    best = Some(t);
                }
            }
        }
        best
    }

    fn point_visible(&self, point: PointId) -> bool {
        let faces = self.store.points[point].faces();
        faces.is_empty() || faces.iter().any(|&f| self.face_visible(f))
    }

    fn edge_visible(&self, edge: EdgeId) -> bool {
        let faces = self.store.edges[edge].faces();
        faces.is_empty() || faces.iter().any(|&f| self.face_visible(f))
    }
}
