//! Structural edits on the cage: splitting, clipping, extruding.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

use super::Surface;
use crate::error::{HullError, Result};
use crate::geom::{Plane, PLANE_EPSILON};
use crate::mesh::{Edge, EdgeId, FaceId, MeshStore, PointId};

impl Surface {
    /// Split a control edge by a new control point at `position`.
    ///
    /// Both faces get the point threaded into their rings; the second half
    /// of the edge inherits the crease flag and any curve back-reference.
    /// Returns the new point.
    pub fn split_edge(&mut self, edge: EdgeId, position: Point3<f64>) -> Result<PointId> {
        if !self.store.try_edge(edge)?.is_control_edge() {
            return Err(HullError::topology("only control edges can be split"));
        }
        self.invalidate();
        let (a, b, faces, curve) = {
            let e = &self.store.edges[edge];
            (e.start(), e.end(), e.faces().to_vec(), e.curve())
        };
        let point = self.add_control_point(position);
        // Shorten the edge to a..point and add the second half.
        self.store.edges[edge].end = point;
        self.store.points[b].remove_edge(edge);
        self.store.points[point].add_edge(edge);
        let second = {
            let template = &self.store.edges[edge];
            let mut e = Edge::new(point, b, template.is_control_edge());
            e.crease = template.is_crease();
            e.curve = curve;
            e.faces = faces.clone();
            e
        };
        let second = self.store.edges.insert(second);
        self.control_edges.push(second);
        self.store.points[point].add_edge(second);
        self.store.points[b].add_edge(second);
        for &f in &faces {
            let face = &mut self.store.faces[f];
            let n = face.len();
            let at = (0..n)
                .find(|&i| {
                    let pair = (face.points()[i], face.points()[(i + 1) % n]);
                    pair == (a, b) || pair == (b, a)
                })
                .ok_or_else(|| HullError::topology("face does not walk the split edge"))?;
            face.points.insert(at + 1, point);
            self.store.points[point].add_face(f);
        }
        if let Some(c) = curve {
            self.store.curves[c].insert_between(a, b, point);
        }
        for p in [a, b, point] {
            self.store.refresh_kind(p);
        }
        Ok(point)
    }

    /// Split a control face along a new edge between two of its ring
    /// points. The points must not be ring neighbors. Returns the
    /// dividing edge; the two halves inherit the face's layer.
    pub fn split_face(&mut self, face: FaceId, p1: PointId, p2: PointId) -> Result<EdgeId> {
        let record = self.store.try_face(face)?;
        if !record.is_control() {
            return Err(HullError::topology("only control faces can be split"));
        }
        let ring = record.points().to_vec();
        let n = ring.len();
        let i = record
            .index_of_point(p1)
            .ok_or_else(|| HullError::topology("split point is not on the face ring"))?;
        let j = record
            .index_of_point(p2)
            .ok_or_else(|| HullError::topology("split point is not on the face ring"))?;
        let gap = (j + n - i) % n;
        if gap < 2 || gap > n - 2 {
            return Err(HullError::topology("split points are ring neighbors"));
        }
        let layer = record
            .control_data()
            .map(|d| d.layer)
            .unwrap_or_else(|| self.default_layer());

        self.invalidate();
        self.store.suppress_deletion(true);
        let mut first = Vec::with_capacity(gap + 1);
        for k in 0..=gap {
            first.push(ring[(i + k) % n]);
        }
        let mut second = Vec::with_capacity(n - gap + 1);
        for k in 0..=(n - gap) {
            second.push(ring[(j + k) % n]);
        }
        let id = self.wire_control_face(first, layer);
        self.control_faces.push(id);
        let id = self.wire_control_face(second, layer);
        self.control_faces.push(id);
        self.remove_face_cascade(face);
        self.store.suppress_deletion(false);
        self.store
            .edge_between(p1, p2)
            .ok_or_else(|| HullError::topology("dividing edge was not created"))
    }

    /// Cut the cage along a plane.
    ///
    /// Every control edge whose endpoints lie strictly on opposite sides
    /// is split at the interpolated crossing. With `add_curves`, faces
    /// holding exactly two of the new points are divided between them and
    /// the dividing edges are chained into new control curves. Returns
    /// the points created on the plane.
    #[instrument(skip(self))]
    pub fn insert_plane(&mut self, plane: &Plane, add_curves: bool) -> Result<Vec<PointId>> {
        let candidates = self.control_edges.clone();
        let mut inserted = Vec::new();
        for e in candidates {
            let (a, b) = {
                let edge = &self.store.edges[e];
                (edge.start(), edge.end())
            };
            let da = plane.distance(&self.store.points[a].position());
            let db = plane.distance(&self.store.points[b].position());
            if (da > PLANE_EPSILON && db < -PLANE_EPSILON)
                || (da < -PLANE_EPSILON && db > PLANE_EPSILON)
            {
                let t = da / (da - db);
                let pa = self.store.points[a].position();
                let pb = self.store.points[b].position();
                inserted.push(self.split_edge(e, pa + (pb - pa) * t)?);
            }
        }
        if inserted.is_empty() {
            return Ok(inserted);
        }
        if add_curves {
            let mut dividers = Vec::new();
            for f in self.control_faces.clone() {
                let on_plane: Vec<PointId> = self.store.faces[f]
                    .points()
                    .iter()
                    .copied()
                    .filter(|p| inserted.contains(p))
                    .collect();
                if let [p1, p2] = on_plane[..] {
                    dividers.push(self.split_face(f, p1, p2)?);
                }
            }
            for chain in chain_edges(&dividers, &self.store) {
                self.add_control_curve(&chain)?;
            }
        }
        debug!(points = inserted.len(), add_curves, "plane inserted");
        Ok(inserted)
    }

    /// Extrude boundary control edges along `direction`.
    ///
    /// Each boundary edge gains a quad wound against its owning face,
    /// built over translated partner points that neighboring extruded
    /// edges share. Non-boundary edges in the input are skipped. Returns
    /// the new outer edges, parallel to the extruded ones.
    #[instrument(skip(self))]
    pub fn extrude_edges(
        &mut self,
        edges: &[EdgeId],
        direction: Vector3<f64>,
    ) -> Result<Vec<EdgeId>> {
        let mut partners: HashMap<PointId, PointId> = HashMap::new();
        let mut outer = Vec::new();
        let mut fresh_edges = Vec::new();
        for &e in edges {
            let record = self.store.try_edge(e)?;
            if !record.is_control_edge() || !record.is_boundary() {
                continue;
            }
            let (a, b) = (record.start(), record.end());
            let owner = record.faces().first().copied();
            let layer = owner
                .and_then(|f| self.store.faces[f].control_data().map(|d| d.layer))
                .unwrap_or_else(|| self.active_layer());
            let ta = self.translated_partner(&mut partners, a, direction);
            let tb = self.translated_partner(&mut partners, b, direction);
            let against_owner = owner
                .map(|f| self.store.faces[f].has_ordered_pair(a, b))
                .unwrap_or(true);
            let ring = if against_owner {
                [b, a, ta, tb]
            } else {
                [a, b, tb, ta]
            };
            self.add_control_face(&ring, Some(layer))?;
            for pair in [(a, ta), (b, tb), (ta, tb)] {
                if let Some(ne) = self.store.edge_between(pair.0, pair.1) {
                    if !fresh_edges.contains(&ne) {
                        fresh_edges.push(ne);
                    }
                }
            }
            if let Some(oe) = self.store.edge_between(ta, tb) {
                outer.push(oe);
            }
        }
        // Boundary status settles only once all quads are in: edges shared
        // by two extrusions are interior, the rest stay creased.
        for e in fresh_edges {
            self.store.set_edge_crease(e, false);
        }
        debug!(extruded = outer.len(), "edges extruded");
        Ok(outer)
    }

    fn translated_partner(
        &mut self,
        partners: &mut HashMap<PointId, PointId>,
        point: PointId,
        direction: Vector3<f64>,
    ) -> PointId {
        match partners.get(&point) {
            Some(&t) => t,
            None => {
                let t = self.add_control_point(self.store.points[point].position() + direction);
                partners.insert(point, t);
                t
            }
        }
    }
}

/// Group edges into connected chains ordered end to end, one per
/// component. Closed loops start at an arbitrary edge.
fn chain_edges(edges: &[EdgeId], store: &MeshStore) -> Vec<Vec<EdgeId>> {
    let mut remaining: Vec<EdgeId> = edges.to_vec();
    let mut chains = Vec::new();
    while let Some(seed) = remaining.pop() {
        let mut chain = vec![seed];
        let (mut head, mut tail) = (store.edges[seed].start(), store.edges[seed].end());
        loop {
            let next = remaining
                .iter()
                .position(|&e| store.edges[e].has_point(tail));
            match next {
                Some(i) => {
                    let e = remaining.swap_remove(i);
                    tail = match store.edges[e].other_point(tail) {
                        Some(p) => p,
                        None => tail,
                    };
                    chain.push(e);
                }
                None => break,
            }
            if tail == head {
                break;
            }
        }
        loop {
            let prev = remaining
                .iter()
                .position(|&e| store.edges[e].has_point(head));
            match prev {
                Some(i) => {
                    let e = remaining.swap_remove(i);
                    head = match store.edges[e].other_point(head) {
                        Some(p) => p,
                        None => head,
                    };
                    chain.insert(0, e);
                }
                None => break,
            }
        }
        chains.push(chain);
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{quad_grid, unit_cube};
    use super::*;
    use crate::mesh::VertexKind;
    use approx::assert_relative_eq;

    #[test]
    fn edge_split_threads_point_into_rings() {
        let mut grid = quad_grid(1, 1);
        let a = grid.control_point_id(0).unwrap();
        let b = grid.control_point_id(1).unwrap();
        let edge = grid.store().edge_between(a, b).unwrap();

        let mid = grid.split_edge(edge, Point3::new(0.5, 0.0, 0.0)).unwrap();

        assert_eq!(grid.number_of_control_points(), 5);
        assert_eq!(grid.number_of_control_edges(), 5);
        assert_eq!(grid.number_of_control_faces(), 1);
        let face = grid.control_face_id(0).unwrap();
        assert_eq!(grid.store().faces[face].len(), 5);
        assert!(grid.store().faces[face].has_ordered_pair(a, mid));
        assert!(grid.store().faces[face].has_ordered_pair(mid, b));
        // Two boundary halves over the lone face pin the new point.
        assert_eq!(grid.store().points[mid].kind(), VertexKind::Corner);
        let second = grid.store().edge_between(mid, b).unwrap();
        assert!(grid.store().edges[second].is_control_edge());
    }

    #[test]
    fn edge_split_updates_the_curve_chain() {
        let mut grid = quad_grid(2, 1);
        let bottom: Vec<_> = (0..3).map(|i| grid.control_point_id(i).unwrap()).collect();
        let edges: Vec<_> = bottom
            .windows(2)
            .map(|pair| grid.store().edge_between(pair[0], pair[1]).unwrap())
            .collect();
        let curve = grid.add_control_curve(&edges).unwrap();

        let mid = grid
            .split_edge(edges[0], Point3::new(0.5, 0.0, 0.0))
            .unwrap();

        let chain = grid.store().curves[curve].control_points().to_vec();
        assert_eq!(chain, vec![bottom[0], mid, bottom[1], bottom[2]]);
        let second = grid.store().edge_between(mid, bottom[1]).unwrap();
        assert_eq!(grid.store().edges[second].curve(), Some(curve));
    }

    #[test]
    fn face_split_divides_along_the_diagonal() {
        let mut grid = quad_grid(1, 1);
        let face = grid.control_face_id(0).unwrap();
        let p0 = grid.control_point_id(0).unwrap();
        let p1 = grid.control_point_id(1).unwrap();
        let p3 = grid.control_point_id(3).unwrap();

        assert!(grid.split_face(face, p0, p1).is_err());
        let divider = grid.split_face(face, p0, p3).unwrap();

        assert_eq!(grid.number_of_control_faces(), 2);
        assert_eq!(grid.number_of_control_edges(), 5);
        assert_eq!(grid.store().edges[divider].faces().len(), 2);
        assert!(!grid.store().edges[divider].is_boundary());
        for &f in grid.control_face_ids() {
            assert_eq!(grid.store().faces[f].len(), 3);
        }
        assert!(grid.store().try_face(face).is_err());
    }

    #[test]
    fn plane_cut_splits_edges_and_chains_a_curve() {
        let mut grid = quad_grid(2, 1);
        let plane = Plane::from_point_normal(&Point3::new(0.75, 0.0, 0.0), &Vector3::x());

        let inserted = grid.insert_plane(&plane, true).unwrap();

        assert_eq!(inserted.len(), 2);
        for &p in &inserted {
            assert_relative_eq!(grid.store().points[p].position().x, 0.75);
        }
        assert_eq!(grid.number_of_control_faces(), 3);
        assert_eq!(grid.number_of_control_curves(), 1);
        let curve = grid.control_curve_id(0).unwrap();
        let chain = grid.store().curves[curve].control_points().to_vec();
        assert_eq!(chain.len(), 2);
        assert!(chain.contains(&inserted[0]) && chain.contains(&inserted[1]));
        let divider = grid.store().edge_between(chain[0], chain[1]).unwrap();
        assert_eq!(grid.store().edges[divider].curve(), Some(curve));
    }

    #[test]
    fn plane_cut_through_a_cube_chains_a_closed_curve() {
        let mut cube = unit_cube();
        let plane = Plane::from_point_normal(&Point3::new(0.0, 0.0, 0.5), &Vector3::z());

        // Four vertical edges cross, four side faces divide; a failed
        // division must surface as an error, not as a gap in the loop.
        let inserted = cube.insert_plane(&plane, true).unwrap();

        assert_eq!(inserted.len(), 4);
        for &p in &inserted {
            assert_relative_eq!(cube.store().points[p].position().z, 0.5);
        }
        assert_eq!(cube.number_of_control_faces(), 10);
        assert_eq!(cube.number_of_control_curves(), 1);
        let curve = cube.control_curve_id(0).unwrap();
        let chain = cube.store().curves[curve].control_points().to_vec();
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.first(), chain.last());
    }

    #[test]
    fn plane_missing_the_cage_inserts_nothing() {
        let mut grid = quad_grid(1, 1);
        let plane = Plane::from_point_normal(&Point3::new(5.0, 0.0, 0.0), &Vector3::x());
        let before = grid.number_of_control_points();
        let inserted = grid.insert_plane(&plane, true).unwrap();
        assert!(inserted.is_empty());
        assert_eq!(grid.number_of_control_points(), before);
        assert_eq!(grid.number_of_control_curves(), 0);
    }

    #[test]
    fn extrusion_builds_quads_over_shared_partners() {
        let mut grid = quad_grid(2, 1);
        let bottom: Vec<_> = (0..3).map(|i| grid.control_point_id(i).unwrap()).collect();
        let edges: Vec<_> = bottom
            .windows(2)
            .map(|pair| grid.store().edge_between(pair[0], pair[1]).unwrap())
            .collect();

        let outer = grid
            .extrude_edges(&edges, Vector3::new(0.0, -1.0, 0.0))
            .unwrap();

        assert_eq!(outer.len(), 2);
        assert_eq!(grid.number_of_control_points(), 9);
        assert_eq!(grid.number_of_control_faces(), 4);
        assert_eq!(grid.number_of_control_edges(), 12);
        // The extruded edges turned interior, the new rim is creased.
        for &e in &edges {
            assert!(!grid.store().edges[e].is_boundary());
        }
        for &e in &outer {
            assert!(grid.store().edges[e].is_boundary());
            assert!(grid.store().edges[e].is_crease());
        }
        // The shared upright between the two new quads is interior.
        let shared_base = bottom[1];
        let partner = grid.store().points[shared_base]
            .edges()
            .iter()
            .copied()
            .filter_map(|e| grid.store().edges[e].other_point(shared_base))
            .find(|&p| {
                let pos = grid.store().points[p].position();
                pos.y < -0.5
            })
            .unwrap();
        let upright = grid.store().edge_between(shared_base, partner).unwrap();
        assert_eq!(grid.store().edges[upright].faces().len(), 2);
        assert!(!grid.store().edges[upright].is_crease());
        // Skipping interior edges leaves the cage alone.
        let interior = grid
            .store()
            .edge_between(bottom[1], grid.control_point_id(4).unwrap())
            .unwrap();
        let before = grid.number_of_control_faces();
        let outer = grid
            .extrude_edges(&[interior], Vector3::new(0.0, -1.0, 0.0))
            .unwrap();
        assert!(outer.is_empty());
        assert_eq!(grid.number_of_control_faces(), before);
    }
}
