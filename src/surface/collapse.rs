//! Collapsing cage elements.
//!
//! Collapsing undoes refinement of the cage itself: an edge collapse
//! merges its two faces back into one ring, a point collapse dissolves a
//! redundant chain vertex or re-rings the faces around it. Freed elements
//! go through the deferred log; crease flags and curve chains are kept
//! consistent along the way.

use tracing::instrument;

use super::Surface;
use crate::error::{HullError, Result};
use crate::mesh::{Edge, EdgeId, PointId};

impl Surface {
    /// Merge the two faces of an interior control edge into one.
    ///
    /// The merged ring keeps the first face's winding and layer and counts
    /// `n1 + n2 - 2` corners. Fails with [`HullError::EdgeNotCollapsible`]
    /// unless the edge carries exactly two faces.
    #[instrument(skip(self))]
    pub fn collapse_edge(&mut self, edge: EdgeId) -> Result<()> {
        let record = self.store.try_edge(edge)?;
        if !record.is_control_edge() {
            return Err(HullError::topology("only control edges can be collapsed"));
        }
        if record.faces().len() != 2 {
            return Err(HullError::EdgeNotCollapsible {
                faces: record.faces().len(),
            });
        }
        self.invalidate();
        self.store.suppress_deletion(true);
        let result = self.collapse_edge_inner(edge);
        self.store.suppress_deletion(false);
        self.log_counts();
        result
    }

    /// Remove a control point, stitching the surrounding topology closed.
    ///
    /// A point with exactly two edges dissolves into a single edge through
    /// its neighbors. Any other point is removed by re-ringing the faces
    /// around it, one new face per loop of surviving ring edges.
    #[instrument(skip(self))]
    pub fn collapse_point(&mut self, point: PointId) -> Result<()> {
        if !self.store.try_point(point)?.is_control() {
            return Err(HullError::topology("only control points can be collapsed"));
        }
        self.invalidate();
        self.store.suppress_deletion(true);
        let result = self.collapse_point_inner(point);
        self.store.suppress_deletion(false);
        self.log_counts();
        result
    }

    fn collapse_edge_inner(&mut self, edge: EdgeId) -> Result<()> {
        let (start, end, f1, f2) = {
            let e = &self.store.edges[edge];
            (e.start(), e.end(), e.faces()[0], e.faces()[1])
        };
        let ring1 = self.store.faces[f1].points().to_vec();
        let mut ring2 = self.store.faces[f2].points().to_vec();
        let n1 = ring1.len();
        let i1 = (0..n1)
            .find(|&i| {
                let pair = (ring1[i], ring1[(i + 1) % n1]);
                pair == (start, end) || pair == (end, start)
            })
            .ok_or_else(|| HullError::topology("edge endpoints not consecutive in its face"))?;
        // The edge as the first face walks it.
        let (x, y) = (ring1[i1], ring1[(i1 + 1) % n1]);
        if !self.store.faces[f2].has_ordered_pair(y, x) {
            ring2.reverse();
        }
        let n2 = ring2.len();
        let i2 = (0..n2)
            .find(|&i| ring2[i] == y && ring2[(i + 1) % n2] == x)
            .ok_or_else(|| HullError::topology("faces of the edge do not share it"))?;

        let layer = self.store.faces[f1]
            .control_data()
            .map(|d| d.layer)
            .unwrap_or_else(|| self.default_layer());
        let mut merged = Vec::with_capacity(n1 + n2 - 2);
        for k in 0..n1 {
            merged.push(ring1[(i1 + 1 + k) % n1]);
        }
        for k in 0..n2 - 2 {
            merged.push(ring2[(i2 + 2 + k) % n2]);
        }

        let id = self.wire_control_face(merged, layer);
        self.control_faces.push(id);
        self.remove_face_cascade(f1);
        self.remove_face_cascade(f2);
        // The edge lost both faces and went with them. Its endpoints may
        // now be redundant chain vertices.
        for p in [x, y] {
            self.collapse_redundant_chain_vertex(p)?;
        }
        Ok(())
    }

    fn collapse_point_inner(&mut self, point: PointId) -> Result<()> {
        let (edge_count, face_count) = {
            let p = &self.store.points[point];
            (p.edges().len(), p.faces().len())
        };
        if edge_count == 2 && face_count <= 2 {
            self.dissolve_chain_vertex(point)
        } else {
            self.rering_around_point(point)
        }
    }

    /// Collapse `point` when it sits on exactly two edges but still
    /// borders more than one face.
    fn collapse_redundant_chain_vertex(&mut self, point: PointId) -> Result<()> {
        if !self.store.points.contains_key(point) || self.store.point_is_logged(point) {
            return Ok(());
        }
        let record = &self.store.points[point];
        if record.edges().len() == 2 && record.faces().len() > 1 {
            self.collapse_point_inner(point)?;
        }
        Ok(())
    }

    /// Replace a two-edge point by a single edge through its neighbors.
    fn dissolve_chain_vertex(&mut self, point: PointId) -> Result<()> {
        let (e1, e2) = {
            let edges = self.store.points[point].edges();
            (edges[0], edges[1])
        };
        let stray = || HullError::topology("edge does not reach the point it is listed on");
        let a = self.store.edges[e1].other_point(point).ok_or_else(stray)?;
        let b = self.store.edges[e2].other_point(point).ok_or_else(stray)?;
        let crease = self.store.edges[e1].is_crease() || self.store.edges[e2].is_crease();
        let curve1 = self.store.edges[e1].curve();
        let curve2 = self.store.edges[e2].curve();
        let faces = self.store.points[point].faces().to_vec();

        for (e, q) in [(e1, a), (e2, b)] {
            self.store.points[q].remove_edge(e);
            self.store.points[point].remove_edge(e);
            self.control_edges.retain(|&c| c != e);
            self.store.log_edge(e);
        }
        // One edge spans the gap. It exists already when the chain
        // bordered a triangle.
        let merged = match self.store.edge_between(a, b) {
            Some(e) => e,
            None => {
                let e = self.store.edges.insert(Edge::new(a, b, true));
                self.control_edges.push(e);
                self.store.points[a].add_edge(e);
                self.store.points[b].add_edge(e);
                e
            }
        };

        // Drop the point out of the surrounding rings; rings shrunk below
        // three corners die.
        for f in faces {
            self.store.faces[f].remove_point(point);
            self.store.points[point].remove_face(f);
            if self.store.faces[f].len() < 3 {
                self.remove_face_cascade(f);
            } else {
                self.store.edges[merged].add_face(f);
            }
        }

        self.store.set_edge_crease(merged, crease);
        if curve1.is_some() && curve1 == curve2 {
            self.store.edges[merged].curve = curve1;
        }
        for c in [curve1, curve2].into_iter().flatten() {
            if self.store.curves.contains_key(c) {
                self.store.curves[c].remove_point(point);
                self.normalize_curve_after_edit(c);
            }
        }

        if !self.store.point_is_logged(point) {
            self.control_points.retain(|&q| q != point);
            self.store.log_point(point);
        }
        for q in [a, b] {
            if self.store.points.contains_key(q) && !self.store.point_is_logged(q) {
                self.store.refresh_kind(q);
            }
        }
        Ok(())
    }

    /// Remove a point by rebuilding the faces around it from the ring
    /// edges that survive it.
    fn rering_around_point(&mut self, point: PointId) -> Result<()> {
        let faces = self.store.points[point].faces().to_vec();
        let layer = faces
            .first()
            .and_then(|&f| self.store.faces[f].control_data().map(|d| d.layer))
            .unwrap_or_else(|| self.default_layer());
        // Directed ring pairs avoiding the point; following them keeps the
        // surrounding winding in the rebuilt faces.
        let mut pairs: Vec<(PointId, PointId)> = Vec::new();
        for &f in &faces {
            let ring = self.store.faces[f].points();
            let n = ring.len();
            for i in 0..n {
                let (q, r) = (ring[i], ring[(i + 1) % n]);
                if q != point && r != point {
                    pairs.push((q, r));
                }
            }
        }
        let neighbors: Vec<PointId> = self.store.points[point]
            .edges()
            .iter()
            .filter_map(|&e| self.store.edges[e].other_point(point))
            .collect();

        for ring in chain_directed_pairs(pairs) {
            if ring.len() >= 3 {
                let id = self.wire_control_face(ring, layer);
                self.control_faces.push(id);
            }
        }
        for f in faces {
            self.remove_face_cascade(f);
        }
        if !self.store.point_is_logged(point) {
            self.remove_point_cascade(point);
        }
        for q in neighbors {
            self.collapse_redundant_chain_vertex(q)?;
        }
        Ok(())
    }
}

/// Stitch directed pairs into point rings. A run that never returns to
/// its first point is left open; wiring it as a face closes it with a
/// fresh edge.
fn chain_directed_pairs(mut pairs: Vec<(PointId, PointId)>) -> Vec<Vec<PointId>> {
    let mut rings = Vec::new();
    while let Some((a, b)) = pairs.pop() {
        let mut ring = vec![a, b];
        let mut closed = false;
        while !closed {
            let tail = ring[ring.len() - 1];
            let i = match pairs.iter().position(|&(q, _)| q == tail) {
                Some(i) => i,
                None => break,
            };
            let (_, r) = pairs.swap_remove(i);
            if r == ring[0] {
                closed = true;
            } else {
                ring.push(r);
            }
        }
        while !closed {
            let head = ring[0];
            let i = match pairs.iter().position(|&(_, r)| r == head) {
                Some(i) => i,
                None => break,
            };
            let (q, _) = pairs.swap_remove(i);
            ring.insert(0, q);
        }
        rings.push(ring);
    }
    rings
}
