//! Deleting cage elements.
//!
//! Deletion cascades along the adjacency: a face releases ring edges left
//! without any face, an edge takes its faces with it and splits curves
//! threaded across it, a point takes its edges. The cascade unlinks
//! elements immediately but releases their slots through the deferred log,
//! so later steps of the same edit can still read records they have
//! already disowned.

use super::Surface;
use crate::curve::ControlCurve;
use crate::error::{HullError, Result};
use crate::mesh::{CurveId, EdgeId, FaceId, LayerId, PointId};

impl Surface {
    /// Delete a control point together with every incident edge and face.
    pub fn delete_control_point(&mut self, point: PointId) -> Result<()> {
        if !self.store.try_point(point)?.is_control() {
            return Err(HullError::topology("only control points can be deleted"));
        }
        self.invalidate();
        self.store.suppress_deletion(true);
        self.remove_point_cascade(point);
        self.store.suppress_deletion(false);
        self.log_counts();
        Ok(())
    }

    /// Delete a control edge along with its faces. Curves threaded across
    /// the edge are split at the gap; endpoints left with no references
    /// are released.
    pub fn delete_control_edge(&mut self, edge: EdgeId) -> Result<()> {
        if !self.store.try_edge(edge)?.is_control_edge() {
            return Err(HullError::topology("only control edges can be deleted"));
        }
        self.invalidate();
        self.store.suppress_deletion(true);
        self.remove_edge_cascade(edge);
        self.store.suppress_deletion(false);
        self.log_counts();
        Ok(())
    }

    /// Delete a control face. Ring edges that kept other faces survive and
    /// become boundary creases where only one face remains.
    pub fn delete_control_face(&mut self, face: FaceId) -> Result<()> {
        if !self.store.try_face(face)?.is_control() {
            return Err(HullError::topology("only control faces can be deleted"));
        }
        self.invalidate();
        self.store.suppress_deletion(true);
        self.remove_face_cascade(face);
        self.store.suppress_deletion(false);
        self.log_counts();
        Ok(())
    }

    /// Delete a control curve, clearing the back-references its edges
    /// carry. The mesh itself is untouched.
    pub fn delete_control_curve(&mut self, curve: CurveId) -> Result<()> {
        self.store.try_curve(curve)?;
        self.invalidate();
        self.unbind_curve_edges(curve);
        self.control_curves.retain(|&c| c != curve);
        self.store.log_curve(curve);
        self.store.flush_deleted();
        Ok(())
    }

    /// Delete a layer, moving its faces to the default layer. The last
    /// layer cannot be deleted.
    pub fn delete_layer(&mut self, layer: LayerId) -> Result<()> {
        self.store.try_layer(layer)?;
        if self.layers.len() == 1 {
            return Err(HullError::topology("the last layer cannot be deleted"));
        }
        let fallback = if layer == self.layers[0] {
            self.layers[1]
        } else {
            self.layers[0]
        };
        for &f in &self.control_faces {
            if let Some(data) = self.store.faces[f].control_data_mut() {
                if data.layer == layer {
                    data.layer = fallback;
                }
            }
        }
        if self.active_layer == layer {
            self.active_layer = fallback;
        }
        self.layers.retain(|&l| l != layer);
        self.store.layers.remove(layer);
        self.touch();
        Ok(())
    }

    // --- Cascade internals --------------------------------------------------
    //
    // These run inside a suppressed region so unlinked records stay
    // readable until the public operation unwinds. Re-entry on an element
    // already in the log is a silent no-op.

    pub(crate) fn remove_face_cascade(&mut self, face: FaceId) {
        if !self.store.faces.contains_key(face) || self.store.face_is_logged(face) {
            return;
        }
        let ring = self.store.faces[face].points().to_vec();
        let n = ring.len();
        for i in 0..n {
            self.store.points[ring[i]].remove_face(face);
            if let Some(e) = self.store.edge_between(ring[i], ring[(i + 1) % n]) {
                self.store.edges[e].remove_face(face);
                if self.store.edges[e].faces().len() == 1 {
                    // The edge became boundary.
                    self.store.set_edge_crease(e, true);
                }
            }
        }
        self.control_faces.retain(|&f| f != face);
        self.store.log_face(face);
        // Ring edges that lost their last face go with the face.
        for i in 0..n {
            if let Some(e) = self.store.edge_between(ring[i], ring[(i + 1) % n]) {
                if self.store.edges[e].faces().is_empty() {
                    self.remove_edge_cascade(e);
                }
            }
        }
        for &p in &ring {
            if self.store.points.contains_key(p) && !self.store.point_is_logged(p) {
                self.store.refresh_kind(p);
            }
        }
    }

    pub(crate) fn remove_edge_cascade(&mut self, edge: EdgeId) {
        if !self.store.edges.contains_key(edge) || self.store.edge_is_logged(edge) {
            return;
        }
        let (start, end, curve, faces) = {
            let e = &self.store.edges[edge];
            (e.start(), e.end(), e.curve(), e.faces().to_vec())
        };
        // Unlink from the endpoints first so the face cascade below cannot
        // rediscover the edge as a faceless ring edge.
        self.store.points[start].remove_edge(edge);
        self.store.points[end].remove_edge(edge);
        for f in faces {
            self.remove_face_cascade(f);
        }
        self.control_edges.retain(|&e| e != edge);
        self.store.log_edge(edge);
        if let Some(c) = curve {
            if self.store.curves.contains_key(c) {
                self.normalize_curve_after_edit(c);
            }
        }
        for p in [start, end] {
            if self.store.point_is_logged(p) {
                continue;
            }
            let record = &self.store.points[p];
            if record.edges().is_empty() && record.faces().is_empty() {
                self.control_points.retain(|&q| q != p);
                self.store.log_point(p);
            } else {
                self.store.refresh_kind(p);
            }
        }
    }

    pub(crate) fn remove_point_cascade(&mut self, point: PointId) {
        if self.store.point_is_logged(point) {
            return;
        }
        for e in self.store.points[point].edges().to_vec() {
            self.remove_edge_cascade(e);
        }
        // Faces reach a point through two ring edges, so none survive the
        // edge sweep. The point itself may still be standing when it had
        // no edges at all.
        if !self.store.point_is_logged(point) {
            self.control_points.retain(|&q| q != point);
            self.store.log_point(point);
        }
    }

    /// Re-thread a curve whose chain lost edges, keeping the longest
    /// prefix run under the old id and spawning a new curve per later run.
    /// A curve left without any intact pair is deleted.
    pub(crate) fn normalize_curve_after_edit(&mut self, curve: CurveId) {
        let chain = self.store.curves[curve].control_points().to_vec();
        let mut runs: Vec<Vec<PointId>> = Vec::new();
        let mut current: Vec<PointId> = Vec::new();
        if let Some(&head) = chain.first() {
            current.push(head);
        }
        for pair in chain.windows(2) {
            if self.store.edge_between(pair[0], pair[1]).is_some() {
                current.push(pair[1]);
            } else {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                }
                current = vec![pair[1]];
            }
        }
        if current.len() >= 2 {
            runs.push(current);
        }
        match runs.split_first() {
            None => {
                self.control_curves.retain(|&c| c != curve);
                self.store.log_curve(curve);
            }
            Some((first, rest)) => {
                let c = &mut self.store.curves[curve];
                c.control_points = first.clone();
                c.reset_subdivided();
                for run in rest {
                    let id = self.store.curves.insert(ControlCurve::new(run.clone()));
                    self.control_curves.push(id);
                    self.bind_curve_edges(id);
                }
            }
        }
    }

    /// Point every edge along the curve's chain back at it.
    pub(crate) fn bind_curve_edges(&mut self, curve: CurveId) {
        let chain = self.store.curves[curve].control_points().to_vec();
        for pair in chain.windows(2) {
            if let Some(e) = self.store.edge_between(pair[0], pair[1]) {
                self.store.edges[e].curve = Some(curve);
            }
        }
    }

    /// Clear the back-reference on every edge along the curve's chain.
    pub(crate) fn unbind_curve_edges(&mut self, curve: CurveId) {
        let chain = self.store.curves[curve].control_points().to_vec();
        for pair in chain.windows(2) {
            if let Some(e) = self.store.edge_between(pair[0], pair[1]) {
                let record = &mut self.store.edges[e];
                if record.curve == Some(curve) {
                    record.curve = None;
                }
            }
        }
    }
}
