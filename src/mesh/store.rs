//! Generational arenas for mesh elements.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::curve::ControlCurve;
use crate::error::{HullError, Result};

use super::{Edge, Face, Layer, Point, VertexKind};

new_key_type! {
    /// Handle to a [`Point`].
    pub struct PointId;
    /// Handle to an [`Edge`].
    pub struct EdgeId;
    /// Handle to a [`Face`].
    pub struct FaceId;
    /// Handle to a [`Layer`].
    pub struct LayerId;
    /// Handle to a [`ControlCurve`].
    pub struct CurveId;
}

/// Elements unlinked from the surface but not yet released.
///
/// Editing operations unlink an element first and enqueue its id here, so
/// later steps of the same edit can still dereference it; the slots are
/// only reclaimed by [`MeshStore::flush_deleted`] once suppression has
/// unwound.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeletionLog {
    points: Vec<PointId>,
    edges: Vec<EdgeId>,
    faces: Vec<FaceId>,
    curves: Vec<CurveId>,
    suppress: u32,
}

/// Arena storage for every mesh element kind.
///
/// All live points, edges, faces, layers and curves (control and derived
/// alike) sit in [`SlotMap`]s here. Keys are generational: once a slot is
/// reused, old handles to it stop resolving, which the `try_*` accessors
/// report as [`HullError::StaleHandle`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshStore {
    pub(crate) points: SlotMap<PointId, Point>,
    pub(crate) edges: SlotMap<EdgeId, Edge>,
    pub(crate) faces: SlotMap<FaceId, Face>,
    pub(crate) layers: SlotMap<LayerId, Layer>,
    pub(crate) curves: SlotMap<CurveId, ControlCurve>,
    #[serde(skip)]
    pub(crate) deleted: DeletionLog,
}

impl MeshStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every element. Handles issued before the call stop resolving.
    pub fn clear(&mut self) {
        self.points.clear();
        self.edges.clear();
        self.faces.clear();
        self.layers.clear();
        self.curves.clear();
        self.deleted = DeletionLog::default();
    }

    // --- Lookups ---------------------------------------------------------

    /// Point record, `None` when the handle is stale.
    #[inline]
    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.get(id)
    }

    /// Edge record, `None` when the handle is stale.
    #[inline]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Face record, `None` when the handle is stale.
    #[inline]
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    /// Layer record, `None` when the handle is stale.
    #[inline]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Curve record, `None` when the handle is stale.
    #[inline]
    pub fn curve(&self, id: CurveId) -> Option<&ControlCurve> {
        self.curves.get(id)
    }

    /// Checked point lookup.
    pub fn try_point(&self, id: PointId) -> Result<&Point> {
        self.points
            .get(id)
            .ok_or(HullError::StaleHandle { what: "point" })
    }

    /// Checked edge lookup.
    pub fn try_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges
            .get(id)
            .ok_or(HullError::StaleHandle { what: "edge" })
    }

    /// Checked face lookup.
    pub fn try_face(&self, id: FaceId) -> Result<&Face> {
        self.faces
            .get(id)
            .ok_or(HullError::StaleHandle { what: "face" })
    }

    /// Checked layer lookup.
    pub fn try_layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers
            .get(id)
            .ok_or(HullError::StaleHandle { what: "layer" })
    }

    /// Checked curve lookup.
    pub fn try_curve(&self, id: CurveId) -> Result<&ControlCurve> {
        self.curves
            .get(id)
            .ok_or(HullError::StaleHandle { what: "curve" })
    }

    // --- Topology helpers ------------------------------------------------

    /// The edge joining `a` and `b`, if one exists.
    ///
    /// Scans the incident-edge list of the lower-degree endpoint, so the
    /// cost is O(min degree).
    pub fn edge_between(&self, a: PointId, b: PointId) -> Option<EdgeId> {
        let (pa, pb) = (self.points.get(a)?, self.points.get(b)?);
        let (scanned, other) = if pa.edges.len() <= pb.edges.len() {
            (&pa.edges, b)
        } else {
            (&pb.edges, a)
        };
        scanned
            .iter()
            .copied()
            .find(|&e| self.edges.get(e).is_some_and(|edge| edge.has_point(other)))
    }

    /// Number of incident edges behaving as creases, boundary and
    /// non-manifold edges included.
    pub(crate) fn crease_count(&self, point: PointId) -> usize {
        self.points[point]
            .edges
            .iter()
            .filter(|&&e| self.edges[e].acts_as_crease())
            .count()
    }

    /// Re-derive a point's classification from its incident crease edges
    /// and face count.
    pub(crate) fn refresh_kind(&mut self, point: PointId) {
        let creases = self.crease_count(point);
        let mut kind = VertexKind::from_crease_count(creases);
        // Two creases meeting over a single face form a cage corner; the
        // point must hold its position through refinement.
        if kind == VertexKind::Crease && self.points[point].faces.len() == 1 {
            kind = VertexKind::Corner;
        }
        self.points[point].kind = kind;
    }

    /// Set an edge's crease flag, honoring the forced cases (boundary and
    /// non-manifold edges stay creased), and reclassify both endpoints.
    pub(crate) fn set_edge_crease(&mut self, edge: EdgeId, value: bool) {
        let forced = self.edges[edge].faces.len() != 2;
        let value = value || forced;
        let (start, end) = {
            let e = &mut self.edges[edge];
            if e.crease == value {
                return;
            }
            e.crease = value;
            (e.start, e.end)
        };
        self.refresh_kind(start);
        self.refresh_kind(end);
    }

    // --- Deferred deletion -----------------------------------------------

    /// Nest or unwind deletion batching. Unwinding to zero flushes.
    pub fn suppress_deletion(&mut self, on: bool) {
        if on {
            self.deleted.suppress += 1;
        } else {
            self.deleted.suppress = self.deleted.suppress.saturating_sub(1);
            if self.deleted.suppress == 0 {
                self.flush_deleted();
            }
        }
    }

    /// Release every logged element unless deletion is suppressed.
    pub fn flush_deleted(&mut self) {
        if self.deleted.suppress > 0 {
            return;
        }
        for id in self.deleted.faces.drain(..) {
            self.faces.remove(id);
        }
        for id in self.deleted.edges.drain(..) {
            self.edges.remove(id);
        }
        for id in self.deleted.points.drain(..) {
            self.points.remove(id);
        }
        for id in self.deleted.curves.drain(..) {
            self.curves.remove(id);
        }
    }

    /// Number of elements awaiting release.
    pub fn pending_deletions(&self) -> usize {
        self.deleted.points.len()
            + self.deleted.edges.len()
            + self.deleted.faces.len()
            + self.deleted.curves.len()
    }

    pub(crate) fn log_point(&mut self, id: PointId) {
        self.deleted.points.push(id);
    }

    pub(crate) fn log_edge(&mut self, id: EdgeId) {
        self.deleted.edges.push(id);
    }

    pub(crate) fn log_face(&mut self, id: FaceId) {
        self.deleted.faces.push(id);
    }

    pub(crate) fn log_curve(&mut self, id: CurveId) {
        self.deleted.curves.push(id);
    }

    pub(crate) fn point_is_logged(&self, id: PointId) -> bool {
        self.deleted.points.contains(&id)
    }

    pub(crate) fn edge_is_logged(&self, id: EdgeId) -> bool {
        self.deleted.edges.contains(&id)
    }

    pub(crate) fn face_is_logged(&self, id: FaceId) -> bool {
        self.deleted.faces.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn stale_handles_are_detected() {
        let mut store = MeshStore::new();
        let id = store.points.insert(Point::control(Point3::origin()));
        assert!(store.try_point(id).is_ok());
        store.points.remove(id);
        assert!(matches!(
            store.try_point(id),
            Err(HullError::StaleHandle { what: "point" })
        ));
        // The slot may be reused; the old handle still fails.
        let _fresh = store.points.insert(Point::control(Point3::origin()));
        assert!(store.try_point(id).is_err());
    }

    #[test]
    fn edge_between_scans_min_degree() {
        let mut store = MeshStore::new();
        let a = store.points.insert(Point::control(Point3::origin()));
        let b = store
            .points
            .insert(Point::control(Point3::new(1.0, 0.0, 0.0)));
        let c = store
            .points
            .insert(Point::control(Point3::new(2.0, 0.0, 0.0)));
        let e = store.edges.insert(Edge::new(a, b, true));
        store.points[a].add_edge(e);
        store.points[b].add_edge(e);
        assert_eq!(store.edge_between(a, b), Some(e));
        assert_eq!(store.edge_between(b, a), Some(e));
        assert_eq!(store.edge_between(a, c), None);
    }

    #[test]
    fn deletion_log_flushes_when_unsuppressed() {
        let mut store = MeshStore::new();
        let id = store.points.insert(Point::control(Point3::origin()));
        store.suppress_deletion(true);
        store.suppress_deletion(true);
        store.log_point(id);
        store.flush_deleted();
        assert!(store.point(id).is_some(), "suppressed flush must not free");
        store.suppress_deletion(false);
        assert_eq!(store.pending_deletions(), 1);
        store.suppress_deletion(false);
        assert!(store.point(id).is_none());
        assert_eq!(store.pending_deletions(), 0);
    }

    #[test]
    fn crease_flag_reclassifies_endpoints() {
        let mut store = MeshStore::new();
        let a = store.points.insert(Point::control(Point3::origin()));
        let b = store
            .points
            .insert(Point::control(Point3::new(1.0, 0.0, 0.0)));
        let e = store.edges.insert(Edge::new(a, b, true));
        store.points[a].add_edge(e);
        store.points[b].add_edge(e);
        // No faces: boundary, so the crease flag is forced on regardless.
        store.set_edge_crease(e, false);
        assert!(store.edges[e].crease);
        assert_eq!(store.points[a].kind(), VertexKind::Dart);
    }
}
