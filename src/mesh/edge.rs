//! Edge records.

use serde::{Deserialize, Serialize};

use super::store::{CurveId, FaceId, PointId};

/// An edge between two points.
///
/// Face incidence drives its role: one face means boundary (and the crease
/// flag is forced on), two means interior, more is non-manifold and also
/// forced to crease. Cage edges carry `control_edge` and optionally a
/// back-reference to the control curve threaded along them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub(crate) start: PointId,
    pub(crate) end: PointId,
    pub(crate) faces: Vec<FaceId>,
    pub(crate) crease: bool,
    pub(crate) control_edge: bool,
    pub(crate) curve: Option<CurveId>,
}

impl Edge {
    pub(crate) fn new(start: PointId, end: PointId, control_edge: bool) -> Self {
        Edge {
            start,
            end,
            faces: Vec::new(),
            crease: false,
            control_edge,
            curve: None,
        }
    }

    /// First endpoint.
    #[inline]
    pub fn start(&self) -> PointId {
        self.start
    }

    /// Second endpoint.
    #[inline]
    pub fn end(&self) -> PointId {
        self.end
    }

    /// Incident faces.
    #[inline]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// Whether the edge is tagged as a crease.
    #[inline]
    pub fn is_crease(&self) -> bool {
        self.crease
    }

    /// Whether the edge behaves as a crease during subdivision and point
    /// classification. Boundary and non-manifold edges always do, whatever
    /// their flag says.
    #[inline]
    pub fn acts_as_crease(&self) -> bool {
        self.crease || self.faces.len() != 2
    }

    /// Whether the edge belongs to the control cage.
    #[inline]
    pub fn is_control_edge(&self) -> bool {
        self.control_edge
    }

    /// Whether the edge lies on the mesh boundary (fewer than two faces).
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.faces.len() < 2
    }

    /// Control curve threaded along this edge, if any.
    #[inline]
    pub fn curve(&self) -> Option<CurveId> {
        self.curve
    }

    /// Whether `point` is one of the endpoints.
    #[inline]
    pub fn has_point(&self, point: PointId) -> bool {
        self.start == point || self.end == point
    }

    /// The endpoint opposite to `point`, or `None` if `point` is neither.
    pub fn other_point(&self, point: PointId) -> Option<PointId> {
        if point == self.start {
            Some(self.end)
        } else if point == self.end {
            Some(self.start)
        } else {
            None
        }
    }

    pub(crate) fn add_face(&mut self, face: FaceId) {
        if !self.faces.contains(&face) {
            self.faces.push(face);
        }
    }

    pub(crate) fn remove_face(&mut self, face: FaceId) {
        self.faces.retain(|&f| f != face);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn endpoint_queries() {
        let mut points: SlotMap<PointId, ()> = SlotMap::with_key();
        let a = points.insert(());
        let b = points.insert(());
        let c = points.insert(());
        let edge = Edge::new(a, b, true);
        assert!(edge.has_point(a));
        assert!(!edge.has_point(c));
        assert_eq!(edge.other_point(a), Some(b));
        assert_eq!(edge.other_point(b), Some(a));
        assert_eq!(edge.other_point(c), None);
        assert!(edge.is_boundary());
    }
}
