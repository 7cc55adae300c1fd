//! Face records.

use serde::{Deserialize, Serialize};

use crate::geom::BoundingBox;

use super::store::{EdgeId, FaceId, LayerId, PointId};

/// Extra state carried only by control-net faces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFaceData {
    /// Layer the face belongs to.
    pub layer: LayerId,
    /// Descendant faces at the current subdivision level. Rebuilt wholesale
    /// by every subdivision run.
    pub(crate) children: Vec<FaceId>,
    /// Descendant interior edges at the current subdivision level.
    pub(crate) edges: Vec<EdgeId>,
    /// Cached bounds over the children, filled lazily.
    pub(crate) bounds: Option<BoundingBox>,
}

impl ControlFaceData {
    pub(crate) fn new(layer: LayerId) -> Self {
        ControlFaceData {
            layer,
            children: Vec::new(),
            edges: Vec::new(),
            bounds: None,
        }
    }

    /// Descendant faces at the current subdivision level.
    #[inline]
    pub fn children(&self) -> &[FaceId] {
        &self.children
    }

    /// Descendant interior edges at the current subdivision level.
    #[inline]
    pub fn interior_edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

/// Tagged extension distinguishing cage faces from derived faces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FaceExt {
    /// Produced by a subdivision pass; discarded on invalidation.
    Derived,
    /// Part of the editable control net.
    Control(ControlFaceData),
}

/// A face: an ordered ring of at least three distinct points whose winding
/// fixes the orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub(crate) points: Vec<PointId>,
    pub(crate) ext: FaceExt,
}

impl Face {
    pub(crate) fn derived(points: Vec<PointId>) -> Self {
        Face {
            points,
            ext: FaceExt::Derived,
        }
    }

    pub(crate) fn control(points: Vec<PointId>, layer: LayerId) -> Self {
        Face {
            points,
            ext: FaceExt::Control(ControlFaceData::new(layer)),
        }
    }

    /// The point ring, in winding order.
    #[inline]
    pub fn points(&self) -> &[PointId] {
        &self.points
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring is empty (only transiently true mid-edit).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether this face belongs to the control net.
    #[inline]
    pub fn is_control(&self) -> bool {
        matches!(self.ext, FaceExt::Control(_))
    }

    /// Control-net state, if this is a control face.
    #[inline]
    pub fn control_data(&self) -> Option<&ControlFaceData> {
        match &self.ext {
            FaceExt::Control(data) => Some(data),
            FaceExt::Derived => None,
        }
    }

    /// Mutable control-net state, if this is a control face.
    #[inline]
    pub fn control_data_mut(&mut self) -> Option<&mut ControlFaceData> {
        match &mut self.ext {
            FaceExt::Control(data) => Some(data),
            FaceExt::Derived => None,
        }
    }

    /// Position of `point` in the ring.
    #[inline]
    pub fn index_of_point(&self, point: PointId) -> Option<usize> {
        self.points.iter().position(|&p| p == point)
    }

    /// The ring successor of the corner at `index`.
    #[inline]
    pub fn next_point(&self, index: usize) -> PointId {
        self.points[(index + 1) % self.points.len()]
    }

    /// The ring predecessor of the corner at `index`.
    #[inline]
    pub fn prev_point(&self, index: usize) -> PointId {
        let n = self.points.len();
        self.points[(index + n - 1) % n]
    }

    /// Whether the ring traverses `a` directly followed by `b`.
    pub fn has_ordered_pair(&self, a: PointId, b: PointId) -> bool {
        let n = self.points.len();
        (0..n).any(|i| self.points[i] == a && self.points[(i + 1) % n] == b)
    }

    pub(crate) fn remove_point(&mut self, point: PointId) {
        self.points.retain(|&p| p != point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ring(n: usize) -> (Vec<PointId>, Face) {
        let mut points: SlotMap<PointId, ()> = SlotMap::with_key();
        let ids: Vec<PointId> = (0..n).map(|_| points.insert(())).collect();
        let face = Face::derived(ids.clone());
        (ids, face)
    }

    #[test]
    fn ring_navigation() {
        let (ids, face) = ring(4);
        assert_eq!(face.len(), 4);
        assert_eq!(face.index_of_point(ids[2]), Some(2));
        assert_eq!(face.next_point(3), ids[0]);
        assert_eq!(face.prev_point(0), ids[3]);
        assert!(face.has_ordered_pair(ids[1], ids[2]));
        assert!(!face.has_ordered_pair(ids[2], ids[1]));
    }

    #[test]
    fn control_extension() {
        let mut layers: SlotMap<LayerId, ()> = SlotMap::with_key();
        let layer = layers.insert(());
        let (_, derived) = ring(3);
        assert!(derived.control_data().is_none());
        let face = Face::control(vec![], layer);
        assert_eq!(face.control_data().unwrap().layer, layer);
    }
}
