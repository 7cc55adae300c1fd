//! Point records and vertex classification.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::store::{EdgeId, FaceId};

/// Smoothness classification of a point, derived from its incident crease
/// edges: 0 creases is `Regular`, 1 is `Dart`, 2 is `Crease`, more is
/// `Corner`.
///
/// The classification selects the averaging and limit-point rules during
/// subdivision; boundary edges count as creases, so boundary points come
/// out `Crease` or `Corner` without special cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexKind {
    /// Smooth interior point.
    Regular,
    /// One crease ends here; smooth rules still apply.
    Dart,
    /// Lies on a crease (or boundary) curve.
    Crease,
    /// Fixed point where three or more creases meet.
    Corner,
}

impl VertexKind {
    /// Classification for a point with `creases` incident crease edges.
    pub fn from_crease_count(creases: usize) -> Self {
        match creases {
            0 => VertexKind::Regular,
            1 => VertexKind::Dart,
            2 => VertexKind::Crease,
            _ => VertexKind::Corner,
        }
    }

    /// Whether the smooth (regular/dart) averaging branch applies.
    #[inline]
    pub fn is_smooth(&self) -> bool {
        matches!(self, VertexKind::Regular | VertexKind::Dart)
    }
}

/// Extra state carried only by control-net points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPointData {
    /// Locked points refuse interactive moves.
    pub locked: bool,
    /// Membership in the current selection set.
    pub selected: bool,
}

/// Tagged extension distinguishing cage points from derived points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointExt {
    /// Produced by a subdivision pass; discarded on invalidation.
    Derived,
    /// Part of the editable control net.
    Control(ControlPointData),
}

/// A mesh point: position, adjacency, classification, and the control
/// extension when it belongs to the cage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub(crate) position: Point3<f64>,
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) faces: Vec<FaceId>,
    pub(crate) kind: VertexKind,
    pub(crate) ext: PointExt,
}

impl Point {
    /// New derived point at a position.
    pub(crate) fn derived(position: Point3<f64>) -> Self {
        Point {
            position,
            edges: Vec::new(),
            faces: Vec::new(),
            kind: VertexKind::Regular,
            ext: PointExt::Derived,
        }
    }

    /// New control point at a position.
    pub(crate) fn control(position: Point3<f64>) -> Self {
        Point {
            ext: PointExt::Control(ControlPointData::default()),
            ..Self::derived(position)
        }
    }

    /// Position of the point.
    #[inline]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Smoothness classification.
    #[inline]
    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    /// Incident edges, unordered.
    #[inline]
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Incident faces, unordered.
    #[inline]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// Whether this point belongs to the control net.
    #[inline]
    pub fn is_control(&self) -> bool {
        matches!(self.ext, PointExt::Control(_))
    }

    /// Control-net state, if this is a control point.
    #[inline]
    pub fn control_data(&self) -> Option<&ControlPointData> {
        match &self.ext {
            PointExt::Control(data) => Some(data),
            PointExt::Derived => None,
        }
    }

    /// Mutable control-net state, if this is a control point.
    #[inline]
    pub fn control_data_mut(&mut self) -> Option<&mut ControlPointData> {
        match &mut self.ext {
            PointExt::Control(data) => Some(data),
            PointExt::Derived => None,
        }
    }

    pub(crate) fn add_edge(&mut self, edge: EdgeId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeId) {
        self.edges.retain(|&e| e != edge);
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

    #[test]
    fn classification_from_crease_count() {
        assert_eq!(VertexKind::from_crease_count(0), VertexKind::Regular);
        assert_eq!(VertexKind::from_crease_count(1), VertexKind::Dart);
        assert_eq!(VertexKind::from_crease_count(2), VertexKind::Crease);
        assert_eq!(VertexKind::from_crease_count(3), VertexKind::Corner);
        assert_eq!(VertexKind::from_crease_count(7), VertexKind::Corner);
        assert!(VertexKind::Dart.is_smooth());
        assert!(!VertexKind::Crease.is_smooth());
    }

    #[test]
    fn control_extension_access() {
        let mut p = Point::control(Point3::origin());
        assert!(p.is_control());
        p.control_data_mut().unwrap().locked = true;
        assert!(p.control_data().unwrap().locked);

        let d = Point::derived(Point3::origin());
        assert!(d.control_data().is_none());
    }

    #[test]
    fn adjacency_is_duplicate_free() {
        let mut p = Point::derived(Point3::origin());
        let e = EdgeId::default();
        p.add_edge(e);
        p.add_edge(e);
        assert_eq!(p.edges().len(), 1);
        p.remove_edge(e);
        assert!(p.edges().is_empty());
    }
}
