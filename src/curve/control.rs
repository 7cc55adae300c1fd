//! Curves threaded along edges of the control cage.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mesh::{MeshStore, PointId, VertexKind};

use super::Spline;

/// A curve pinned to a chain of control points.
///
/// The curve follows its edges through every subdivision pass: the
/// `subdivided` chain is rewritten each pass so it always traverses points
/// of the current refinement level, with the new edgepoints threaded in
/// between the successors of the old chain. A [`Spline`] through the
/// refined chain is built on demand and cached until the next edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlCurve {
    pub(crate) control_points: Vec<PointId>,
    pub(crate) subdivided: Vec<PointId>,
    #[serde(skip)]
    pub(crate) spline: Option<Spline>,
}

impl ControlCurve {
    pub(crate) fn new(points: Vec<PointId>) -> Self {
        ControlCurve {
            subdivided: points.clone(),
            control_points: points,
            spline: None,
        }
    }

    /// Control points the curve is threaded through, in traversal order.
    #[inline]
    pub fn control_points(&self) -> &[PointId] {
        &self.control_points
    }

    /// Number of control points on the curve.
    #[inline]
    pub fn number_of_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Point chain at the current subdivision level.
    #[inline]
    pub fn subdivided_points(&self) -> &[PointId] {
        &self.subdivided
    }

    /// Whether `point` lies on the control chain.
    #[inline]
    pub fn contains(&self, point: PointId) -> bool {
        self.control_points.contains(&point)
    }

    /// Build a [`Spline`] through the refined chain.
    ///
    /// Corner points always interrupt smoothness. A crease point becomes a
    /// knuckle only when the curve crosses the crease there; when both chain
    /// edges at the point act as creases the curve runs along the crease and
    /// stays smooth through it.
    pub(crate) fn resampled_spline(&self, store: &MeshStore) -> Result<Spline> {
        let chain = &self.subdivided;
        let positions = chain
            .iter()
            .map(|&p| Ok(store.try_point(p)?.position()))
            .collect::<Result<Vec<_>>>()?;
        let mut spline = Spline::with_points(positions);
        for (i, &p) in chain.iter().enumerate() {
            let knuckle = match store.points[p].kind() {
                VertexKind::Corner => true,
                VertexKind::Crease => {
                    let before = i.checked_sub(1).map(|j| chain[j]);
                    let after = chain.get(i + 1).copied();
                    let along_crease = [before, after].into_iter().flatten().all(|q| {
                        store
                            .edge_between(p, q)
                            .is_some_and(|e| store.edges[e].acts_as_crease())
                    });
                    !along_crease
                }
                VertexKind::Regular | VertexKind::Dart => false,
            };
            if knuckle {
                spline.set_knuckle(i, true)?;
            }
        }
        Ok(spline)
    }

    /// Rewind the refined chain back to the control chain.
    pub(crate) fn reset_subdivided(&mut self) {
        self.subdivided = self.control_points.clone();
        self.spline = None;
    }

    pub(crate) fn set_subdivided(&mut self, points: Vec<PointId>) {
        self.subdivided = points;
        self.spline = None;
    }

    /// Index `i` such that the control chain steps from `a` to `b` (in
    /// either direction) between `i` and `i + 1`.
    pub(crate) fn index_of_pair(&self, a: PointId, b: PointId) -> Option<usize> {
        self.control_points.windows(2).position(|pair| {
            (pair[0] == a && pair[1] == b) || (pair[0] == b && pair[1] == a)
        })
    }

    /// Thread `point` into the chain between the adjacent pair `a`, `b`.
    /// Returns `false` when the pair is not consecutive on this curve.
    pub(crate) fn insert_between(&mut self, a: PointId, b: PointId, point: PointId) -> bool {
        match self.index_of_pair(a, b) {
            Some(i) => {
                self.control_points.insert(i + 1, point);
                self.reset_subdivided();
                true
            }
            None => false,
        }
    }

    /// Drop `point` from the chain. Returns `true` when it was present.
    pub(crate) fn remove_point(&mut self, point: PointId) -> bool {
        let before = self.control_points.len();
        self.control_points.retain(|&p| p != point);
        let removed = self.control_points.len() != before;
        if removed {
            self.reset_subdivided();
        }
        removed
    }
}
