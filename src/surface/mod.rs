//! The subdivision surface aggregate.
//!
//! [`Surface`] owns the control cage (points, edges, faces, curves and
//! layers) together with the mesh derived from it by Catmull-Clark style
//! refinement. The cage doubles as the level-0 mesh; every edit drops the
//! derived levels wholesale and bumps a revision counter, and the next
//! query that needs refined data rebuilds to the desired level.
//!
//! # Dirty tracking
//!
//! Mutators call [`Surface::invalidate`] internally, which releases all
//! derived elements and marks the surface dirty. Accessors that need the
//! refined mesh take `&mut self` and rebuild on demand; pure cage queries
//! borrow immutably. External observers poll [`Surface::revision`] to
//! notice edits.

mod analysis;
mod collapse;
mod curvature;
mod delete;
mod edit;
mod grid;
mod intersect;
mod pick;
mod subdivide;

pub use grid::PointGrid;
pub use pick::{PickHit, PickRay};
pub use subdivide::{SubdivisionMode, MAX_SUBDIVISION_LEVEL};

use std::collections::HashSet;

use nalgebra::Point3;
use tracing::debug;

use crate::curve::{ControlCurve, Spline};
use crate::error::{HullError, Result};
use crate::geom::BoundingBox;
use crate::mesh::{CurveId, Edge, EdgeId, Face, FaceId, Layer, LayerId, MeshStore, Point, PointId};

/// A subdivision surface with its control cage.
#[derive(Debug, Clone)]
pub struct Surface {
    pub(crate) store: MeshStore,
    pub(crate) control_points: Vec<PointId>,
    pub(crate) control_edges: Vec<EdgeId>,
    pub(crate) control_faces: Vec<FaceId>,
    pub(crate) control_curves: Vec<CurveId>,
    pub(crate) layers: Vec<LayerId>,
    pub(crate) active_layer: LayerId,
    /// Points of the current refinement level; the cage itself at level 0.
    pub(crate) points: Vec<PointId>,
    /// Edges of the current refinement level.
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) built: bool,
    pub(crate) current_level: usize,
    pub(crate) desired_level: usize,
    pub(crate) mode: SubdivisionMode,
    pub(crate) extents: Option<BoundingBox>,
    pub(crate) gauss: Option<Vec<f64>>,
    pub(crate) revision: u64,
}

impl Surface {
    /// Empty surface with a single default layer.
    pub fn new() -> Self {
        let mut store = MeshStore::new();
        let layer = store.layers.insert(Layer::default());
        Surface {
            store,
            control_points: Vec::new(),
            control_edges: Vec::new(),
            control_faces: Vec::new(),
            control_curves: Vec::new(),
            layers: vec![layer],
            active_layer: layer,
            points: Vec::new(),
            edges: Vec::new(),
            built: false,
            current_level: 0,
            desired_level: 1,
            mode: SubdivisionMode::QuadDominant,
            extents: None,
            gauss: None,
            revision: 0,
        }
    }

    /// Drop the whole model and start over with one default layer.
    pub fn clear(&mut self) {
        self.store.clear();
        let layer = self.store.layers.insert(Layer::default());
        self.control_points.clear();
        self.control_edges.clear();
        self.control_faces.clear();
        self.control_curves.clear();
        self.layers = vec![layer];
        self.active_layer = layer;
        self.points.clear();
        self.edges.clear();
        self.built = false;
        self.current_level = 0;
        self.extents = None;
        self.gauss = None;
        self.touch();
    }

    /// Read access to the element records.
    #[inline]
    pub fn store(&self) -> &MeshStore {
        &self.store
    }

    /// Monotonic edit counter. Changes whenever the surface is mutated.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // --- Dirty tracking ---------------------------------------------------

    /// Whether the derived mesh matches the cage at the desired level.
    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Build or drop the derived mesh explicitly.
    pub fn set_build(&mut self, build: bool) -> Result<()> {
        if build {
            self.rebuild()
        } else {
            self.invalidate();
            Ok(())
        }
    }

    /// Mark the surface dirty, releasing every derived element.
    pub(crate) fn invalidate(&mut self) {
        self.release_derived();
        self.touch();
    }

    /// Discard all derived elements, leaving only the cage.
    fn release_derived(&mut self) {
        self.points.clear();
        self.edges.clear();
        self.store.points.retain(|_, p| p.is_control());
        let cage: HashSet<EdgeId> = self.control_edges.iter().copied().collect();
        self.store.edges.retain(|id, _| cage.contains(&id));
        self.store.faces.retain(|_, f| f.is_control());
        for &f in &self.control_faces {
            if let Some(data) = self.store.faces[f].control_data_mut() {
                data.children.clear();
                data.edges.clear();
                data.bounds = None;
            }
        }
        for curve in self.store.curves.values_mut() {
            curve.reset_subdivided();
        }
        self.current_level = 0;
        self.built = false;
        self.extents = None;
        self.gauss = None;
    }

    // --- Cage queries ------------------------------------------------------

    /// Number of control points.
    #[inline]
    pub fn number_of_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Number of control edges.
    #[inline]
    pub fn number_of_control_edges(&self) -> usize {
        self.control_edges.len()
    }

    /// Number of control faces.
    #[inline]
    pub fn number_of_control_faces(&self) -> usize {
        self.control_faces.len()
    }

    /// Number of control curves.
    #[inline]
    pub fn number_of_control_curves(&self) -> usize {
        self.control_curves.len()
    }

    /// Control point handles in creation order.
    #[inline]
    pub fn control_point_ids(&self) -> &[PointId] {
        &self.control_points
    }

    /// Control edge handles in creation order.
    #[inline]
    pub fn control_edge_ids(&self) -> &[EdgeId] {
        &self.control_edges
    }

    /// Control face handles in creation order.
    #[inline]
    pub fn control_face_ids(&self) -> &[FaceId] {
        &self.control_faces
    }

    /// Control curve handles in creation order.
    #[inline]
    pub fn control_curve_ids(&self) -> &[CurveId] {
        &self.control_curves
    }

    /// Control point handle at `index`.
    pub fn control_point_id(&self, index: usize) -> Result<PointId> {
        self.control_points.get(index).copied().ok_or_else(|| {
            HullError::out_of_bounds("control point", index, self.control_points.len())
        })
    }

    /// Control edge handle at `index`.
    pub fn control_edge_id(&self, index: usize) -> Result<EdgeId> {
        self.control_edges
            .get(index)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("control edge", index, self.control_edges.len()))
    }

    /// Control face handle at `index`.
    pub fn control_face_id(&self, index: usize) -> Result<FaceId> {
        self.control_faces
            .get(index)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("control face", index, self.control_faces.len()))
    }

    /// Control curve handle at `index`.
    pub fn control_curve_id(&self, index: usize) -> Result<CurveId> {
        self.control_curves.get(index).copied().ok_or_else(|| {
            HullError::out_of_bounds("control curve", index, self.control_curves.len())
        })
    }

    /// Position of a control point handle in creation order.
    pub fn index_of_control_point(&self, id: PointId) -> Option<usize> {
        self.control_points.iter().position(|&p| p == id)
    }

    /// Position of a control edge handle in creation order.
    pub fn index_of_control_edge(&self, id: EdgeId) -> Option<usize> {
        self.control_edges.iter().position(|&e| e == id)
    }

    /// Position of a control face handle in creation order.
    pub fn index_of_control_face(&self, id: FaceId) -> Option<usize> {
        self.control_faces.iter().position(|&f| f == id)
    }

    /// Whether an edge joins `a` and `b`.
    pub fn edge_exists(&self, a: PointId, b: PointId) -> bool {
        self.store.edge_between(a, b).is_some()
    }

    // --- Refined mesh queries ----------------------------------------------

    /// Number of points at the current refinement level.
    pub fn number_of_points(&mut self) -> Result<usize> {
        self.rebuild()?;
        Ok(self.points.len())
    }

    /// Number of edges at the current refinement level.
    pub fn number_of_edges(&mut self) -> Result<usize> {
        self.rebuild()?;
        Ok(self.edges.len())
    }

    /// Number of faces at the current refinement level.
    pub fn number_of_faces(&mut self) -> Result<usize> {
        self.rebuild()?;
        Ok(if self.current_level == 0 {
            self.control_faces.len()
        } else {
            self.control_faces
                .iter()
                .map(|&f| {
                    self.store.faces[f]
                        .control_data()
                        .map_or(0, |d| d.children.len())
                })
                .sum()
        })
    }

    /// Point handles at the current refinement level.
    pub fn point_ids(&mut self) -> Result<&[PointId]> {
        self.rebuild()?;
        Ok(&self.points)
    }

    /// Edge handles at the current refinement level.
    pub fn edge_ids(&mut self) -> Result<&[EdgeId]> {
        self.rebuild()?;
        Ok(&self.edges)
    }

    /// Face handles at the current refinement level.
    pub fn face_ids(&mut self) -> Result<Vec<FaceId>> {
        self.rebuild()?;
        Ok(self.current_faces())
    }

    /// Faces of the current refinement level: the cage faces at level 0,
    /// the children of every control face otherwise.
    pub(crate) fn current_faces(&self) -> Vec<FaceId> {
        if self.current_level == 0 {
            self.control_faces.clone()
        } else {
            self.control_faces
                .iter()
                .flat_map(|&f| {
                    self.store.faces[f]
                        .control_data()
                        .map(|d| d.children.clone())
                        .unwrap_or_default()
                })
                .collect()
        }
    }

    /// Axis-aligned bounds over the refined mesh, cached until the next
    /// edit.
    pub fn extents(&mut self) -> Result<BoundingBox> {
        self.rebuild()?;
        if let Some(bounds) = self.extents {
            return Ok(bounds);
        }
        let mut bounds = BoundingBox::empty();
        for &p in &self.points {
            bounds.expand_to_include(&self.store.points[p].position());
        }
        self.extents = Some(bounds);
        Ok(bounds)
    }

    /// Spline through a control curve's refined point chain, cached on the
    /// curve until the next edit.
    ///
    /// Corners and crease crossings on the chain carry knuckles, so the
    /// spline only smooths where the surface itself is smooth.
    pub fn curve_spline(&mut self, curve: CurveId) -> Result<&Spline> {
        self.rebuild()?;
        self.store.try_curve(curve)?;
        if self.store.curves[curve].spline.is_none() {
            let spline = self.store.curves[curve].resampled_spline(&self.store)?;
            self.store.curves[curve].spline = Some(spline);
        }
        self.store.curves[curve]
            .spline
            .as_ref()
            .ok_or(HullError::StaleHandle { what: "curve" })
    }

    // --- Cage construction -------------------------------------------------

    /// Add a free control point.
    pub fn add_control_point(&mut self, position: Point3<f64>) -> PointId {
        let id = self.store.points.insert(Point::control(position));
        self.control_points.push(id);
        self.invalidate();
        id
    }

    /// Add a cage edge between two existing points, or return the edge
    /// already joining them.
    pub fn add_control_edge(&mut self, start: PointId, end: PointId) -> Result<EdgeId> {
        self.store.try_point(start)?;
        self.store.try_point(end)?;
        if start == end {
            return Err(HullError::topology("an edge needs two distinct endpoints"));
        }
        if let Some(existing) = self.store.edge_between(start, end) {
            return Ok(existing);
        }
        let id = self.store.edges.insert(Edge::new(start, end, true));
        self.store.points[start].add_edge(id);
        self.store.points[end].add_edge(id);
        self.store.refresh_kind(start);
        self.store.refresh_kind(end);
        self.control_edges.push(id);
        self.invalidate();
        Ok(id)
    }

    /// Add a cage face over the given point ring, creating any missing
    /// edges along the way.
    ///
    /// The ring must name at least three distinct live points; a face over
    /// the same point set may only exist once. With `layer` unset the face
    /// lands on the active layer.
    pub fn add_control_face(
        &mut self,
        points: &[PointId],
        layer: Option<LayerId>,
    ) -> Result<FaceId> {
        for &p in points {
            self.store.try_point(p)?;
        }
        let layer = match layer {
            Some(l) => {
                self.store.try_layer(l)?;
                l
            }
            None => self.active_layer,
        };
        // Collapse consecutive repeats, including across the wrap.
        let mut ring: Vec<PointId> = Vec::with_capacity(points.len());
        for &p in points {
            if ring.last().copied() != Some(p) {
                ring.push(p);
            }
        }
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(HullError::DegenerateFace { points: ring.len() });
        }
        for (i, &p) in ring.iter().enumerate() {
            if ring[i + 1..].contains(&p) {
                return Err(HullError::topology("face ring visits a point twice"));
            }
        }
        if let Some(&first) = ring.first() {
            let candidates = self.store.points[first].faces.clone();
            for f in candidates {
                let face = &self.store.faces[f];
                if face.len() == ring.len() && ring.iter().all(|p| face.points().contains(p)) {
                    return Err(HullError::DuplicateFace);
                }
            }
        }
        let id = self.wire_control_face(ring, layer);
        self.control_faces.push(id);
        self.invalidate();
        Ok(id)
    }

    /// Insert a cage face record and hook up its adjacency, creating
    /// missing ring edges as cage edges. The ring is taken as given.
    pub(crate) fn wire_control_face(&mut self, points: Vec<PointId>, layer: LayerId) -> FaceId {
        let id = self.store.faces.insert(Face::control(points.clone(), layer));
        let n = points.len();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let edge = match self.store.edge_between(a, b) {
                Some(e) => e,
                None => {
                    let e = self.store.edges.insert(Edge::new(a, b, true));
                    self.control_edges.push(e);
                    e
                }
            };
            self.store.edges[edge].add_face(id);
            self.store.points[a].add_edge(edge);
            self.store.points[b].add_edge(edge);
            self.store.points[a].add_face(id);
        }
        for &p in &points {
            self.store.refresh_kind(p);
        }
        id
    }

    /// Thread a control curve along a connected chain of cage edges.
    ///
    /// The edges are reordered into a path internally; each may carry at
    /// most one curve at a time.
    pub fn add_control_curve(&mut self, edges: &[EdgeId]) -> Result<CurveId> {
        if edges.is_empty() {
            return Err(HullError::EmptyChain);
        }
        for (i, &e) in edges.iter().enumerate() {
            let edge = self.store.try_edge(e)?;
            if !edge.is_control_edge() {
                return Err(HullError::topology("curves bind to cage edges only"));
            }
            if edge.curve().is_some() {
                return Err(HullError::topology("edge already carries a curve"));
            }
            if edges[i + 1..].contains(&e) {
                return Err(HullError::topology("duplicate edge in curve chain"));
            }
        }
        let path = self.chain_to_path(edges)?;
        let id = self.store.curves.insert(ControlCurve::new(path));
        for &e in edges {
            self.store.edges[e].curve = Some(id);
        }
        self.control_curves.push(id);
        self.invalidate();
        Ok(id)
    }

    /// Order a set of edges into a point path. The edges must form a single
    /// open chain.
    fn chain_to_path(&self, edges: &[EdgeId]) -> Result<Vec<PointId>> {
        let first = &self.store.edges[edges[0]];
        if edges.len() == 1 {
            return Ok(vec![first.start(), first.end()]);
        }
        let second = &self.store.edges[edges[1]];
        let shared = [first.start(), first.end()]
            .into_iter()
            .find(|&p| second.has_point(p))
            .ok_or_else(|| HullError::DisconnectedChain {
                details: "first two edges of the chain do not touch".into(),
            })?;
        let mut path = Vec::with_capacity(edges.len() + 1);
        path.push(if shared == first.start() {
            first.end()
        } else {
            first.start()
        });
        path.push(shared);
        for (i, &e) in edges.iter().enumerate().skip(1) {
            let last = *path.last().ok_or(HullError::EmptyChain)?;
            let next = self.store.edges[e].other_point(last).ok_or_else(|| {
                HullError::DisconnectedChain {
                    details: format!("edge {i} does not continue the chain"),
                }
            })?;
            path.push(next);
        }
        Ok(path)
    }

    // --- Cage mutation -----------------------------------------------------

    /// Move a point. Locked control points stay put; moving a derived
    /// point only lasts until the next rebuild.
    pub fn set_point_position(&mut self, point: PointId, position: Point3<f64>) -> Result<()> {
        let p = self
            .store
            .points
            .get_mut(point)
            .ok_or(HullError::StaleHandle { what: "point" })?;
        if p.control_data().is_some_and(|d| d.locked) {
            return Ok(());
        }
        p.position = position;
        if p.is_control() {
            self.invalidate();
        } else {
            self.touch();
        }
        Ok(())
    }

    /// Set an edge's crease flag. Boundary and non-manifold edges keep
    /// behaving as creases regardless.
    pub fn set_edge_crease(&mut self, edge: EdgeId, crease: bool) -> Result<()> {
        self.store.try_edge(edge)?;
        self.store.set_edge_crease(edge, crease);
        self.invalidate();
        Ok(())
    }

    /// Lock or unlock a control point.
    pub fn set_point_locked(&mut self, point: PointId, locked: bool) -> Result<()> {
        let p = self
            .store
            .points
            .get_mut(point)
            .ok_or(HullError::StaleHandle { what: "point" })?;
        let data = p
            .control_data_mut()
            .ok_or_else(|| HullError::topology("derived points carry no lock state"))?;
        data.locked = locked;
        self.touch();
        Ok(())
    }

    /// Select or deselect a control point.
    pub fn set_point_selected(&mut self, point: PointId, selected: bool) -> Result<()> {
        let p = self
            .store
            .points
            .get_mut(point)
            .ok_or(HullError::StaleHandle { what: "point" })?;
        let data = p
            .control_data_mut()
            .ok_or_else(|| HullError::topology("derived points carry no selection state"))?;
        data.selected = selected;
        self.touch();
        Ok(())
    }

    /// Control points currently selected.
    pub fn selected_control_points(&self) -> Vec<PointId> {
        self.control_points
            .iter()
            .copied()
            .filter(|&p| {
                self.store.points[p]
                    .control_data()
                    .is_some_and(|d| d.selected)
            })
            .collect()
    }

    // --- Layers ------------------------------------------------------------

    /// Layer handles in creation order.
    #[inline]
    pub fn layer_ids(&self) -> &[LayerId] {
        &self.layers
    }

    /// Number of layers. Never zero.
    #[inline]
    pub fn number_of_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layer handle at `index`.
    pub fn layer_id(&self, index: usize) -> Result<LayerId> {
        self.layers
            .get(index)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("layer", index, self.layers.len()))
    }

    /// Position of a layer handle in creation order.
    pub fn index_of_layer(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|&l| l == id)
    }

    /// Layer that newly added faces land on.
    #[inline]
    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    /// Change the layer newly added faces land on.
    pub fn set_active_layer(&mut self, layer: LayerId) -> Result<()> {
        self.store.try_layer(layer)?;
        self.active_layer = layer;
        self.touch();
        Ok(())
    }

    /// Create a new layer.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = self.store.layers.insert(Layer::new(name));
        self.layers.push(id);
        self.touch();
        id
    }

    /// Edit a layer's properties in place.
    pub fn update_layer(
        &mut self,
        layer: LayerId,
        update: impl FnOnce(&mut Layer),
    ) -> Result<()> {
        let l = self
            .store
            .layers
            .get_mut(layer)
            .ok_or(HullError::StaleHandle { what: "layer" })?;
        update(l);
        self.touch();
        Ok(())
    }

    /// Move a control face to another layer.
    pub fn set_face_layer(&mut self, face: FaceId, layer: LayerId) -> Result<()> {
        self.store.try_layer(layer)?;
        let f = self
            .store
            .faces
            .get_mut(face)
            .ok_or(HullError::StaleHandle { what: "face" })?;
        let data = f
            .control_data_mut()
            .ok_or_else(|| HullError::topology("derived faces carry no layer"))?;
        data.layer = layer;
        self.touch();
        Ok(())
    }

    /// The layer faces fall back to, the oldest one.
    pub(crate) fn default_layer(&self) -> LayerId {
        self.layers[0]
    }

    /// Whether a control face's layer is visible. Derived faces inherit
    /// from the control face they descend from, which callers resolve
    /// before asking.
    pub(crate) fn face_visible(&self, face: FaceId) -> bool {
        self.store.faces[face]
            .control_data()
            .is_none_or(|d| self.store.layers[d.layer].visible)
    }

    pub(crate) fn log_counts(&self) {
        debug!(
            control_points = self.control_points.len(),
            control_edges = self.control_edges.len(),
            control_faces = self.control_faces.len(),
            curves = self.control_curves.len(),
            "cage changed"
        );
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Closed unit cube, outward winding, six quad faces.
    pub(crate) fn unit_cube() -> Surface {
        let mut surface = Surface::new();
        let corners = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let p: Vec<PointId> = corners
            .iter()
            .map(|&c| surface.add_control_point(Point3::from(c)))
            .collect();
        let rings = [
            [p[0], p[3], p[2], p[1]],
            [p[4], p[5], p[6], p[7]],
            [p[0], p[1], p[5], p[4]],
            [p[1], p[2], p[6], p[5]],
            [p[2], p[3], p[7], p[6]],
            [p[3], p[0], p[4], p[7]],
        ];
        for ring in rings {
            surface
                .add_control_face(&ring, None)
                .unwrap_or_else(|e| panic!("cube face: {e}"));
        }
        surface
    }

    /// Flat open grid of `nx` by `ny` quads in the z = 0 plane.
    pub(crate) fn quad_grid(nx: usize, ny: usize) -> Surface {
        let mut surface = Surface::new();
        let mut ids = Vec::new();
        for j in 0..=ny {
            for i in 0..=nx {
                ids.push(surface.add_control_point(Point3::new(i as f64, j as f64, 0.0)));
            }
        }
        let at = |i: usize, j: usize| ids[j * (nx + 1) + i];
        for j in 0..ny {
            for i in 0..nx {
                surface
                    .add_control_face(&[at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)], None)
                    .unwrap_or_else(|e| panic!("grid face: {e}"));
            }
        }
        surface
    }
}
