//! Catmull-Clark style refinement passes.
//!
//! A pass runs in five steps over the current level: facepoints,
//! edgepoints, vertex successors, child topology, then one global
//! averaging sweep over the freshly created points. Control elements are
//! never repositioned; each pass reads one level and writes the next, and
//! the previous derived level is released once its successor exists.

use std::collections::{HashMap, HashSet};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{HullError, Result};
use crate::mesh::{CurveId, Edge, EdgeId, Face, FaceId, Point, PointId, VertexKind};

use super::Surface;

/// Deepest refinement level a surface will build to.
pub const MAX_SUBDIVISION_LEVEL: usize = 4;

/// How refinement treats triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubdivisionMode {
    /// Every face splits into one quad per corner, triangles included.
    QuadDominant,
    /// Triangles split into four triangles; facepoints are skipped for
    /// them and edgepoints average over the remaining incident faces.
    TrianglePreserving,
}

/// Lookup tables shared by the steps of one pass.
struct PassMaps {
    facepoints: HashMap<FaceId, PointId>,
    edgepoints: HashMap<EdgeId, PointId>,
    successors: HashMap<PointId, PointId>,
}

/// Attributes a freshly created child edge starts with.
#[derive(Clone, Copy)]
struct ChildEdgeSeed {
    crease: bool,
    control: bool,
    curve: Option<CurveId>,
    interior: bool,
}

impl ChildEdgeSeed {
    /// Seed for a spoke or centre edge, lying inside `control_parent`'s
    /// region by construction.
    fn inner(control_parent: bool) -> Self {
        ChildEdgeSeed {
            crease: false,
            control: control_parent,
            curve: None,
            interior: true,
        }
    }
}

/// Per-ring-position description of a parent edge.
#[derive(Clone, Copy)]
struct ParentEdge {
    seed: ChildEdgeSeed,
    edgepoint: PointId,
}

/// Where one control face's pass output collects.
struct FaceSink<'a> {
    children: &'a mut Vec<FaceId>,
    interior: &'a mut Vec<EdgeId>,
    new_edges: &'a mut Vec<EdgeId>,
}

impl Surface {
    /// Refinement level the surface builds to on demand.
    #[inline]
    pub fn desired_subdivision_level(&self) -> usize {
        self.desired_level
    }

    /// Change the target refinement level, clamped to
    /// [`MAX_SUBDIVISION_LEVEL`].
    pub fn set_desired_subdivision_level(&mut self, level: usize) {
        let level = level.min(MAX_SUBDIVISION_LEVEL);
        if level != self.desired_level {
            self.desired_level = level;
            self.invalidate();
        }
    }

    /// Level of the mesh currently held, zero when only the cage exists.
    #[inline]
    pub fn current_subdivision_level(&self) -> usize {
        self.current_level
    }

    /// Triangle handling of the refinement passes.
    #[inline]
    pub fn subdivision_mode(&self) -> SubdivisionMode {
        self.mode
    }

    /// Switch triangle handling. Drops the derived mesh.
    pub fn set_subdivision_mode(&mut self, mode: SubdivisionMode) {
        if mode != self.mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    /// Bring the derived mesh up to the desired level. Cheap when the
    /// surface is already built.
    #[instrument(skip(self))]
    pub fn rebuild(&mut self) -> Result<()> {
        if self.built {
            return Ok(());
        }
        match self.build_levels() {
            Ok(()) => {
                self.built = true;
                info!(
                    level = self.current_level,
                    points = self.points.len(),
                    edges = self.edges.len(),
                    "surface rebuilt"
                );
                Ok(())
            }
            Err(e) => {
                // Leave no half-built level behind.
                self.release_derived();
                Err(e)
            }
        }
    }

    fn build_levels(&mut self) -> Result<()> {
        self.points = self.control_points.clone();
        self.edges = self.control_edges.clone();
        self.current_level = 0;
        while self.current_level < self.desired_level {
            self.subdivide_pass()?;
        }
        Ok(())
    }

    /// Refine the current level once.
    #[instrument(skip(self), fields(level = self.current_level))]
    fn subdivide_pass(&mut self) -> Result<()> {
        let old_faces = self.current_faces();
        let old_points = std::mem::take(&mut self.points);
        let old_edges = std::mem::take(&mut self.edges);

        let mut maps = PassMaps {
            facepoints: HashMap::with_capacity(old_faces.len()),
            edgepoints: HashMap::with_capacity(old_edges.len()),
            successors: HashMap::with_capacity(old_points.len()),
        };

        // Facepoints: face centroids. Triangles keep no facepoint in
        // triangle-preserving mode.
        for &f in &old_faces {
            let centroid = {
                let face = &self.store.faces[f];
                if self.mode == SubdivisionMode::TrianglePreserving && face.len() == 3 {
                    None
                } else {
                    let mut sum = Vector3::zeros();
                    for &p in face.points() {
                        sum += self.store.points[p].position().coords;
                    }
                    Some(Point3::from(sum / face.len() as f64))
                }
            };
            if let Some(centroid) = centroid {
                maps.facepoints
                    .insert(f, self.store.points.insert(Point::derived(centroid)));
            }
        }

        // Edgepoints: crease edges keep their midpoint, smooth edges blend
        // in the facepoints available on their incident faces.
        for &e in &old_edges {
            let (position, kind) = {
                let edge = &self.store.edges[e];
                let a = self.store.points[edge.start()].position();
                let b = self.store.points[edge.end()].position();
                if edge.acts_as_crease() {
                    (Point3::from((a.coords + b.coords) * 0.5), VertexKind::Crease)
                } else {
                    let mut sum = a.coords + b.coords;
                    let mut count = 2.0;
                    for &f in edge.faces() {
                        if let Some(&fp) = maps.facepoints.get(&f) {
                            sum += self.store.points[fp].position().coords;
                            count += 1.0;
                        }
                    }
                    (Point3::from(sum / count), VertexKind::Regular)
                }
            };
            let mut point = Point::derived(position);
            point.kind = kind;
            maps.edgepoints.insert(e, self.store.points.insert(point));
        }

        // Vertex successors keep position and classification; averaging
        // moves them afterwards.
        for &p in &old_points {
            let (position, kind) = {
                let point = &self.store.points[p];
                (point.position(), point.kind())
            };
            let mut point = Point::derived(position);
            point.kind = kind;
            maps.successors.insert(p, self.store.points.insert(point));
        }

        // Child topology, grouped under the owning control face.
        let control_faces = self.control_faces.clone();
        let mut new_edges: Vec<EdgeId> = Vec::new();
        for &cf in &control_faces {
            let (parents, interior_prev) = {
                let data = self.store.faces[cf].control_data();
                if self.current_level == 0 {
                    (vec![cf], HashSet::new())
                } else {
                    (
                        data.map(|d| d.children.clone()).unwrap_or_default(),
                        data.map(|d| d.edges.iter().copied().collect())
                            .unwrap_or_default(),
                    )
                }
            };
            let mut children = Vec::with_capacity(parents.len() * 4);
            let mut interior = Vec::new();
            for &parent in &parents {
                let mut sink = FaceSink {
                    children: &mut children,
                    interior: &mut interior,
                    new_edges: &mut new_edges,
                };
                self.subdivide_face(parent, &interior_prev, &maps, &mut sink)?;
            }
            if let Some(data) = self.store.faces[cf].control_data_mut() {
                data.children = children;
                data.edges = interior;
                data.bounds = None;
            }
        }

        // Thread curves through the refined mesh while the old level is
        // still resolvable.
        let curve_ids = self.control_curves.clone();
        for cid in curve_ids {
            let chain = self.store.curves[cid].subdivided_points().to_vec();
            if chain.len() < 2 {
                continue;
            }
            let mut refined = Vec::with_capacity(chain.len() * 2);
            for (i, &p) in chain.iter().enumerate() {
                let successor = maps
                    .successors
                    .get(&p)
                    .copied()
                    .ok_or_else(|| HullError::topology("curve chain left the mesh"))?;
                refined.push(successor);
                if i + 1 < chain.len() {
                    if let Some(e) = self.store.edge_between(p, chain[i + 1]) {
                        if let Some(&ep) = maps.edgepoints.get(&e) {
                            refined.push(ep);
                        }
                    }
                }
            }
            self.store.curves[cid].set_subdivided(refined);
        }

        // New level's point list: successors, then edgepoints, then
        // facepoints, in parent order.
        let mut level_points =
            Vec::with_capacity(old_points.len() + old_edges.len() + maps.facepoints.len());
        for &p in &old_points {
            level_points.push(maps.successors[&p]);
        }
        for &e in &old_edges {
            level_points.push(maps.edgepoints[&e]);
        }
        for &f in &old_faces {
            if let Some(&fp) = maps.facepoints.get(&f) {
                level_points.push(fp);
            }
        }

        // One global averaging sweep, two-phase so every read sees the
        // unaveraged level.
        let mut moved = Vec::with_capacity(level_points.len());
        for &p in &level_points {
            moved.push((p, self.averaged_position(p)?));
        }
        for (p, position) in moved {
            self.store.points[p].position = position;
        }

        // Release the level that was refined, unless it is the cage.
        if self.current_level > 0 {
            for p in old_points {
                self.store.points.remove(p);
            }
            for e in old_edges {
                self.store.edges.remove(e);
            }
            for f in old_faces {
                self.store.faces.remove(f);
            }
        }

        self.points = level_points;
        self.edges = new_edges;
        self.current_level += 1;
        debug!(
            level = self.current_level,
            points = self.points.len(),
            edges = self.edges.len(),
            "refined one level"
        );
        Ok(())
    }

    /// Split one parent face into its children and wire them up.
    fn subdivide_face(
        &mut self,
        parent: FaceId,
        interior_prev: &HashSet<EdgeId>,
        maps: &PassMaps,
        sink: &mut FaceSink<'_>,
    ) -> Result<()> {
        let ring = self.store.faces[parent].points().to_vec();
        let n = ring.len();
        if n < 3 {
            return Err(HullError::DegenerateFace { points: n });
        }
        let control_parent = self.store.faces[parent].is_control();

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            let e = self
                .store
                .edge_between(a, b)
                .ok_or_else(|| HullError::topology("face ring edge missing"))?;
            let record = &self.store.edges[e];
            edges.push(ParentEdge {
                seed: ChildEdgeSeed {
                    crease: record.is_crease(),
                    control: record.is_control_edge(),
                    curve: record.curve(),
                    interior: interior_prev.contains(&e),
                },
                edgepoint: maps.edgepoints[&e],
            });
        }
        let succ: Vec<PointId> = ring.iter().map(|p| maps.successors[p]).collect();

        if self.mode == SubdivisionMode::TrianglePreserving && n == 3 {
            let inner = ChildEdgeSeed::inner(control_parent);
            let (e0, e1, e2) = (edges[0].edgepoint, edges[1].edgepoint, edges[2].edgepoint);
            let corner_rings = [
                ([succ[0], e0, e2], [edges[0].seed, inner, edges[2].seed]),
                ([succ[1], e1, e0], [edges[1].seed, inner, edges[0].seed]),
                ([succ[2], e2, e1], [edges[2].seed, inner, edges[1].seed]),
            ];
            for (child_ring, seeds) in corner_rings {
                let child = self.wire_derived_face(child_ring.to_vec(), &seeds, sink);
                sink.children.push(child);
            }
            let centre = self.wire_derived_face(vec![e0, e1, e2], &[inner, inner, inner], sink);
            sink.children.push(centre);
        } else {
            let fp = *maps
                .facepoints
                .get(&parent)
                .ok_or_else(|| HullError::topology("facepoint missing for parent face"))?;
            let inner = ChildEdgeSeed::inner(control_parent);
            for i in 0..n {
                let prev = (i + n - 1) % n;
                let child_ring = vec![succ[i], edges[i].edgepoint, fp, edges[prev].edgepoint];
                let seeds = [edges[i].seed, inner, inner, edges[prev].seed];
                let child = self.wire_derived_face(child_ring, &seeds, sink);
                sink.children.push(child);
            }
        }
        Ok(())
    }

    /// Insert a derived face and hook up its adjacency, creating missing
    /// ring edges from their seeds.
    fn wire_derived_face(
        &mut self,
        ring: Vec<PointId>,
        seeds: &[ChildEdgeSeed],
        sink: &mut FaceSink<'_>,
    ) -> FaceId {
        let id = self.store.faces.insert(Face::derived(ring.clone()));
        let n = ring.len();
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            let edge = match self.store.edge_between(a, b) {
                Some(e) => e,
                None => {
                    let seed = &seeds[i];
                    let mut record = Edge::new(a, b, seed.control);
                    record.crease = seed.crease;
                    record.curve = seed.curve;
                    let e = self.store.edges.insert(record);
                    sink.new_edges.push(e);
                    if seed.interior {
                        sink.interior.push(e);
                    }
                    e
                }
            };
            self.store.edges[edge].add_face(id);
            self.store.points[a].add_edge(edge);
            self.store.points[b].add_edge(edge);
            self.store.points[a].add_face(id);
        }
        id
    }

    /// Averaged position of a freshly created point, by its
    /// classification.
    fn averaged_position(&self, id: PointId) -> Result<Point3<f64>> {
        let point = &self.store.points[id];
        match point.kind() {
            VertexKind::Corner => Ok(point.position()),
            VertexKind::Crease => {
                let neighbours: Vec<PointId> = point
                    .edges()
                    .iter()
                    .filter(|&&e| self.store.edges[e].acts_as_crease())
                    .filter_map(|&e| self.store.edges[e].other_point(id))
                    .collect();
                if neighbours.len() == 2 {
                    let a = self.store.points[neighbours[0]].position();
                    let b = self.store.points[neighbours[1]].position();
                    Ok(Point3::from(
                        point.position().coords * 0.5 + a.coords * 0.25 + b.coords * 0.25,
                    ))
                } else {
                    // Malformed crease: treat as smooth.
                    self.smooth_average(id)
                }
            }
            VertexKind::Regular | VertexKind::Dart => self.smooth_average(id),
        }
    }

    /// Face-weighted averaging for smooth and dart points.
    fn smooth_average(&self, id: PointId) -> Result<Point3<f64>> {
        let point = &self.store.points[id];
        let position = point.position();
        if point.faces().is_empty() {
            return Ok(position);
        }
        let mut accum = Vector3::zeros();
        let mut total_weight = 0.0;
        let mut quads = 0usize;
        let mut tris = 0usize;
        for &f in point.faces() {
            let face = &self.store.faces[f];
            let corners = face.len();
            let face_weight = match corners {
                3 => {
                    tris += 1;
                    FRAC_PI_3
                }
                4 => {
                    quads += 1;
                    FRAC_PI_2
                }
                _ => {
                    return Err(HullError::topology(
                        "averaging expects triangle and quad faces",
                    ))
                }
            };
            let mut centroid = Vector3::zeros();
            for &q in face.points() {
                let w = if corners == 3 {
                    if q == id {
                        0.25
                    } else {
                        0.375
                    }
                } else {
                    0.25
                };
                centroid += self.store.points[q].position().coords * w;
            }
            accum += centroid * face_weight;
            total_weight += face_weight;
        }
        let average = accum / total_weight;
        let n = point.faces().len() as f64;
        let blend = if tris == point.faces().len() {
            let c = 0.375 + 0.25 * (2.0 * std::f64::consts::PI / n).cos();
            5.0 / 3.0 - 8.0 / 3.0 * c * c
        } else if tris == 0 {
            4.0 / n
        } else {
            12.0 / (3.0 * quads as f64 + 2.0 * tris as f64)
        };
        Ok(Point3::from(
            position.coords + blend * (average - position.coords),
        ))
    }
}
