//! Closed-form analysis of points on the refined mesh.

use std::collections::HashSet;

use nalgebra::Point3;

use crate::error::{HullError, Result};
use crate::mesh::{FaceId, PointId, VertexKind};

use super::Surface;

impl Surface {
    /// Position the point converges to under endless refinement.
    ///
    /// Works on any point at the level it lives at, the cage included.
    /// Corner points and malformed crease points are already at their
    /// limit.
    pub fn limit_point(&self, point: PointId) -> Result<Point3<f64>> {
        let p = self.store.try_point(point)?;
        let position = p.position();
        match p.kind() {
            VertexKind::Corner => Ok(position),
            VertexKind::Crease => {
                let neighbours: Vec<PointId> = p
                    .edges()
                    .iter()
                    .filter(|&&e| self.store.edges[e].acts_as_crease())
                    .filter_map(|&e| self.store.edges[e].other_point(point))
                    .collect();
                if neighbours.len() == 2 {
                    let a = self.store.points[neighbours[0]].position().coords;
                    let b = self.store.points[neighbours[1]].position().coords;
                    Ok(Point3::from((a + position.coords * 4.0 + b) / 6.0))
                } else {
                    Ok(position)
                }
            }
            VertexKind::Regular | VertexKind::Dart => {
                if p.faces().is_empty() {
                    return Ok(position);
                }
                let n = p.faces().len() as f64;
                let mut sum = position.coords * n * n;
                for &f in p.faces() {
                    let face = &self.store.faces[f];
                    let ring = face.points();
                    let len = ring.len();
                    let idx = face.index_of_point(point).ok_or_else(|| {
                        HullError::topology("point missing from its incident face ring")
                    })?;
                    let next = self.store.points[ring[(idx + 1) % len]].position().coords;
                    let diagonal = self.store.points[ring[(idx + 2) % len]].position().coords;
                    sum += next * 4.0 + diagonal;
                }
                Ok(Point3::from(sum / (n * (n + 5.0))))
            }
        }
    }

    /// Whether the mesh around `point` looks like a regular quad fan when
    /// restricted to the patch `faces`.
    ///
    /// Grid assembly uses this to decide if a rectangular patch boundary
    /// can extend across the point without breaking NURBS convertibility.
    pub fn is_regular_nurbs_point(&self, point: PointId, faces: &[FaceId]) -> Result<bool> {
        let set: HashSet<FaceId> = faces.iter().copied().collect();
        self.is_regular_in_set(point, &set)
    }

    pub(crate) fn is_regular_in_set(
        &self,
        point: PointId,
        set: &HashSet<FaceId>,
    ) -> Result<bool> {
        let p = self.store.try_point(point)?;
        let on_boundary = p
            .edges()
            .iter()
            .any(|&e| self.store.edges[e].is_boundary());
        if on_boundary {
            let within = p.faces().iter().filter(|f| set.contains(f)).count();
            return Ok(within == 2);
        }
        Ok(match p.kind() {
            VertexKind::Regular | VertexKind::Dart => {
                p.faces().len() == 4 && p.faces().iter().all(|&f| self.store.faces[f].len() == 4)
            }
            VertexKind::Crease => p.faces().len() == 4,
            VertexKind::Corner => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{quad_grid, unit_cube};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn smooth_limit_of_a_lifted_grid_centre() {
        let mut grid = quad_grid(2, 2);
        let centre = grid.control_point_id(4).unwrap();
        grid.set_point_position(centre, Point3::new(1.0, 1.0, 1.0))
            .unwrap();
        let limit = grid.limit_point(centre).unwrap();
        // 16 * 1 / 36 of the lift survives at the limit.
        assert_relative_eq!(limit.z, 4.0 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(limit.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(limit.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn crease_limit_blends_the_two_crease_neighbours() {
        let mut grid = quad_grid(2, 1);
        let mid = grid.control_point_id(1).unwrap();
        grid.set_point_position(mid, Point3::new(1.5, 0.0, 0.0))
            .unwrap();
        let limit = grid.limit_point(mid).unwrap();
        assert_relative_eq!(limit.x, 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(limit.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn corner_limit_is_the_point_itself() {
        let mut cube = unit_cube();
        let p0 = cube.control_point_id(0).unwrap();
        let p1 = cube.control_point_id(1).unwrap();
        let p3 = cube.control_point_id(3).unwrap();
        let p4 = cube.control_point_id(4).unwrap();
        for other in [p1, p3, p4] {
            let e = cube.store().edge_between(p0, other).unwrap();
            cube.set_edge_crease(e, true).unwrap();
        }
        assert_eq!(cube.store().points[p0].kind(), VertexKind::Corner);
        cube.set_point_position(p0, Point3::new(-0.5, 0.0, 0.0))
            .unwrap();
        let limit = cube.limit_point(p0).unwrap();
        assert_relative_eq!(limit.x, -0.5);
    }

    #[test]
    fn regularity_depends_on_boundary_and_fan() {
        let grid = quad_grid(2, 2);
        let all = grid.control_face_ids().to_vec();
        let centre = grid.control_point_id(4).unwrap();
        let corner = grid.control_point_id(0).unwrap();
        let edge_mid = grid.control_point_id(1).unwrap();
        assert!(grid.is_regular_nurbs_point(centre, &all).unwrap());
        assert!(!grid.is_regular_nurbs_point(corner, &all).unwrap());
        assert!(grid.is_regular_nurbs_point(edge_mid, &all).unwrap());
        // An interior point is judged on its full fan even for a subset.
        assert!(grid.is_regular_nurbs_point(centre, &all[..2]).unwrap());
    }

    #[test]
    fn creased_interior_point_stays_regular_until_corner() {
        let mut grid = quad_grid(2, 2);
        let all = grid.control_face_ids().to_vec();
        let centre = grid.control_point_id(4).unwrap();
        let left = grid.control_point_id(3).unwrap();
        let right = grid.control_point_id(5).unwrap();
        let below = grid.control_point_id(1).unwrap();
        let e1 = grid.store().edge_between(left, centre).unwrap();
        let e2 = grid.store().edge_between(centre, right).unwrap();
        grid.set_edge_crease(e1, true).unwrap();
        grid.set_edge_crease(e2, true).unwrap();
        assert_eq!(grid.store().points[centre].kind(), VertexKind::Crease);
        assert!(grid.is_regular_nurbs_point(centre, &all).unwrap());
        let e3 = grid.store().edge_between(below, centre).unwrap();
        grid.set_edge_crease(e3, true).unwrap();
        assert_eq!(grid.store().points[centre].kind(), VertexKind::Corner);
        assert!(!grid.is_regular_nurbs_point(centre, &all).unwrap());
    }
}
