//! # Keelson
//!
//! A subdivision-surface kernel for ship hull modeling.
//!
//! Keelson represents a hull as a coarse control cage refined by
//! Catmull-Clark style subdivision. The cage carries the modeling intent:
//! crease edges for chines and knuckle lines, locked points, layers for
//! plate groups, and control curves pinned to cage edges. Everything else
//! is derived on demand and thrown away on the next edit.
//!
//! ## Features
//!
//! - **Control cage editing**: points, edges, faces, layers and curves
//!   with generational handles and dirty tracking
//! - **Subdivision**: quad-dominant or triangle-preserving refinement with
//!   crease and boundary rules
//! - **Plane sections**: stations, buttocks and waterlines as splines that
//!   keep chines as knuckle points
//! - **Fairing aids**: Gaussian curvature per vertex and regularity
//!   queries for point grids
//! - **Persistence**: a versioned binary model format
//!
//! ## Quick Start
//!
//! ```
//! use keelson::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut hull = Surface::new();
//! let ring = [
//!     hull.add_control_point(Point3::new(0.0, 0.0, 0.0)),
//!     hull.add_control_point(Point3::new(1.0, 0.0, 0.0)),
//!     hull.add_control_point(Point3::new(1.0, 1.0, 0.0)),
//!     hull.add_control_point(Point3::new(0.0, 1.0, 0.0)),
//! ];
//! hull.add_control_face(&ring, None).unwrap();
//!
//! // One refinement level turns the quad into four.
//! assert_eq!(hull.number_of_points().unwrap(), 9);
//! assert_eq!(hull.number_of_faces().unwrap(), 4);
//! ```
//!
//! ## Cutting Sections
//!
//! Stations, buttocks and waterlines are all plane cuts:
//!
//! ```
//! use keelson::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut hull = Surface::new();
//! let ring = [
//!     hull.add_control_point(Point3::new(0.0, 0.0, 0.0)),
//!     hull.add_control_point(Point3::new(2.0, 0.0, 0.0)),
//!     hull.add_control_point(Point3::new(2.0, 0.0, 1.0)),
//!     hull.add_control_point(Point3::new(0.0, 0.0, 1.0)),
//! ];
//! hull.add_control_face(&ring, None).unwrap();
//!
//! let waterplane = Plane::from_point_normal(&Point3::new(0.0, 0.0, 0.5), &Vector3::z());
//! let sections = hull
//!     .calculate_intersections(&waterplane, hull.control_face_ids())
//!     .unwrap();
//! assert_eq!(sections.len(), 1);
//! assert_eq!(sections[0].number_of_points(), 2);
//! ```
//!
//! ## Saving and Loading
//!
//! Models serialize to a compact binary buffer holding the control net
//! and the subdivision settings:
//!
//! ```
//! use keelson::io::{self, ModelBuffer};
//! use keelson::prelude::*;
//! use nalgebra::Point3;
//!
//! # let mut hull = Surface::new();
//! # let ring = [
//! #     hull.add_control_point(Point3::new(0.0, 0.0, 0.0)),
//! #     hull.add_control_point(Point3::new(1.0, 0.0, 0.0)),
//! #     hull.add_control_point(Point3::new(1.0, 1.0, 0.0)),
//! #     hull.add_control_point(Point3::new(0.0, 1.0, 0.0)),
//! # ];
//! # hull.add_control_face(&ring, None).unwrap();
//! let mut buffer = ModelBuffer::new();
//! io::save_binary(&hull, &mut buffer).unwrap();
//!
//! let restored = io::load_binary(&mut buffer).unwrap();
//! assert_eq!(restored.control_point_ids().len(), 4);
//! assert_eq!(restored.control_face_ids().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod curve;
pub mod error;
pub mod geom;
pub mod io;
pub mod mesh;
pub mod surface;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use keelson::prelude::*;
/// ```
pub mod prelude {
    pub use crate::curve::{ControlCurve, Spline};
    pub use crate::error::{HullError, Result};
    pub use crate::geom::{BoundingBox, Plane};
    pub use crate::mesh::{CurveId, EdgeId, FaceId, LayerId, PointId, VertexKind};
    pub use crate::surface::{PickHit, PickRay, PointGrid, SubdivisionMode, Surface};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_open_box_hull() {
        let mut hull = Surface::new();
        let corners = [
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [2.0, 0.0, 1.0],
            [2.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let p: Vec<PointId> = corners
            .iter()
            .map(|&c| hull.add_control_point(Point3::from(c)))
            .collect();
        // Bottom and four sides; the top stays open like a deckless hull.
        let rings = [
            [p[0], p[3], p[2], p[1]],
            [p[0], p[1], p[5], p[4]],
            [p[1], p[2], p[6], p[5]],
            [p[2], p[3], p[7], p[6]],
            [p[3], p[0], p[4], p[7]],
        ];
        for ring in &rings {
            hull.add_control_face(ring, None).unwrap();
        }

        // 8 corners + 12 edge points + 5 face points at level one.
        assert_eq!(hull.number_of_points().unwrap(), 25);
        assert_eq!(hull.number_of_faces().unwrap(), 20);

        // The open rim stays put under boundary rules.
        let extents = hull.extents().unwrap();
        assert_eq!(extents.max.z, 1.0);
    }
}
