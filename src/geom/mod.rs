//! Geometric primitives shared by the surface and curve modules.
//!
//! Everything here is plain value math over [`nalgebra`] points and
//! vectors: planes, bounding boxes, and the small triangle/ray toolbox
//! used by picking, clipping and curvature.

mod bbox;
mod plane;
mod triangle;

pub use bbox::BoundingBox;
pub use plane::Plane;
pub use triangle::{
    closest_point_on_segment, corner_angle, distance_point_to_line, distance_point_to_ray,
    distance_point_to_segment, distance_ray_to_segment, point_in_triangle,
    ray_triangle_intersect,
};

/// Tolerance used to classify points against planes.
pub const PLANE_EPSILON: f64 = 1e-5;
