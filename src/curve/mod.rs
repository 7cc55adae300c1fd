//! Spline interpolation and curves bound to the control cage.
//!
//! [`Spline`] is a standalone natural cubic through a 3D polyline, with
//! knuckle points that break tangent continuity. [`ControlCurve`] pins such
//! a spline to a chain of cage edges so it refines along with the surface.
//! [`join_spline_segments`] assembles loose fragments, as produced by
//! planar intersections, into whole polylines.

mod control;
mod join;
mod spline;

pub use control::ControlCurve;
pub use join::join_spline_segments;
pub use spline::{PlaneCrossing, Spline};
