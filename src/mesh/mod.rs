//! Mesh element records and storage.
//!
//! This module provides the element records of the control net and the
//! subdivided mesh, plus the arena that owns them.
//!
//! # Overview
//!
//! Every mesh level shares one set of record types held in generational
//! arenas (see [`MeshStore`]). Control elements carry their extra state in
//! tagged extensions ([`PointExt`], [`FaceExt`]) instead of separate types,
//! so a subdivision pass can treat cage and derived elements uniformly and
//! callers reach control-only state through `Option`-returning accessors.
//!
//! # Handles
//!
//! Elements are identified by generational keys ([`PointId`], [`EdgeId`],
//! [`FaceId`], [`LayerId`], [`CurveId`]). A handle kept across a deletion
//! stops resolving instead of aliasing a recycled slot; the checked
//! accessors on [`MeshStore`] turn that into [`HullError::StaleHandle`].
//!
//! [`HullError::StaleHandle`]: crate::error::HullError::StaleHandle

pub mod edge;
pub mod face;
pub mod layer;
pub mod point;
pub mod store;

pub use edge::Edge;
pub use face::{ControlFaceData, Face, FaceExt};
pub use layer::Layer;
pub use point::{ControlPointData, Point, PointExt, VertexKind};
pub use store::{CurveId, EdgeId, FaceId, LayerId, MeshStore, PointId};
