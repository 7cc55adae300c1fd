//! Error types for keelson.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`HullError`].
pub type Result<T> = std::result::Result<T, HullError>;

/// Errors that can occur during surface and curve operations.
#[derive(Error, Debug)]
pub enum HullError {
    /// An indexed accessor was called with an out-of-range index.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfBounds {
        /// The collection being indexed.
        what: &'static str,
        /// The offending index.
        index: usize,
        /// Current collection length.
        len: usize,
    },

    /// A generational handle no longer resolves to a live element.
    #[error("stale {what} handle")]
    StaleHandle {
        /// The element kind the handle referred to.
        what: &'static str,
    },

    /// Adjacency between elements is malformed for the requested operation.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A face was given fewer than three distinct points.
    #[error("face needs at least 3 distinct points, got {points}")]
    DegenerateFace {
        /// Number of distinct points supplied.
        points: usize,
    },

    /// The exact point set already forms a control face.
    #[error("a face over the same point set already exists")]
    DuplicateFace,

    /// An edge collapse was requested on an edge without exactly two faces.
    #[error("edge has {faces} incident faces, collapse needs exactly 2")]
    EdgeNotCollapsible {
        /// Incident face count of the edge.
        faces: usize,
    },

    /// A curve was requested over an empty edge list.
    #[error("cannot build a curve from an empty edge list")]
    EmptyChain,

    /// Curve edges do not form a single connected chain.
    #[error("curve edges do not chain: {details}")]
    DisconnectedChain {
        /// Description of the break.
        details: String,
    },

    /// The model buffer ended or held unexpected bytes while reading.
    #[error("corrupt model data at offset {offset}: {what}")]
    CorruptModel {
        /// Byte offset of the failed read.
        offset: usize,
        /// What was being read.
        what: &'static str,
    },

    /// The model buffer was written by an unknown format version.
    #[error("unsupported model version {found}")]
    UnsupportedVersion {
        /// Version tag found in the header.
        found: u8,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl HullError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        HullError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an out-of-range error for an indexed collection accessor.
    pub fn out_of_bounds(what: &'static str, index: usize, len: usize) -> Self {
        HullError::IndexOutOfBounds { what, index, len }
    }

    /// Create an invalid topology error from anything displayable.
    pub fn topology<T: std::fmt::Display>(details: T) -> Self {
        HullError::InvalidTopology(details.to_string())
    }
}
