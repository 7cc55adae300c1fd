//! Layer records.

use serde::{Deserialize, Serialize};

/// A named grouping of control faces with shared display and behavior
/// flags. Membership lives on the faces (their control extension holds the
/// layer id); the layer itself is plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Display name.
    pub name: String,
    /// Whether the layer's faces take part in display and picking.
    pub visible: bool,
    /// Mirrored about the centerplane when the model is half of a hull.
    pub symmetric: bool,
    /// Whether plates on this layer are meant to be developable.
    pub developable: bool,
    /// Whether the layer's faces count toward hydrostatic calculations.
    pub use_in_hydrostatics: bool,
}

impl Layer {
    /// New layer with the default flags.
    pub fn new(name: impl Into<String>) -> Self {
        Layer {
            name: name.into(),
            visible: true,
            symmetric: true,
            developable: false,
            use_in_hydrostatics: true,
        }
    }
}

impl Default for Layer {
    fn default() -> Self {
        Layer::new("Layer 0")
    }
}
