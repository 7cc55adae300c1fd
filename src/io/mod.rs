//! Binary model persistence.
//!
//! A model serializes as one fixed record sequence over a [`ModelBuffer`]:
//! header, layers, control points, control edges, control faces, control
//! curves, then the subdivision settings. Only the control net is stored;
//! loading rebuilds adjacency and vertex classification and leaves the
//! surface dirty, so the first query after a load re-derives everything
//! else. Where the bytes live (file, clipboard, network) is the caller's
//! concern.

mod buffer;

pub use buffer::ModelBuffer;

use std::collections::HashMap;

use nalgebra::Point3;
use tracing::{info, instrument};

use crate::error::{HullError, Result};
use crate::mesh::{EdgeId, LayerId, PointId};
use crate::surface::{SubdivisionMode, Surface};

/// Leading bytes of every serialized model.
pub const MODEL_MAGIC: [u8; 4] = *b"KLSN";
/// Format version written by [`save_binary`].
pub const MODEL_VERSION: u8 = 1;

/// Serialize the control net and subdivision settings.
#[instrument(skip_all)]
pub fn save_binary(surface: &Surface, buffer: &mut ModelBuffer) -> Result<()> {
    let store = surface.store();

    for byte in MODEL_MAGIC {
        buffer.put_u8(byte);
    }
    buffer.put_u8(MODEL_VERSION);

    let layer_ids = surface.layer_ids();
    let mut layer_index: HashMap<LayerId, u32> = HashMap::with_capacity(layer_ids.len());
    buffer.put_u32(layer_ids.len() as u32);
    for (i, &l) in layer_ids.iter().enumerate() {
        layer_index.insert(l, i as u32);
        let layer = &store.layers[l];
        buffer.put_string(&layer.name);
        buffer.put_bool(layer.visible);
        buffer.put_bool(layer.symmetric);
        buffer.put_bool(layer.developable);
        buffer.put_bool(layer.use_in_hydrostatics);
    }

    let point_ids = surface.control_point_ids();
    let mut point_index: HashMap<PointId, u32> = HashMap::with_capacity(point_ids.len());
    buffer.put_u32(point_ids.len() as u32);
    for (i, &p) in point_ids.iter().enumerate() {
        point_index.insert(p, i as u32);
        let point = &store.points[p];
        let position = point.position();
        buffer.put_f64(position.x);
        buffer.put_f64(position.y);
        buffer.put_f64(position.z);
        buffer.put_bool(point.control_data().is_some_and(|d| d.locked));
    }
    let index_of = |p: PointId| -> Result<u32> {
        point_index
            .get(&p)
            .copied()
            .ok_or_else(|| HullError::topology("record references a non-control point"))
    };

    let edge_ids = surface.control_edge_ids();
    buffer.put_u32(edge_ids.len() as u32);
    for &e in edge_ids {
        let edge = &store.edges[e];
        buffer.put_u32(index_of(edge.start())?);
        buffer.put_u32(index_of(edge.end())?);
        buffer.put_bool(edge.is_crease());
    }

    let face_ids = surface.control_face_ids();
    buffer.put_u32(face_ids.len() as u32);
    for &f in face_ids {
        let face = &store.faces[f];
        buffer.put_u32(face.len() as u32);
        for &p in face.points() {
            buffer.put_u32(index_of(p)?);
        }
        let layer = face
            .control_data()
            .map(|d| d.layer)
            .ok_or_else(|| HullError::topology("control face without control data"))?;
        let layer = layer_index
            .get(&layer)
            .copied()
            .ok_or_else(|| HullError::topology("face references an unregistered layer"))?;
        buffer.put_u32(layer);
    }

    let curve_ids = surface.control_curve_ids();
    buffer.put_u32(curve_ids.len() as u32);
    for &c in curve_ids {
        let chain = store.curves[c].control_points();
        buffer.put_u32(chain.len() as u32);
        for &p in chain {
            buffer.put_u32(index_of(p)?);
        }
    }

    buffer.put_u8(surface.desired_subdivision_level() as u8);
    buffer.put_u8(match surface.subdivision_mode() {
        SubdivisionMode::QuadDominant => 0,
        SubdivisionMode::TrianglePreserving => 1,
    });

    info!(bytes = buffer.len(), "model saved");
    Ok(())
}

/// Rebuild a surface from its serialized control net.
///
/// The loaded surface is dirty; its derived mesh is rebuilt on the first
/// query that needs it.
#[instrument(skip_all)]
pub fn load_binary(buffer: &mut ModelBuffer) -> Result<Surface> {
    for expected in MODEL_MAGIC {
        let offset = buffer.position();
        if buffer.get_u8("magic")? != expected {
            return Err(HullError::CorruptModel {
                offset,
                what: "magic",
            });
        }
    }
    let version = buffer.get_u8("version")?;
    if version != MODEL_VERSION {
        return Err(HullError::UnsupportedVersion { found: version });
    }

    let mut surface = Surface::new();

    let layer_count = buffer.get_u32("layer count")?;
    let mut layers: Vec<LayerId> = Vec::new();
    for i in 0..layer_count {
        let name = buffer.get_string("layer name")?;
        let visible = buffer.get_bool("layer visibility")?;
        let symmetric = buffer.get_bool("layer symmetry")?;
        let developable = buffer.get_bool("layer developability")?;
        let hydrostatics = buffer.get_bool("layer hydrostatics flag")?;
        // The first record takes over the default layer a fresh surface
        // starts with.
        let id = if i == 0 {
            surface.layer_ids()[0]
        } else {
            surface.add_layer(name.clone())
        };
        surface.update_layer(id, |layer| {
            layer.name = name;
            layer.visible = visible;
            layer.symmetric = symmetric;
            layer.developable = developable;
            layer.use_in_hydrostatics = hydrostatics;
        })?;
        layers.push(id);
    }

    let point_count = buffer.get_u32("point count")?;
    let mut points: Vec<PointId> = Vec::new();
    for _ in 0..point_count {
        let x = buffer.get_f64("point x")?;
        let y = buffer.get_f64("point y")?;
        let z = buffer.get_f64("point z")?;
        let locked = buffer.get_bool("point lock flag")?;
        let id = surface.add_control_point(Point3::new(x, y, z));
        if locked {
            surface.set_point_locked(id, true)?;
        }
        points.push(id);
    }

    let edge_count = buffer.get_u32("edge count")?;
    let mut creased: Vec<EdgeId> = Vec::new();
    for _ in 0..edge_count {
        let start = indexed(&points, buffer, "edge start")?;
        let end = indexed(&points, buffer, "edge end")?;
        let crease = buffer.get_bool("edge crease flag")?;
        let id = surface.add_control_edge(start, end)?;
        if crease {
            creased.push(id);
        }
    }

    let face_count = buffer.get_u32("face count")?;
    for _ in 0..face_count {
        let corner_count = buffer.get_u32("face point count")?;
        let mut ring: Vec<PointId> = Vec::new();
        for _ in 0..corner_count {
            ring.push(indexed(&points, buffer, "face point")?);
        }
        let layer = indexed(&layers, buffer, "face layer")?;
        surface.add_control_face(&ring, Some(layer))?;
    }

    // Crease flags go on last so endpoint classification sees the final
    // adjacency.
    for e in creased {
        surface.set_edge_crease(e, true)?;
    }

    let curve_count = buffer.get_u32("curve count")?;
    for _ in 0..curve_count {
        let offset = buffer.position();
        let chain_len = buffer.get_u32("curve point count")?;
        if chain_len < 2 {
            return Err(HullError::CorruptModel {
                offset,
                what: "curve point count",
            });
        }
        let mut chain: Vec<PointId> = Vec::new();
        for _ in 0..chain_len {
            chain.push(indexed(&points, buffer, "curve point")?);
        }
        let mut edges: Vec<EdgeId> = Vec::new();
        for pair in chain.windows(2) {
            let e = surface
                .store()
                .edge_between(pair[0], pair[1])
                .ok_or(HullError::CorruptModel {
                    offset,
                    what: "curve chain",
                })?;
            edges.push(e);
        }
        surface.add_control_curve(&edges)?;
    }

    let level = buffer.get_u8("subdivision level")?;
    surface.set_desired_subdivision_level(level as usize);
    let offset = buffer.position();
    let mode = match buffer.get_u8("subdivision mode")? {
        0 => SubdivisionMode::QuadDominant,
        1 => SubdivisionMode::TrianglePreserving,
        _ => {
            return Err(HullError::CorruptModel {
                offset,
                what: "subdivision mode",
            })
        }
    };
    surface.set_subdivision_mode(mode);

    info!(
        points = surface.control_point_ids().len(),
        edges = surface.control_edge_ids().len(),
        faces = surface.control_face_ids().len(),
        curves = surface.control_curve_ids().len(),
        "model loaded"
    );
    Ok(surface)
}

/// Read a u32 record index and resolve it against the elements loaded so
/// far.
fn indexed<T: Copy>(list: &[T], buffer: &mut ModelBuffer, what: &'static str) -> Result<T> {
    let offset = buffer.position();
    let index = buffer.get_u32(what)? as usize;
    list.get(index)
        .copied()
        .ok_or(HullError::CorruptModel { offset, what })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_model() -> Surface {
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
        let deck = surface.add_layer("deck");
        surface
            .update_layer(deck, |l| {
                l.visible = false;
                l.developable = true;
            })
            .unwrap();
        for (i, ring) in rings.iter().enumerate() {
            let layer = if i == 1 { Some(deck) } else { None };
            surface.add_control_face(ring, layer).unwrap();
        }
        let chine = surface.store().edge_between(p[1], p[5]).unwrap();
        surface.set_edge_crease(chine, true).unwrap();
        surface.set_point_locked(p[0], true).unwrap();
        let e01 = surface.store().edge_between(p[0], p[1]).unwrap();
        let e12 = surface.store().edge_between(p[1], p[2]).unwrap();
        surface.add_control_curve(&[e01, e12]).unwrap();
        surface.set_desired_subdivision_level(2);
        surface.set_subdivision_mode(SubdivisionMode::TrianglePreserving);
        surface
    }

    #[test]
    fn model_round_trips() {
        let original = sample_model();
        let mut buffer = ModelBuffer::new();
        save_binary(&original, &mut buffer).unwrap();

        let loaded = load_binary(&mut buffer).unwrap();

        assert_eq!(
            loaded.control_point_ids().len(),
            original.control_point_ids().len()
        );
        assert_eq!(
            loaded.control_edge_ids().len(),
            original.control_edge_ids().len()
        );
        assert_eq!(
            loaded.control_face_ids().len(),
            original.control_face_ids().len()
        );
        assert_eq!(loaded.control_curve_ids().len(), 1);
        assert_eq!(loaded.layer_ids().len(), 2);
        assert!(!loaded.is_built());

        // Element order is the record order, so indexes correspond 1:1.
        for i in 0..original.control_point_ids().len() {
            let a = original.control_point_id(i).unwrap();
            let b = loaded.control_point_id(i).unwrap();
            let pa = original.store().points[a].position();
            let pb = loaded.store().points[b].position();
            assert_relative_eq!(pa.x, pb.x);
            assert_relative_eq!(pa.y, pb.y);
            assert_relative_eq!(pa.z, pb.z);
        }
        let locked = loaded.control_point_id(0).unwrap();
        assert!(loaded.store().points[locked]
            .control_data()
            .is_some_and(|d| d.locked));

        let q1 = loaded.control_point_id(1).unwrap();
        let q5 = loaded.control_point_id(5).unwrap();
        let chine = loaded.store().edge_between(q1, q5).unwrap();
        assert!(loaded.store().edges[chine].is_crease());

        let deck = loaded.layer_ids()[1];
        assert_eq!(loaded.store().layers[deck].name, "deck");
        assert!(!loaded.store().layers[deck].visible);
        assert!(loaded.store().layers[deck].developable);
        let top = loaded.control_face_id(1).unwrap();
        assert_eq!(
            loaded.store().faces[top].control_data().unwrap().layer,
            deck
        );

        let curve = loaded.control_curve_id(0).unwrap();
        let chain = loaded.store().curves[curve].control_points().to_vec();
        let expect: Vec<PointId> = (0..3).map(|i| loaded.control_point_id(i).unwrap()).collect();
        assert_eq!(chain, expect);

        assert_eq!(loaded.desired_subdivision_level(), 2);
        assert_eq!(
            loaded.subdivision_mode(),
            SubdivisionMode::TrianglePreserving
        );
    }

    #[test]
    fn loaded_model_subdivides_like_the_original() {
        let mut original = sample_model();
        original.set_subdivision_mode(SubdivisionMode::QuadDominant);
        original.set_desired_subdivision_level(1);
        let mut buffer = ModelBuffer::new();
        save_binary(&original, &mut buffer).unwrap();

        let mut loaded = load_binary(&mut buffer).unwrap();
        loaded.set_desired_subdivision_level(1);

        assert_eq!(
            loaded.number_of_points().unwrap(),
            original.number_of_points().unwrap()
        );
        assert_eq!(
            loaded.number_of_faces().unwrap(),
            original.number_of_faces().unwrap()
        );
    }

    #[test]
    fn truncated_data_is_rejected() {
        let original = sample_model();
        let mut buffer = ModelBuffer::new();
        save_binary(&original, &mut buffer).unwrap();
        let bytes = buffer.into_bytes();
        let mut short = ModelBuffer::from_bytes(bytes[..bytes.len() - 9].to_vec());
        assert!(matches!(
            load_binary(&mut short),
            Err(HullError::CorruptModel { .. })
        ));
    }

    #[test]
    fn foreign_headers_are_rejected() {
        let mut wrong_magic = ModelBuffer::from_bytes(b"NOPE\x01".to_vec());
        assert!(matches!(
            load_binary(&mut wrong_magic),
            Err(HullError::CorruptModel { what: "magic", .. })
        ));

        let mut future = ModelBuffer::new();
        for b in MODEL_MAGIC {
            future.put_u8(b);
        }
        future.put_u8(MODEL_VERSION + 1);
        assert!(matches!(
            load_binary(&mut future),
            Err(HullError::UnsupportedVersion { found }) if found == MODEL_VERSION + 1
        ));
    }

    #[test]
    fn out_of_range_record_indices_are_rejected() {
        let mut buffer = ModelBuffer::new();
        for b in MODEL_MAGIC {
            buffer.put_u8(b);
        }
        buffer.put_u8(MODEL_VERSION);
        buffer.put_u32(0); // layers
        buffer.put_u32(1); // one point
        buffer.put_f64(0.0);
        buffer.put_f64(0.0);
        buffer.put_f64(0.0);
        buffer.put_bool(false);
        buffer.put_u32(1); // one edge
        buffer.put_u32(0);
        buffer.put_u32(7); // no such point
        buffer.put_bool(false);
        assert!(matches!(
            load_binary(&mut buffer),
            Err(HullError::CorruptModel {
                what: "edge end",
                ..
            })
        ));
    }

    #[test]
    fn empty_surface_round_trips() {
        let empty = Surface::new();
        let mut buffer = ModelBuffer::new();
        save_binary(&empty, &mut buffer).unwrap();
        let loaded = load_binary(&mut buffer).unwrap();
        assert!(loaded.control_point_ids().is_empty());
        assert_eq!(loaded.layer_ids().len(), 1);
        assert_eq!(loaded.store().layers[loaded.layer_ids()[0]].name, "Layer 0");
    }
}
