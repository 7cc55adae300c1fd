//! Rectangular patch extraction from the refined mesh.
//!
//! Downstream surface export wants structured point lattices, not face
//! soup. Every quad control face refines into a perfect `(2^L+1)^2` point
//! lattice, recovered here by walking its children from the corner child.
//! Neighbouring lattices whose full boundary rows match are then merged
//! greedily, as long as every shared point still looks like a regular
//! quad-grid interior point within the merged region.

use std::collections::HashSet;

use tracing::debug;

use super::Surface;
use crate::error::{HullError, Result};
use crate::mesh::{FaceId, PointId};

/// A rectangular lattice of mesh points, row-major.
#[derive(Debug, Clone, Default)]
pub struct PointGrid {
    rows: Vec<Vec<PointId>>,
}

impl PointGrid {
    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[inline]
    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Point at `row`, `col`.
    pub fn point(&self, row: usize, col: usize) -> Result<PointId> {
        let r = self
            .rows
            .get(row)
            .ok_or_else(|| HullError::out_of_bounds("grid row", row, self.row_count()))?;
        r.get(col)
            .copied()
            .ok_or_else(|| HullError::out_of_bounds("grid column", col, r.len()))
    }

    /// All rows, top to bottom.
    #[inline]
    pub fn rows(&self) -> &[Vec<PointId>] {
        &self.rows
    }
}

/// One face lattice mid-assembly, with the faces it spans.
struct Patch {
    rows: Vec<Vec<PointId>>,
    faces: HashSet<FaceId>,
}

/// Walk state: a cell and the point sitting at its north-west corner.
#[derive(Clone, Copy)]
struct CellCursor {
    face: FaceId,
    nw: PointId,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    North,
    South,
    West,
    East,
}

impl Side {
    const ALL: [Side; 4] = [Side::North, Side::South, Side::West, Side::East];
}

impl Surface {
    /// Extract structured point lattices from the given control faces.
    ///
    /// Each quad face contributes the lattice of its descendants at the
    /// current level; lattices sharing a full boundary row or column are
    /// merged when every shared point is a regular interior point of the
    /// union (see [`Surface::is_regular_nurbs_point`]). Non-quad faces
    /// are skipped.
    pub fn assemble_patches(&mut self, control_faces: &[FaceId]) -> Result<Vec<PointGrid>> {
        self.rebuild()?;
        let mut patches: Vec<Patch> = Vec::new();
        for &cf in control_faces {
            self.store.try_face(cf)?;
            if let Some(patch) = self.face_patch(cf)? {
                patches.push(patch);
            }
        }
        'merging: loop {
            for i in 0..patches.len() {
                for j in i + 1..patches.len() {
                    if let Some(merged) = self.try_merge(&patches[i], &patches[j])? {
                        patches[i] = merged;
                        patches.remove(j);
                        continue 'merging;
                    }
                }
            }
            break;
        }
        debug!(
            faces = control_faces.len(),
            patches = patches.len(),
            "assembled patches"
        );
        Ok(patches
            .into_iter()
            .map(|p| PointGrid { rows: p.rows })
            .collect())
    }

    /// Lattice of one quad control face's descendants, row 0 along the
    /// face's first ring edge.
    fn face_patch(&self, cf: FaceId) -> Result<Option<Patch>> {
        let face = &self.store.faces[cf];
        let data = match face.control_data() {
            Some(data) => data,
            None => return Ok(None),
        };
        if face.len() != 4 {
            return Ok(None);
        }
        if self.current_level == 0 {
            let ring = face.points();
            let rows = vec![vec![ring[0], ring[1]], vec![ring[3], ring[2]]];
            return Ok(Some(Patch {
                rows,
                faces: HashSet::from([cf]),
            }));
        }
        let cells = 1usize << self.current_level;
        let children = &data.children;
        if children.len() != cells * cells
            || children.iter().any(|&c| self.store.faces[c].len() != 4)
        {
            return Ok(None);
        }
        let region: HashSet<FaceId> = children.iter().copied().collect();

        // The first child sits at the corner descended from ring[0], with
        // that descendant first in its own ring.
        let n = cells + 1;
        let mut rows = vec![vec![PointId::default(); n]; n];
        let mut anchor = CellCursor {
            face: children[0],
            nw: self.store.faces[children[0]].points()[0],
        };
        for r in 0..cells {
            let mut cursor = anchor;
            for c in 0..cells {
                let (nw, ne, se, sw) = self.cell_corners(cursor)?;
                rows[r][c] = nw;
                rows[r][c + 1] = ne;
                rows[r + 1][c + 1] = se;
                rows[r + 1][c] = sw;
                if c + 1 < cells {
                    cursor = CellCursor {
                        face: self.cell_neighbor(cursor.face, ne, se, &region)?,
                        nw: ne,
                    };
                }
            }
            if r + 1 < cells {
                let (_, _, se, sw) = self.cell_corners(anchor)?;
                anchor = CellCursor {
                    face: self.cell_neighbor(anchor.face, sw, se, &region)?,
                    nw: sw,
                };
            }
        }
        Ok(Some(Patch {
            rows,
            faces: region,
        }))
    }

    /// Ring corners of a cell, starting at its north-west point.
    fn cell_corners(&self, cursor: CellCursor) -> Result<(PointId, PointId, PointId, PointId)> {
        let face = &self.store.faces[cursor.face];
        let k = face
            .index_of_point(cursor.nw)
            .ok_or_else(|| HullError::topology("patch walk lost its corner point"))?;
        let ring = face.points();
        let n = ring.len();
        Ok((
            ring[k],
            ring[(k + 1) % n],
            ring[(k + 2) % n],
            ring[(k + 3) % n],
        ))
    }

    /// The other face of the edge `a..b` inside the walked region.
    fn cell_neighbor(
        &self,
        from: FaceId,
        a: PointId,
        b: PointId,
        region: &HashSet<FaceId>,
    ) -> Result<FaceId> {
        let e = self
            .store
            .edge_between(a, b)
            .ok_or_else(|| HullError::topology("cell boundary edge missing"))?;
        self.store.edges[e]
            .faces()
            .iter()
            .copied()
            .find(|f| *f != from && region.contains(f))
            .ok_or_else(|| HullError::topology("patch walk left its region"))
    }

    /// Merge two patches along a fully shared boundary, if one exists and
    /// every shared point is regular within the union.
    fn try_merge(&self, a: &Patch, b: &Patch) -> Result<Option<Patch>> {
        for sa in Side::ALL {
            let a_seq = side_points(&a.rows, sa);
            for sb in Side::ALL {
                let b_seq = side_points(&b.rows, sb);
                if a_seq.len() != b_seq.len() {
                    continue;
                }
                let reversed = if b_seq == a_seq {
                    false
                } else if b_seq.iter().rev().eq(a_seq.iter()) {
                    true
                } else {
                    continue;
                };
                let union: HashSet<FaceId> = a.faces.union(&b.faces).copied().collect();
                let mut clean = true;
                for &p in &a_seq {
                    if !self.is_regular_in_set(p, &union)? {
                        clean = false;
                        break;
                    }
                }
                if !clean {
                    continue;
                }
                let a_rows = flipped_vertical(side_to_north(a.rows.clone(), sa));
                let mut b_rows = side_to_north(b.rows.clone(), sb);
                if reversed {
                    b_rows = flipped_horizontal(b_rows);
                }
                let mut rows = a_rows;
                rows.extend(b_rows.into_iter().skip(1));
                return Ok(Some(Patch { rows, faces: union }));
            }
        }
        Ok(None)
    }
}

fn side_points(rows: &[Vec<PointId>], side: Side) -> Vec<PointId> {
    match side {
        Side::North => rows[0].clone(),
        Side::South => rows[rows.len() - 1].clone(),
        Side::West => rows.iter().map(|r| r[0]).collect(),
        Side::East => rows.iter().map(|r| r[r.len() - 1]).collect(),
    }
}

/// Reorient a lattice so `side` becomes its north row, order preserved.
fn side_to_north(rows: Vec<Vec<PointId>>, side: Side) -> Vec<Vec<PointId>> {
    match side {
        Side::North => rows,
        Side::South => flipped_vertical(rows),
        Side::West => transposed(&rows),
        Side::East => transposed(&flipped_horizontal(rows)),
    }
}

fn transposed(rows: &[Vec<PointId>]) -> Vec<Vec<PointId>> {
    let cols = rows.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| rows.iter().map(|row| row[c]).collect())
        .collect()
}

fn flipped_vertical(mut rows: Vec<Vec<PointId>>) -> Vec<Vec<PointId>> {
    rows.reverse();
    rows
}

fn flipped_horizontal(mut rows: Vec<Vec<PointId>>) -> Vec<Vec<PointId>> {
    for row in &mut rows {
        row.reverse();
    }
    rows
}
