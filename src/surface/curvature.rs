//! Discrete Gaussian curvature of the refined mesh.
//!
//! The measure is the classic angle deficit: 360 degrees minus the sum of
//! the corner angles of the faces meeting at a point. On a closed smooth
//! region the deficit tends towards zero as the mesh refines, while corners
//! and boundary points keep a visible residue, which makes the table a
//! quick fairness check while editing a hull.

use rayon::prelude::*;

use super::Surface;
use crate::error::Result;
use crate::geom::corner_angle;
use crate::mesh::{MeshStore, PointId};

impl Surface {
    /// Angle deficit in degrees for every point of the refined mesh.
    ///
    /// The table runs parallel to [`Surface::point_ids`] and is cached
    /// until the next edit. Points are evaluated on the rayon pool; use
    /// [`Surface::gauss_curvature_sequential`] to stay on the calling
    /// thread.
    pub fn gauss_curvature(&mut self) -> Result<&[f64]> {
        self.rebuild()?;
        if self.gauss.is_none() {
            self.gauss = Some(angle_deficits(&self.store, &self.points, true));
        }
        Ok(self.gauss.as_deref().unwrap_or(&[]))
    }

    /// Single-threaded twin of [`Surface::gauss_curvature`].
    ///
    /// Computes a fresh table without touching the cache.
    pub fn gauss_curvature_sequential(&mut self) -> Result<Vec<f64>> {
        self.rebuild()?;
        Ok(angle_deficits(&self.store, &self.points, false))
    }
}

fn angle_deficits(store: &MeshStore, points: &[PointId], parallel: bool) -> Vec<f64> {
    let deficit = |p: &PointId| {
        let point = &store.points[*p];
        let at = point.position();
        let mut sum = 0.0;
        for &f in point.faces() {
            let face = &store.faces[f];
            if let Some(index) = face.index_of_point(*p) {
                let prev = store.points[face.prev_point(index)].position();
                let next = store.points[face.next_point(index)].position();
                sum += corner_angle(&at, &prev, &next);
            }
        }
        360.0 - sum.to_degrees()
    };

    if parallel {
        points.par_iter().map(deficit).collect()
    } else {
        points.iter().map(deficit).collect()
    }
}
