//! Sparse point-scatterer scenes

use std::f64::consts::PI;
use std::sync::Arc;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use sarsolver_core::{Complex, Geometry, GridGeometry, SceneContainer, Vec3};

use crate::{SimError, SimResult};

/// An ideal point reflector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointScatterer {
    pub position: Vec3,
    pub amplitude: Complex,
}

impl PointScatterer {
    pub fn new(position: Vec3, amplitude: Complex) -> Self {
        Self { position, amplitude }
    }
}

/// Scatterers together with their rasterization onto a grid.
#[derive(Debug, Clone)]
pub struct SparseScene {
    pub scatterers: Vec<PointScatterer>,
    /// Voxel holding each scatterer, in the same order
    pub voxels: Vec<[usize; 3]>,
    pub container: SceneContainer,
}

impl SparseScene {
    /// Voxels ordered by descending reflectivity magnitude.
    pub fn voxels_by_strength(&self) -> Vec<[usize; 3]> {
        let mut order: Vec<usize> = (0..self.scatterers.len()).collect();
        order.sort_by(|&a, &b| {
            self.scatterers[b]
                .amplitude
                .norm()
                .total_cmp(&self.scatterers[a].amplitude.norm())
        });
        order.into_iter().map(|i| self.voxels[i]).collect()
    }
}

/// Rasterize `scatterers` onto `geometry`, each snapped to its nearest voxel.
///
/// Scatterers sharing a voxel add. A scatterer more than half a voxel outside
/// the grid is an error.
pub fn sparse_scene(geometry: &Arc<GridGeometry>, scatterers: Vec<PointScatterer>) -> SimResult<SparseScene> {
    let mut container = geometry.allocate();
    let mut voxels = Vec::with_capacity(scatterers.len());
    for s in &scatterers {
        let voxel = geometry.nearest_voxel(&s.position).ok_or_else(|| {
            SimError::InvalidParameter(format!(
                "scatterer at ({:.2}, {:.2}, {:.2}) lies outside the grid",
                s.position.x, s.position.y, s.position.z
            ))
        })?;
        container.as_mut_slice()[geometry.flat_index(voxel)] += s.amplitude;
        voxels.push(voxel);
    }
    Ok(SparseScene {
        scatterers,
        voxels,
        container,
    })
}

/// `count` scatterers on distinct voxel centres, magnitude in [0.5, 1) and
/// uniformly random phase.
pub fn random_sparse_scene<R: Rng + ?Sized>(
    geometry: &Arc<GridGeometry>,
    count: usize,
    rng: &mut R,
) -> SimResult<SparseScene> {
    let num_voxels = geometry.num_voxels();
    if count > num_voxels {
        return Err(SimError::InvalidParameter(format!(
            "cannot place {} scatterers on {} voxels",
            count, num_voxels
        )));
    }

    let scatterers = index::sample(rng, num_voxels, count)
        .into_iter()
        .map(|flat| {
            let position = geometry.voxel_position(geometry.voxel_index(flat));
            let amplitude = Complex::from_polar(rng.gen_range(0.5..1.0), rng.gen_range(0.0..2.0 * PI));
            PointScatterer::new(position, amplitude)
        })
        .collect();
    sparse_scene(geometry, scatterers)
}
