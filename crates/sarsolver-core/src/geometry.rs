//! Scene and measurement geometries
//!
//! A geometry owns a shape; a [`DataContainer`] owns the numbers. Geometries
//! are immutable and shared through `Arc` by every container bound to them.
//!
//! ```text
//! GridGeometry         shape [nx, ny, nz]    index (i·ny + j)·nz + k
//! MeasurementGeometry  shape [pulses, freqs] index p·freqs + f
//! ```
//!
//! ## Voxel spacing
//!
//! Grids derived from an aperture use an isotropic spacing of
//! `min(ρ_range, ρ_cross) / safety_factor`, see [`voxel_spacing`]. A safety
//! factor above 1 oversamples the achievable resolution.

use std::fmt::Debug;
use std::sync::Arc;

use crate::aperture::Aperture;
use crate::container::DataContainer;
use crate::coordinates::Vec3;
use crate::types::{SarError, SarResult};

/// Shape descriptor shared by every container bound to it.
pub trait Geometry: Debug + PartialEq + Send + Sync + Sized {
    /// Row-major array shape.
    fn shape(&self) -> Vec<usize>;

    /// Total number of samples.
    fn len(&self) -> usize {
        self.shape().iter().product()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-filled container bound to this geometry.
    fn allocate(self: &Arc<Self>) -> DataContainer<Self> {
        DataContainer::zeros(Arc::clone(self))
    }
}

/// Smallest trajectory angle (radians) accepted when sizing a grid from an aperture.
pub const MIN_ANGULAR_EXTENT: f64 = 1.0e-6;

/// Isotropic voxel spacing resolving the aperture, oversampled by `safety_factor`.
pub fn voxel_spacing(aperture: &Aperture, safety_factor: f64) -> f64 {
    aperture
        .range_resolution()
        .min(aperture.cross_range_resolution())
        / safety_factor
}

/// Axis-aligned voxel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    centre: Vec3,
    counts: [usize; 3],
    spacing: [f64; 3],
}

impl GridGeometry {
    /// Explicit grid: voxel counts and spacing per axis.
    pub fn new(centre: Vec3, counts: [usize; 3], spacing: [f64; 3]) -> SarResult<Self> {
        if !centre.is_finite() {
            return Err(SarError::InvalidGeometry("grid centre must be finite".to_string()));
        }
        if counts.iter().any(|&n| n == 0) {
            return Err(SarError::InvalidGeometry(format!(
                "voxel counts must be at least 1, got {:?}",
                counts
            )));
        }
        if counts.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n)).is_none() {
            return Err(SarError::InvalidGeometry(format!(
                "voxel count overflows usize for counts {:?}",
                counts
            )));
        }
        if spacing.iter().any(|&d| !(d.is_finite() && d > 0.0)) {
            return Err(SarError::InvalidGeometry(format!(
                "voxel spacing must be positive and finite, got {:?}",
                spacing
            )));
        }
        Ok(Self { centre, counts, spacing })
    }

    /// Grid covering `extents` (full side lengths per axis) around `centre`,
    /// sampled finely enough to resolve `aperture`.
    ///
    /// A zero extent collapses that axis to a single voxel layer.
    pub fn from_aperture(
        aperture: &Aperture,
        centre: Vec3,
        extents: [f64; 3],
        safety_factor: f64,
    ) -> SarResult<Self> {
        if aperture.num_pulses() < 2 {
            return Err(SarError::InvalidGeometry(format!(
                "aperture needs at least 2 pulses to bound resolution, got {}",
                aperture.num_pulses()
            )));
        }
        // A stationary platform leaves cross-range unresolved
        if !(aperture.angular_extent() > MIN_ANGULAR_EXTENT && aperture.cross_range_resolution().is_finite()) {
            return Err(SarError::InvalidGeometry(
                "degenerate trajectory: zero angular extent".to_string(),
            ));
        }
        if extents.iter().any(|&e| !(e.is_finite() && e >= 0.0)) || extents.iter().all(|&e| e == 0.0) {
            return Err(SarError::InvalidGeometry(format!(
                "grid extents must be finite, non-negative and not all zero, got {:?}",
                extents
            )));
        }
        if !(safety_factor.is_finite() && safety_factor >= 1.0) {
            return Err(SarError::InvalidGeometry(format!(
                "safety factor must be at least 1, got {}",
                safety_factor
            )));
        }

        let spacing = voxel_spacing(aperture, safety_factor);
        let mut counts = [1usize; 3];
        for (count, &extent) in counts.iter_mut().zip(extents.iter()) {
            let cells = (extent / spacing).ceil();
            if !(cells.is_finite() && cells < usize::MAX as f64) {
                return Err(SarError::InvalidGeometry(format!(
                    "extent {} at spacing {} needs too many voxels",
                    extent, spacing
                )));
            }
            *count = (cells as usize).max(1);
        }

        tracing::debug!(
            ?counts,
            spacing,
            range_resolution = aperture.range_resolution(),
            cross_range_resolution = aperture.cross_range_resolution(),
            "Grid derived from aperture"
        );
        Self::new(centre, counts, [spacing; 3])
    }

    /// Like [`GridGeometry::from_aperture`], taking half-widths per axis.
    pub fn from_aperture_half_widths(
        aperture: &Aperture,
        centre: Vec3,
        half_widths: [f64; 3],
        safety_factor: f64,
    ) -> SarResult<Self> {
        let extents = half_widths.map(|h| 2.0 * h);
        Self::from_aperture(aperture, centre, extents, safety_factor)
    }

    pub fn centre(&self) -> Vec3 {
        self.centre
    }

    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn num_voxels(&self) -> usize {
        self.counts.iter().product()
    }

    /// Distance between the outermost voxel centres per axis (m).
    pub fn extents(&self) -> [f64; 3] {
        [0, 1, 2].map(|a| (self.counts[a] - 1) as f64 * self.spacing[a])
    }

    pub fn flat_index(&self, index: [usize; 3]) -> usize {
        let [_, ny, nz] = self.counts;
        (index[0] * ny + index[1]) * nz + index[2]
    }

    pub fn voxel_index(&self, flat: usize) -> [usize; 3] {
        let [_, ny, nz] = self.counts;
        [flat / (ny * nz), (flat / nz) % ny, flat % nz]
    }

    /// Centre of voxel `(i, j, k)`.
    pub fn voxel_position(&self, index: [usize; 3]) -> Vec3 {
        let offset = |a: usize| (index[a] as f64 - (self.counts[a] - 1) as f64 / 2.0) * self.spacing[a];
        self.centre + Vec3::new(offset(0), offset(1), offset(2))
    }

    /// Voxel centres in flat index order.
    pub fn voxel_positions(&self) -> Vec<Vec3> {
        (0..self.num_voxels())
            .map(|flat| self.voxel_position(self.voxel_index(flat)))
            .collect()
    }

    /// Voxel whose centre is closest to `point`, if the point lies within half
    /// a voxel of the grid.
    pub fn nearest_voxel(&self, point: &Vec3) -> Option<[usize; 3]> {
        let rel = (*point - self.centre).to_array();
        let mut index = [0usize; 3];
        for a in 0..3 {
            let pos = rel[a] / self.spacing[a] + (self.counts[a] - 1) as f64 / 2.0;
            let rounded = pos.round();
            if rounded < 0.0 || rounded >= self.counts[a] as f64 {
                return None;
            }
            index[a] = rounded as usize;
        }
        Some(index)
    }
}

impl Geometry for GridGeometry {
    fn shape(&self) -> Vec<usize> {
        self.counts.to_vec()
    }
}

/// Phase-history layout of an aperture: one row of frequency samples per pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementGeometry {
    aperture: Arc<Aperture>,
    simplified: bool,
}

impl MeasurementGeometry {
    pub fn new(aperture: Arc<Aperture>) -> Self {
        Self {
            aperture,
            simplified: false,
        }
    }

    /// Layout with a single scene reference point for the whole aperture.
    pub fn simplified(aperture: &Aperture) -> Self {
        Self {
            aperture: Arc::new(aperture.simplified()),
            simplified: true,
        }
    }

    pub fn aperture(&self) -> &Arc<Aperture> {
        &self.aperture
    }

    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    pub fn num_pulses(&self) -> usize {
        self.aperture.num_pulses()
    }

    pub fn num_frequencies(&self) -> usize {
        self.aperture.num_frequencies()
    }
}

impl Geometry for MeasurementGeometry {
    fn shape(&self) -> Vec<usize> {
        vec![self.num_pulses(), self.num_frequencies()]
    }
}
