//! # Synthetic SAR Inputs
//!
//! Producers for everything the reconstruction core consumes, for tests,
//! benches and demos:
//!
//! - **Apertures**: straight monostatic or bistatic tracks
//! - **Scenes**: sparse point-scatterer reflectivity maps
//! - **Noise**: complex AWGN on phase-history measurements
//!
//! All randomness comes from a caller-supplied [`rand::Rng`], so a seeded
//! `StdRng` reproduces a run exactly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rand::{rngs::StdRng, SeedableRng};
//! use sarsolver_core::{GridGeometry, MeasurementGeometry, SarOperator, Vec3};
//! use sarsolver_sim::{add_complex_noise, linear_track_aperture, random_sparse_scene, LinearTrackConfig};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let aperture = linear_track_aperture(&LinearTrackConfig::default()).unwrap();
//! let grid = Arc::new(GridGeometry::from_aperture(&aperture, Vec3::ZERO, [8.0, 8.0, 0.0], 1.0).unwrap());
//! let operator = SarOperator::new(grid.clone(), Arc::new(MeasurementGeometry::new(Arc::new(aperture))));
//!
//! let truth = random_sparse_scene(&grid, 3, &mut rng).unwrap();
//! let mut measured = operator.forward(&truth.container).unwrap();
//! add_complex_noise(&mut measured, 20.0, &mut rng).unwrap();
//! ```

pub mod aperture;
pub mod noise;
pub mod scene;

pub use aperture::{linear_track_aperture, little_aperture, little_grid, LinearTrackConfig};
pub use noise::{add_complex_noise, noise_std_for_snr};
pub use scene::{random_sparse_scene, sparse_scene, PointScatterer, SparseScene};

use sarsolver_core::SarError;

/// Result type for synthetic input generation
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while generating synthetic inputs
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Generator parameter out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The core rejected the generated aperture, grid or container.
    #[error(transparent)]
    Core(#[from] SarError),
}
