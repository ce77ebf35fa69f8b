//! # SAR Image Reconstruction Library
//!
//! This crate reconstructs 3D backscatter-reflectivity images from synthetic
//! aperture radar (SAR) phase-history measurements.
//!
//! ## Overview
//!
//! Measurements are modelled by an exact linear operator between a voxel grid
//! and the sampled phase history of every pulse. Inversion is iterative:
//!
//! - **Aperture**: Transmit/receive positions, scene reference points and frequency sampling
//! - **Geometry**: Voxel grids sized from the aperture's resolution, measurement shapes
//! - **Containers**: Complex buffers bound to exactly one geometry
//! - **Operator**: Forward model and its exact adjoint (backprojection)
//! - **Norm**: Spectral norm by power iteration, bounding the solver step
//! - **Solver**: Landweber iteration with optional regularization
//!
//! ## Signal Flow
//!
//! ```text
//! Scene x ──A──▶ Phase history y        (forward: simulate)
//! Phase history y ──Aᴴ──▶ Image         (adjoint: backproject)
//! y ──Landweber(A, Aᴴ, ‖A‖)──▶ x̂         (reconstruct)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sarsolver_core::{Aperture, GridGeometry, LandweberSolver, MeasurementGeometry, SarOperator, SolverConfig, Vec3};
//!
//! # fn main() -> sarsolver_core::SarResult<()> {
//! let track: Vec<Vec3> = (0..64)
//!     .map(|i| Vec3::new(2000.0, -30.0 + 60.0 * i as f64 / 63.0, 0.0))
//!     .collect();
//! let aperture = Aperture::new(track.clone(), track, vec![Vec3::ZERO; 64], 10.0e9, 300.0e6, 64)?;
//!
//! let grid = Arc::new(GridGeometry::from_aperture(&aperture, Vec3::ZERO, [10.0, 10.0, 0.0], 1.0)?);
//! let measurement = Arc::new(MeasurementGeometry::new(Arc::new(aperture)));
//! let operator = SarOperator::new(grid, measurement.clone());
//!
//! let measured = sarsolver_core::geometry::Geometry::allocate(&measurement);
//! let result = LandweberSolver::new(SolverConfig::default())?.solve(&operator, &measured)?;
//! println!("stopped after {} iterations: {:?}", result.iterations, result.stop_reason);
//! # Ok(())
//! # }
//! ```

pub mod aperture;
pub mod config;
pub mod container;
pub mod coordinates;
pub mod geometry;
pub mod norm;
pub mod observe;
pub mod operator;
pub mod solver;
pub mod types;

pub use aperture::{Aperture, ApertureConfig};
pub use config::{ConfigError, GridConfig, ReconstructionConfig};
pub use container::{DataContainer, MeasurementContainer, SceneContainer};
pub use coordinates::{bistatic_range, Vec3, SPEED_OF_LIGHT};
pub use geometry::{voxel_spacing, Geometry, GridGeometry, MeasurementGeometry};
pub use norm::{estimate_spectral_norm, NormEstimate, NormSource, PowerIterationConfig};
pub use operator::{OperatorConfig, PhaseReference, SarOperator};
pub use solver::{LandweberSolver, Reconstruction, Regularization, SolverConfig, StopReason};
pub use types::{Complex, SarError, SarResult};
