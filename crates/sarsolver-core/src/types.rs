//! Core types for SAR image reconstruction
//!
//! Every buffer in the crate, scene reflectivities and phase-history samples
//! alike, is stored as complex `f64`.
//!
//! ## Phase history vs. scene
//!
//! ```text
//!   measurement space                       scene space
//!   [pulse][frequency]   <--- forward ---   [x][y][z] voxels
//!   complex samples      --- adjoint --->   complex reflectivity
//! ```

use crate::container::SceneContainer;
use num_complex::Complex64;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// Result type for reconstruction operations
pub type SarResult<T> = Result<T, SarError>;

/// Errors that can occur while building geometries or running the operator and solver
#[derive(Debug, Clone, thiserror::Error)]
pub enum SarError {
    /// Malformed aperture or grid parameters.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A buffer does not conform to its bound geometry.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Power iteration could not produce a usable spectral norm.
    #[error("Norm estimation failed: {0}")]
    NormEstimation(String),

    /// The solver residual grew past the configured bound.
    ///
    /// Carries the best estimate seen before the blow-up so that progress
    /// is not lost.
    #[error(
        "Solver diverged at iteration {iteration}: residual {residual_norm:.3e} \
         exceeds bound relative to initial {initial_residual_norm:.3e}"
    )]
    Divergence {
        iteration: usize,
        residual_norm: f64,
        initial_residual_norm: f64,
        best_residual_norm: f64,
        best_estimate: Box<SceneContainer>,
    },

    /// Operator or solver settings out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SarError {
    /// Check if this error was raised while validating inputs, before any work ran
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SarError::InvalidGeometry(_) | SarError::ShapeMismatch { .. } | SarError::InvalidConfig(_)
        )
    }

    /// Best estimate carried by a divergence error
    pub fn best_estimate(&self) -> Option<&SceneContainer> {
        match self {
            SarError::Divergence { best_estimate, .. } => Some(best_estimate),
            _ => None,
        }
    }

    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        SarError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
