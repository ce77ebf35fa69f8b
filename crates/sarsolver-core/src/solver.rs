//! Landweber reconstruction — gradient descent on ½‖A x − y‖²
//!
//! ## Iteration
//!
//! ```text
//! Init:     x₀ = 0 (or warm start)
//! Iterate:  r = A x − y
//!           g = Aᴴ r
//!           x ← x − τ·g          τ = step_scale / ‖A‖²
//!           x ← prox(x)          optional regularization step
//! Stop:     relative residual improvement < tolerance
//!           | residual == 0 | iteration budget spent | cancelled
//! ```
//!
//! With `τ ≤ 1/‖A‖²` the residual norm never increases. A divergence guard
//! still watches for misconfigured step sizes (for instance a wrong supplied
//! norm) and fails with [`SarError::Divergence`], handing back the best
//! estimate seen so far.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sarsolver_core::solver::{LandweberSolver, SolverConfig, Regularization};
//! # fn run(op: &sarsolver_core::operator::SarOperator,
//! #        y: &sarsolver_core::container::MeasurementContainer) -> sarsolver_core::types::SarResult<()> {
//! let solver = LandweberSolver::new(SolverConfig {
//!     max_iterations: 20,
//!     regularization: Regularization::NonNegative,
//!     ..Default::default()
//! })?;
//! let result = solver.solve(op, y)?;
//! println!("{} iterations, residual {:.3e}", result.iterations, result.final_residual_norm);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::container::{MeasurementContainer, SceneContainer};
use crate::geometry::Geometry;
use crate::operator::SarOperator;
use crate::types::{Complex, SarError, SarResult};

/// Residual history entries reserved up front.
const HISTORY_PREALLOCATION: usize = 1024;

/// Post-update step applied after every gradient step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regularization {
    /// Plain Landweber
    #[default]
    None,
    /// Project every voxel onto the non-negative reals
    NonNegative,
    /// Proximal shrink for a ½·weight·‖x‖² penalty
    Tikhonov { weight: f64 },
    /// Complex soft thresholding for a threshold·‖x‖₁ penalty (ISTA)
    SoftThreshold { threshold: f64 },
}

impl Regularization {
    fn validate(&self) -> SarResult<()> {
        let value = match *self {
            Regularization::Tikhonov { weight } => weight,
            Regularization::SoftThreshold { threshold } => threshold,
            Regularization::None | Regularization::NonNegative => return Ok(()),
        };
        if !(value.is_finite() && value >= 0.0) {
            return Err(SarError::InvalidConfig(format!(
                "regularization strength must be finite and non-negative, got {}",
                value
            )));
        }
        Ok(())
    }

    /// Apply the step to `estimate` for gradient step size `step`.
    pub fn apply(&self, estimate: &mut SceneContainer, step: f64) {
        match *self {
            Regularization::None => {}
            Regularization::NonNegative => {
                estimate.map_inplace(|v| *v = Complex::new(v.re.max(0.0), 0.0));
            }
            Regularization::Tikhonov { weight } => {
                estimate.scale(1.0 / (1.0 + step * weight));
            }
            Regularization::SoftThreshold { threshold } => {
                let t = step * threshold;
                estimate.map_inplace(|v| *v = soft_threshold(*v, t));
            }
        }
    }
}

/// Soft thresholding of a complex value's magnitude: S_t(z) = z · max(|z| − t, 0) / |z|
fn soft_threshold(z: Complex, t: f64) -> Complex {
    let mag = z.norm();
    if mag > t {
        z * ((mag - t) / mag)
    } else {
        Complex::new(0.0, 0.0)
    }
}

/// Landweber solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of gradient updates
    pub max_iterations: usize,
    /// Relative residual improvement below which the run is converged
    pub tolerance: f64,
    /// Fraction of the 1/‖A‖² step bound to use, in (0, 1]
    pub step_scale: f64,
    /// Residual growth over the initial residual that counts as divergence
    pub divergence_factor: f64,
    /// Consecutive diverging iterations tolerated before failing
    pub divergence_patience: usize,
    /// Post-update regularization step
    pub regularization: Regularization,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            step_scale: 1.0,
            divergence_factor: 10.0,
            divergence_patience: 3,
            regularization: Regularization::None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(SarError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if !(self.step_scale > 0.0 && self.step_scale <= 1.0) {
            return Err(SarError::InvalidConfig(format!(
                "step_scale must lie in (0, 1], got {}",
                self.step_scale
            )));
        }
        if !(self.divergence_factor.is_finite() && self.divergence_factor >= 1.0) {
            return Err(SarError::InvalidConfig(format!(
                "divergence_factor must be at least 1, got {}",
                self.divergence_factor
            )));
        }
        if self.divergence_patience == 0 {
            return Err(SarError::InvalidConfig(
                "divergence_patience must be at least 1".to_string(),
            ));
        }
        self.regularization.validate()
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Residual improvement fell below tolerance, or the residual vanished
    Converged,
    /// Iteration budget spent
    MaxIterations,
    /// Cancellation flag observed between iterations
    Cancelled,
}

/// Result of a reconstruction run.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Final scene estimate (the best one seen when cancelled)
    pub estimate: SceneContainer,
    /// Gradient updates applied
    pub iterations: usize,
    /// ‖A x₀ − y‖
    pub initial_residual_norm: f64,
    /// Residual norm of `estimate`
    pub final_residual_norm: f64,
    /// Residual norm before every update, plus the final one
    pub residual_history: Vec<f64>,
    pub stop_reason: StopReason,
    /// Step size τ used
    pub step_size: f64,
}

impl Reconstruction {
    /// Final residual relative to the initial one (0 when the initial residual is 0).
    pub fn relative_residual(&self) -> f64 {
        if self.initial_residual_norm > 0.0 {
            self.final_residual_norm / self.initial_residual_norm
        } else {
            0.0
        }
    }
}

/// Landweber iterative reconstruction.
#[derive(Debug, Clone)]
pub struct LandweberSolver {
    config: SolverConfig,
}

impl LandweberSolver {
    pub fn new(config: SolverConfig) -> SarResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Reconstruct a scene from `measured`, starting from zero.
    pub fn solve(&self, operator: &SarOperator, measured: &MeasurementContainer) -> SarResult<Reconstruction> {
        self.run(operator, measured, None, || false)
    }

    /// Reconstruct starting from `warm_start`.
    pub fn solve_from(
        &self,
        operator: &SarOperator,
        measured: &MeasurementContainer,
        warm_start: SceneContainer,
    ) -> SarResult<Reconstruction> {
        self.run(operator, measured, Some(warm_start), || false)
    }

    /// Reconstruct, checking `cancel` between iterations.
    pub fn solve_cancellable(
        &self,
        operator: &SarOperator,
        measured: &MeasurementContainer,
        warm_start: Option<SceneContainer>,
        cancel: &AtomicBool,
    ) -> SarResult<Reconstruction> {
        self.run(operator, measured, warm_start, || cancel.load(Ordering::Relaxed))
    }

    fn run(
        &self,
        operator: &SarOperator,
        measured: &MeasurementContainer,
        warm_start: Option<SceneContainer>,
        cancelled: impl Fn() -> bool,
    ) -> SarResult<Reconstruction> {
        measured.check_geometry(operator.measurement_geometry())?;
        let mut estimate = match warm_start {
            Some(start) => {
                start.check_geometry(operator.scene_geometry())?;
                start
            }
            None => operator.scene_geometry().allocate(),
        };

        let norm = operator.norm()?;
        let step = self.config.step_scale / (norm * norm);
        tracing::info!(
            norm,
            step,
            max_iterations = self.config.max_iterations,
            regularization = ?self.config.regularization,
            "Starting Landweber reconstruction"
        );

        let mut residual = operator.measurement_geometry().allocate();
        let mut gradient = operator.scene_geometry().allocate();
        let mut history = Vec::with_capacity(self.config.max_iterations.min(HISTORY_PREALLOCATION) + 1);
        // Lowest-residual iterate so far, copied into a buffer owned by the run
        let mut best = operator.scene_geometry().allocate();
        let mut best_norm = f64::INFINITY;
        let mut initial = 0.0;
        let mut strikes = 0;
        let mut iteration = 0;

        let stop_reason = loop {
            // r = A x − y
            operator.forward_into(&estimate, &mut residual)?;
            residual.sub_assign(measured)?;
            let residual_norm = residual.norm();
            if !residual_norm.is_finite() {
                return Err(self.divergence(iteration, residual_norm, initial, (best, best_norm), estimate));
            }
            if iteration == 0 {
                initial = residual_norm;
            }
            let previous = history.last().copied();
            history.push(residual_norm);
            tracing::trace!(iteration, residual_norm, "Landweber iteration");

            if residual_norm < best_norm {
                best.copy_from(&estimate)?;
                best_norm = residual_norm;
            }

            if residual_norm > self.config.divergence_factor * initial {
                strikes += 1;
                if strikes >= self.config.divergence_patience {
                    return Err(self.divergence(iteration, residual_norm, initial, (best, best_norm), estimate));
                }
            } else {
                strikes = 0;
            }

            if residual_norm == 0.0 {
                break StopReason::Converged;
            }
            if let Some(prev) = previous {
                let improvement = (prev - residual_norm) / prev;
                if (0.0..self.config.tolerance).contains(&improvement) {
                    break StopReason::Converged;
                }
            }
            if iteration >= self.config.max_iterations {
                break StopReason::MaxIterations;
            }
            if cancelled() {
                break StopReason::Cancelled;
            }

            // x ← prox(x − τ Aᴴ r)
            operator.adjoint_into(&residual, &mut gradient)?;
            estimate.axpy(-step, &gradient)?;
            self.config.regularization.apply(&mut estimate, step);
            iteration += 1;
        };

        let mut final_residual_norm = history.last().copied().unwrap_or(initial);
        if stop_reason == StopReason::Cancelled && best_norm < final_residual_norm {
            estimate = best;
            final_residual_norm = best_norm;
        }

        tracing::info!(
            iterations = iteration,
            initial_residual = initial,
            final_residual = final_residual_norm,
            ?stop_reason,
            "Landweber reconstruction finished"
        );

        Ok(Reconstruction {
            estimate,
            iterations: iteration,
            initial_residual_norm: initial,
            final_residual_norm,
            residual_history: history,
            stop_reason,
            step_size: step,
        })
    }

    fn divergence(
        &self,
        iteration: usize,
        residual_norm: f64,
        initial: f64,
        (best, best_norm): (SceneContainer, f64),
        current: SceneContainer,
    ) -> SarError {
        let (best_estimate, best_residual_norm) = if best_norm.is_finite() {
            (best, best_norm)
        } else {
            (current, residual_norm)
        };
        tracing::warn!(
            iteration,
            residual_norm,
            initial_residual = initial,
            best_residual = best_residual_norm,
            "Landweber reconstruction diverged"
        );
        SarError::Divergence {
            iteration,
            residual_norm,
            initial_residual_norm: initial,
            best_residual_norm,
            best_estimate: Box::new(best_estimate),
        }
    }
}
