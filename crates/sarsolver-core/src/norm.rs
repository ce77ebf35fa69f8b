//! Spectral norm estimation by power iteration
//!
//! Estimates σ_max(A) by iterating `v ← AᴴA v / ‖AᴴA v‖` from a seeded random
//! start vector. With `v` unit-norm, `‖AᴴA v‖ → σ²`. The solver uses the
//! result to bound its step size by `1/σ²`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::container::DataContainer;
use crate::operator::SarOperator;
use crate::types::{Complex, SarError, SarResult};

/// Power iteration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerIterationConfig {
    /// Maximum number of AᴴA applications
    pub max_iterations: usize,
    /// Relative change in σ at which the estimate is accepted
    pub tolerance: f64,
    /// Seed for the random start vector
    pub seed: u64,
}

impl Default for PowerIterationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            seed: 0x5A5_5A5,
        }
    }
}

impl PowerIterationConfig {
    pub fn validate(&self) -> SarResult<()> {
        if self.max_iterations == 0 {
            return Err(SarError::InvalidConfig(
                "power iteration needs at least one iteration".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SarError::InvalidConfig(format!(
                "power iteration tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Origin of an operator's cached norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormSource {
    /// Computed by power iteration
    Estimated { iterations: usize, converged: bool },
    /// Provided by the caller and treated as authoritative
    Supplied,
}

/// Spectral norm value with provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormEstimate {
    pub value: f64,
    pub source: NormSource,
}

/// Estimate the largest singular value of `operator`.
///
/// Fails with [`SarError::NormEstimation`] when the iterate collapses to zero
/// or stops being finite, which happens for degenerate operators such as an
/// empty aperture.
pub fn estimate_spectral_norm(operator: &SarOperator, config: &PowerIterationConfig) -> SarResult<NormEstimate> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut v = DataContainer::from_fn(operator.scene_geometry().clone(), |_| {
        Complex::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
    });
    let start_norm = v.norm();
    if start_norm <= f64::MIN_POSITIVE {
        return Err(SarError::NormEstimation("empty scene geometry".to_string()));
    }
    v.scale(1.0 / start_norm);

    let mut sigma = 0.0;
    for iteration in 1..=config.max_iterations {
        let w = operator.normal(&v)?;
        let growth = w.norm();
        if !growth.is_finite() || growth <= f64::MIN_POSITIVE {
            return Err(SarError::NormEstimation(format!(
                "iterate collapsed at iteration {} (growth {:e})",
                iteration, growth
            )));
        }

        let next_sigma = growth.sqrt();
        v = w;
        v.scale(1.0 / growth);

        let change = (next_sigma - sigma).abs() / next_sigma;
        tracing::trace!(iteration, sigma = next_sigma, change, "Power iteration");
        if iteration > 1 && change < config.tolerance {
            tracing::debug!(iterations = iteration, norm = next_sigma, "Spectral norm converged");
            return Ok(NormEstimate {
                value: next_sigma,
                source: NormSource::Estimated {
                    iterations: iteration,
                    converged: true,
                },
            });
        }
        sigma = next_sigma;
    }

    tracing::warn!(
        iterations = config.max_iterations,
        norm = sigma,
        "Spectral norm did not converge; using last estimate"
    );
    Ok(NormEstimate {
        value: sigma,
        source: NormSource::Estimated {
            iterations: config.max_iterations,
            converged: false,
        },
    })
}
