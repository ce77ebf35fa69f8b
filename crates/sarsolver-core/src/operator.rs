//! SAR Operator — exact forward model and backprojection
//!
//! Linear map between scene space (voxel reflectivities) and measurement space
//! (phase history), evaluated by dense summation over voxels so arbitrary 3D
//! trajectories are modelled without far-field or FFT approximations.
//!
//! ## Model
//!
//! ```text
//! R_p(x)   = |x − tx_p| + |x − rx_p| − R_p(srp_p)        (SRP-relative)
//! y[p, k]  = w_p · H_k · Σ_v s_v · exp(−j·2π·f_k·R_p(x_v)/c)            forward
//! s[v]     = Σ_p w_p · Σ_k conj(H_k) · y[p, k] · exp(+j·2π·f_k·R_p(x_v)/c)   adjoint
//! ```
//!
//! `w_p` is the optional slow-time weighting and `H_k` the optional waveform
//! spectrum; both default to 1.
//!
//! The adjoint is the exact conjugate transpose, so
//! `⟨A x, y⟩ = ⟨x, Aᴴ y⟩` up to rounding.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sarsolver_core::aperture::Aperture;
//! use sarsolver_core::coordinates::Vec3;
//! use sarsolver_core::geometry::{Geometry, GridGeometry, MeasurementGeometry};
//! use sarsolver_core::operator::SarOperator;
//! use sarsolver_core::types::Complex;
//!
//! let track: Vec<Vec3> = (0..8)
//!     .map(|i| Vec3::new(2000.0, -30.0 + 60.0 * i as f64 / 7.0, 0.0))
//!     .collect();
//! let aperture = Arc::new(
//!     Aperture::new(track.clone(), track, vec![Vec3::ZERO; 8], 10.0e9, 300.0e6, 16).unwrap(),
//! );
//! let grid = Arc::new(GridGeometry::new(Vec3::ZERO, [4, 4, 1], [0.5; 3]).unwrap());
//! let meas = Arc::new(MeasurementGeometry::new(aperture));
//! let op = SarOperator::new(grid.clone(), meas);
//!
//! let mut scene = grid.allocate();
//! scene.as_mut_slice()[5] = Complex::new(1.0, 0.0);
//! let phase_history = op.forward(&scene).unwrap();
//! assert_eq!(phase_history.shape(), vec![8, 16]);
//! ```

use std::f64::consts::PI;
use std::sync::{Arc, OnceLock};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::container::{MeasurementContainer, SceneContainer};
use crate::coordinates::{bistatic_range, Vec3};
use crate::geometry::{Geometry, GridGeometry, MeasurementGeometry};
use crate::norm::{estimate_spectral_norm, NormEstimate, NormSource, PowerIterationConfig};
use crate::types::{Complex, SarError, SarResult};

/// Bins between exact phasor evaluations in the frequency recurrence.
const PHASOR_REFRESH_INTERVAL: usize = 64;

/// Range origin for the phase of each pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseReference {
    /// Ranges measured relative to the pulse's scene reference point
    #[default]
    SceneReferencePoint,
    /// Absolute bistatic ranges
    Absolute,
}

/// Operator settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Phase origin per pulse
    pub phase_reference: PhaseReference,
    /// Spectral norm estimation settings
    pub power_iteration: PowerIterationConfig,
}

impl OperatorConfig {
    pub fn validate(&self) -> SarResult<()> {
        self.power_iteration.validate()
    }
}

/// Phasors exp(−j·(k0 + k·dk)·r) for every frequency bin, by recurrence.
#[derive(Debug, Clone, Copy)]
struct PhaseRamp {
    /// 2π·f_0 / c (rad/m)
    k0: f64,
    /// 2π·Δf / c (rad/m)
    dk: f64,
    bins: usize,
}

impl PhaseRamp {
    #[inline]
    fn for_each(&self, range: f64, mut f: impl FnMut(usize, Complex)) {
        let step = Complex::from_polar(1.0, -self.dk * range);
        let mut phasor = Complex::new(0.0, 0.0);
        for k in 0..self.bins {
            if k % PHASOR_REFRESH_INTERVAL == 0 {
                phasor = Complex::from_polar(1.0, -(self.k0 + k as f64 * self.dk) * range);
            }
            f(k, phasor);
            phasor *= step;
        }
    }
}

/// Forward/adjoint SAR measurement operator for one scene/measurement geometry pair.
#[derive(Debug, Clone)]
pub struct SarOperator {
    scene: Arc<GridGeometry>,
    measurement: Arc<MeasurementGeometry>,
    config: OperatorConfig,
    slow_time_weights: Option<Vec<f64>>,
    waveform_spectrum: Option<Vec<Complex>>,
    voxel_positions: Vec<Vec3>,
    reference_ranges: Vec<f64>,
    ramp: PhaseRamp,
    norm: OnceLock<NormEstimate>,
}

impl SarOperator {
    /// Create an operator with default settings.
    pub fn new(scene: Arc<GridGeometry>, measurement: Arc<MeasurementGeometry>) -> Self {
        Self::build(scene, measurement, OperatorConfig::default())
    }

    /// Create an operator with explicit settings.
    pub fn with_config(
        scene: Arc<GridGeometry>,
        measurement: Arc<MeasurementGeometry>,
        config: OperatorConfig,
    ) -> SarResult<Self> {
        config.validate()?;
        Ok(Self::build(scene, measurement, config))
    }

    fn build(scene: Arc<GridGeometry>, measurement: Arc<MeasurementGeometry>, config: OperatorConfig) -> Self {
        let aperture = measurement.aperture();
        let reference_ranges = match config.phase_reference {
            PhaseReference::SceneReferencePoint => (0..aperture.num_pulses())
                .map(|p| {
                    bistatic_range(
                        &aperture.transmit_positions()[p],
                        &aperture.receive_positions()[p],
                        &aperture.scene_reference_points()[p],
                    )
                })
                .collect(),
            PhaseReference::Absolute => vec![0.0; aperture.num_pulses()],
        };
        let c = aperture.propagation_speed();
        let ramp = PhaseRamp {
            k0: 2.0 * PI * aperture.frequency(0) / c,
            dk: 2.0 * PI * aperture.frequency_step() / c,
            bins: aperture.num_frequencies(),
        };
        let voxel_positions = scene.voxel_positions();

        tracing::debug!(
            voxels = voxel_positions.len(),
            pulses = aperture.num_pulses(),
            frequencies = aperture.num_frequencies(),
            phase_reference = ?config.phase_reference,
            "SAR operator created"
        );

        Self {
            scene,
            measurement,
            config,
            slow_time_weights: None,
            waveform_spectrum: None,
            voxel_positions,
            reference_ranges,
            ramp,
            norm: OnceLock::new(),
        }
    }

    /// Apply a real, non-negative weight per pulse (slow-time taper).
    ///
    /// Discards any cached norm, since the weighting changes the operator.
    pub fn with_slow_time_weighting(mut self, weights: Vec<f64>) -> SarResult<Self> {
        let num_pulses = self.measurement.num_pulses();
        if weights.len() != num_pulses {
            return Err(SarError::shape_mismatch(&[num_pulses], &[weights.len()]));
        }
        if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(SarError::InvalidConfig(
                "slow-time weights must be finite and non-negative".to_string(),
            ));
        }
        self.slow_time_weights = Some(weights);
        self.norm = OnceLock::new();
        Ok(self)
    }

    /// Shape every pulse by a complex waveform spectrum, one value per frequency bin.
    ///
    /// Discards any cached norm.
    pub fn with_waveform_spectrum(mut self, spectrum: Vec<Complex>) -> SarResult<Self> {
        let num_frequencies = self.measurement.num_frequencies();
        if spectrum.len() != num_frequencies {
            return Err(SarError::shape_mismatch(&[num_frequencies], &[spectrum.len()]));
        }
        if spectrum.iter().any(|h| !(h.re.is_finite() && h.im.is_finite())) {
            return Err(SarError::InvalidConfig("waveform spectrum must be finite".to_string()));
        }
        self.waveform_spectrum = Some(spectrum);
        self.norm = OnceLock::new();
        Ok(self)
    }

    /// Supply an authoritative spectral norm, skipping power iteration.
    pub fn with_norm(mut self, norm: f64) -> SarResult<Self> {
        if !(norm.is_finite() && norm > 0.0) {
            return Err(SarError::InvalidConfig(format!(
                "supplied norm must be positive and finite, got {}",
                norm
            )));
        }
        self.norm = OnceLock::from(NormEstimate {
            value: norm,
            source: NormSource::Supplied,
        });
        Ok(self)
    }

    pub fn scene_geometry(&self) -> &Arc<GridGeometry> {
        &self.scene
    }

    pub fn measurement_geometry(&self) -> &Arc<MeasurementGeometry> {
        &self.measurement
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    pub fn slow_time_weights(&self) -> Option<&[f64]> {
        self.slow_time_weights.as_deref()
    }

    pub fn waveform_spectrum(&self) -> Option<&[Complex]> {
        self.waveform_spectrum.as_deref()
    }

    /// Spectral norm ‖A‖, estimated on first use and cached.
    pub fn norm(&self) -> SarResult<f64> {
        if let Some(estimate) = self.norm.get() {
            return Ok(estimate.value);
        }
        let estimate = estimate_spectral_norm(self, &self.config.power_iteration)?;
        Ok(self.norm.get_or_init(|| estimate).value)
    }

    /// Cached norm and where it came from, if any.
    pub fn norm_estimate(&self) -> Option<&NormEstimate> {
        self.norm.get()
    }

    pub fn norm_source(&self) -> Option<NormSource> {
        self.norm.get().map(|e| e.source)
    }

    /// Discard the cached norm (estimated or supplied) and run power iteration again.
    pub fn recompute_norm(&mut self) -> SarResult<f64> {
        let estimate = estimate_spectral_norm(self, &self.config.power_iteration)?;
        self.norm = OnceLock::from(estimate);
        Ok(estimate.value)
    }

    /// Simulate phase history from a scene.
    pub fn forward(&self, scene: &SceneContainer) -> SarResult<MeasurementContainer> {
        let mut out = self.measurement.allocate();
        self.forward_into(scene, &mut out)?;
        Ok(out)
    }

    /// Simulate phase history into an existing measurement buffer.
    pub fn forward_into(&self, scene: &SceneContainer, out: &mut MeasurementContainer) -> SarResult<()> {
        scene.check_geometry(&self.scene)?;
        out.check_geometry(&self.measurement)?;

        let values = scene.as_slice();
        let bins = self.ramp.bins;

        #[cfg(feature = "parallel")]
        out.as_mut_slice()
            .par_chunks_mut(bins)
            .enumerate()
            .for_each(|(p, row)| self.forward_pulse(p, values, row));

        #[cfg(not(feature = "parallel"))]
        out.as_mut_slice()
            .chunks_mut(bins)
            .enumerate()
            .for_each(|(p, row)| self.forward_pulse(p, values, row));

        Ok(())
    }

    /// Backproject phase history into the scene grid.
    pub fn adjoint(&self, data: &MeasurementContainer) -> SarResult<SceneContainer> {
        let mut out = self.scene.allocate();
        self.adjoint_into(data, &mut out)?;
        Ok(out)
    }

    /// Backproject phase history into an existing scene buffer.
    pub fn adjoint_into(&self, data: &MeasurementContainer, out: &mut SceneContainer) -> SarResult<()> {
        data.check_geometry(&self.measurement)?;
        out.check_geometry(&self.scene)?;

        let values = data.as_slice();

        #[cfg(feature = "parallel")]
        out.as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(v, cell)| *cell = self.adjoint_voxel(v, values));

        #[cfg(not(feature = "parallel"))]
        out.as_mut_slice()
            .iter_mut()
            .enumerate()
            .for_each(|(v, cell)| *cell = self.adjoint_voxel(v, values));

        Ok(())
    }

    /// Normal operator AᴴA applied to a scene.
    pub fn normal(&self, scene: &SceneContainer) -> SarResult<SceneContainer> {
        let simulated = self.forward(scene)?;
        self.adjoint(&simulated)
    }

    #[inline]
    fn weight(&self, p: usize) -> f64 {
        self.slow_time_weights.as_ref().map_or(1.0, |w| w[p])
    }

    /// Phase range of voxel `v` for pulse `p`.
    #[inline]
    fn range(&self, p: usize, v: usize) -> f64 {
        let aperture = self.measurement.aperture();
        bistatic_range(
            &aperture.transmit_positions()[p],
            &aperture.receive_positions()[p],
            &self.voxel_positions[v],
        ) - self.reference_ranges[p]
    }

    fn forward_pulse(&self, p: usize, scene: &[Complex], row: &mut [Complex]) {
        let zero = Complex::new(0.0, 0.0);
        row.fill(zero);
        let weight = self.weight(p);
        if weight == 0.0 {
            return;
        }
        for (v, &s) in scene.iter().enumerate() {
            if s == zero {
                continue;
            }
            let amplitude = s * weight;
            self.ramp.for_each(self.range(p, v), |k, phasor| row[k] += amplitude * phasor);
        }
        if let Some(spectrum) = &self.waveform_spectrum {
            row.iter_mut().zip(spectrum).for_each(|(y, h)| *y *= *h);
        }
    }

    fn adjoint_voxel(&self, v: usize, data: &[Complex]) -> Complex {
        let bins = self.ramp.bins;
        let mut acc = Complex::new(0.0, 0.0);
        for (p, row) in data.chunks_exact(bins).enumerate() {
            let weight = self.weight(p);
            if weight == 0.0 {
                continue;
            }
            let mut pulse_acc = Complex::new(0.0, 0.0);
            match &self.waveform_spectrum {
                Some(spectrum) => self.ramp.for_each(self.range(p, v), |k, phasor| {
                    pulse_acc += row[k] * (spectrum[k] * phasor).conj()
                }),
                None => self
                    .ramp
                    .for_each(self.range(p, v), |k, phasor| pulse_acc += row[k] * phasor.conj()),
            }
            acc += pulse_acc * weight;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aperture::Aperture;
    use crate::container::DataContainer;
    use crate::coordinates::SPEED_OF_LIGHT;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn aperture(num_pulses: usize, num_freqs: usize) -> Arc<Aperture> {
        let tx: Vec<Vec3> = (0..num_pulses)
            .map(|i| Vec3::new(2000.0, -30.0 + 60.0 * i as f64 / (num_pulses - 1) as f64, 0.0))
            .collect();
        Arc::new(Aperture::new(tx.clone(), tx, vec![Vec3::ZERO; num_pulses], 10.0e9, 300.0e6, num_freqs).unwrap())
    }

    fn operator(config: OperatorConfig) -> SarOperator {
        let grid = Arc::new(GridGeometry::new(Vec3::ZERO, [5, 4, 2], [0.5, 0.5, 0.5]).unwrap());
        let meas = Arc::new(MeasurementGeometry::new(aperture(9, 70)));
        SarOperator::with_config(grid, meas, config).unwrap()
    }

    fn random<G: Geometry>(geometry: &Arc<G>, rng: &mut StdRng) -> DataContainer<G> {
        DataContainer::from_fn(geometry.clone(), |_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
    }

    #[test]
    fn test_single_scatterer_matches_closed_form() {
        let op = operator(OperatorConfig {
            phase_reference: PhaseReference::Absolute,
            ..Default::default()
        });
        let grid = op.scene_geometry().clone();
        let mut scene = grid.allocate();
        let voxel = [3, 1, 0];
        let amplitude = Complex::new(0.5, -2.0);
        scene.as_mut_slice()[grid.flat_index(voxel)] = amplitude;

        let y = op.forward(&scene).unwrap();
        let ap = op.measurement_geometry().aperture().clone();
        let x = grid.voxel_position(voxel);
        for p in [0, 4, 8] {
            let r = bistatic_range(&ap.transmit_positions()[p], &ap.receive_positions()[p], &x);
            for k in [0, 1, 63, 64, 65, 69] {
                let phase = -2.0 * PI * ap.frequency(k) * r / SPEED_OF_LIGHT;
                let expected = amplitude * Complex::from_polar(1.0, phase);
                let got = y.pulse(p)[k];
                assert!((got - expected).norm() < 1e-7, "p={p} k={k}: {got} vs {expected}");
            }
        }
    }

    #[test]
    fn test_adjoint_contract() {
        for reference in [PhaseReference::SceneReferencePoint, PhaseReference::Absolute] {
            let op = operator(OperatorConfig {
                phase_reference: reference,
                ..Default::default()
            });
            let mut rng = StdRng::seed_from_u64(7);
            let x = random(op.scene_geometry(), &mut rng);
            let y = random(op.measurement_geometry(), &mut rng);

            let lhs = op.forward(&x).unwrap().inner(&y).unwrap();
            let rhs = x.inner(&op.adjoint(&y).unwrap()).unwrap();
            let rel = (lhs - rhs).norm() / lhs.norm().max(rhs.norm());
            assert!(rel < 1e-6, "{reference:?}: relative adjoint error {rel:.3e}");
        }
    }

    #[test]
    fn test_weighted_adjoint_contract() {
        let weights: Vec<f64> = (0..9).map(|p| 0.5 + p as f64 / 8.0).collect();
        let op = operator(OperatorConfig::default()).with_slow_time_weighting(weights).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let x = random(op.scene_geometry(), &mut rng);
        let y = random(op.measurement_geometry(), &mut rng);
        let lhs = op.forward(&x).unwrap().inner(&y).unwrap();
        let rhs = x.inner(&op.adjoint(&y).unwrap()).unwrap();
        assert!((lhs - rhs).norm() / lhs.norm() < 1e-6);
    }

    #[test]
    fn test_zero_scene_stays_zero() {
        let op = operator(OperatorConfig::default());
        let zero = op.scene_geometry().allocate();
        let back = op.normal(&zero).unwrap();
        assert_eq!(back.norm(), 0.0);
    }

    #[test]
    fn test_zero_weight_pulse_is_silent() {
        let mut weights = vec![1.0; 9];
        weights[2] = 0.0;
        let op = operator(OperatorConfig::default()).with_slow_time_weighting(weights).unwrap();
        let mut scene = op.scene_geometry().allocate();
        scene.fill(Complex::new(1.0, 0.0));
        let y = op.forward(&scene).unwrap();
        assert!(y.pulse(2).iter().all(|v| v.norm() == 0.0));
        assert!(y.pulse(3).iter().any(|v| v.norm() > 0.0));
    }

    #[test]
    fn test_invalid_weighting() {
        let op = operator(OperatorConfig::default());
        assert!(matches!(
            op.clone().with_slow_time_weighting(vec![1.0; 3]),
            Err(SarError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            op.with_slow_time_weighting(vec![-1.0; 9]),
            Err(SarError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_waveform_spectrum_shapes_bins() {
        let op = operator(OperatorConfig::default());
        let spectrum: Vec<Complex> = (0..70).map(|k| Complex::from_polar(0.5 + k as f64 / 70.0, 0.1 * k as f64)).collect();
        let shaped = op.clone().with_waveform_spectrum(spectrum.clone()).unwrap();
        assert_eq!(shaped.waveform_spectrum(), Some(spectrum.as_slice()));

        let mut rng = StdRng::seed_from_u64(5);
        let x = random(op.scene_geometry(), &mut rng);
        let plain = op.forward(&x).unwrap();
        let y = shaped.forward(&x).unwrap();
        for p in [0, 8] {
            for k in [0, 33, 69] {
                assert!((y.pulse(p)[k] - plain.pulse(p)[k] * spectrum[k]).norm() < 1e-9);
            }
        }

        let d = random(op.measurement_geometry(), &mut rng);
        let lhs = y.inner(&d).unwrap();
        let rhs = x.inner(&shaped.adjoint(&d).unwrap()).unwrap();
        assert!((lhs - rhs).norm() / lhs.norm() < 1e-6);
    }

    #[test]
    fn test_waveform_spectrum_discards_norm() {
        let op = operator(OperatorConfig::default()).with_norm(10.0).unwrap();
        let op = op.with_waveform_spectrum(vec![Complex::new(2.0, 0.0); 70]).unwrap();
        assert_eq!(op.norm_source(), None);

        let unit = operator(OperatorConfig::default());
        let doubled = unit.clone().with_waveform_spectrum(vec![Complex::new(2.0, 0.0); 70]).unwrap();
        let ratio = doubled.norm().unwrap() / unit.norm().unwrap();
        assert!((ratio - 2.0).abs() < 1e-3, "ratio {ratio}");
    }

    #[test]
    fn test_invalid_waveform_spectrum() {
        let op = operator(OperatorConfig::default());
        assert!(matches!(
            op.clone().with_waveform_spectrum(vec![Complex::new(1.0, 0.0); 69]),
            Err(SarError::ShapeMismatch { .. })
        ));
        let mut spectrum = vec![Complex::new(1.0, 0.0); 70];
        spectrum[3] = Complex::new(f64::NAN, 0.0);
        assert!(matches!(op.with_waveform_spectrum(spectrum), Err(SarError::InvalidConfig(_))));
    }

    #[test]
    fn test_geometry_enforced() {
        let op = operator(OperatorConfig::default());
        let other = Arc::new(GridGeometry::new(Vec3::ZERO, [2, 2, 2], [0.5; 3]).unwrap());
        let foreign = other.allocate();
        assert!(matches!(op.forward(&foreign), Err(SarError::ShapeMismatch { .. })));

        let mut out = op.scene_geometry().allocate();
        let wrong_meas = Arc::new(MeasurementGeometry::new(aperture(3, 4))).allocate();
        assert!(op.adjoint_into(&wrong_meas, &mut out).is_err());
    }

    #[test]
    fn test_supplied_norm_is_authoritative() {
        let op = operator(OperatorConfig::default()).with_norm(756.6231381576064).unwrap();
        assert_eq!(op.norm().unwrap(), 756.6231381576064);
        assert_eq!(op.norm_source(), Some(NormSource::Supplied));

        let mut op = op;
        let estimated = op.recompute_norm().unwrap();
        assert!(estimated != 756.6231381576064);
        assert!(matches!(op.norm_source(), Some(NormSource::Estimated { .. })));

        assert!(operator(OperatorConfig::default()).with_norm(0.0).is_err());
        assert!(operator(OperatorConfig::default()).with_norm(f64::NAN).is_err());
    }

    #[test]
    fn test_forward_into_reuses_buffer() {
        let op = operator(OperatorConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        let x = random(op.scene_geometry(), &mut rng);
        let mut out = op.measurement_geometry().allocate();
        out.fill(Complex::new(9.0, 9.0));
        op.forward_into(&x, &mut out).unwrap();
        assert_eq!(out, op.forward(&x).unwrap());
    }
}
