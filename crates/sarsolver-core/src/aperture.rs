//! Aperture — sensor geometry and frequency sampling per pulse
//!
//! An aperture is the synthetic antenna traced out by the sensor: one transmit
//! position, one receive position and one scene reference point (SRP) per
//! pulse, plus the frequency grid sampled within every pulse.
//!
//! ## Frequency grid
//!
//! ```text
//! f_k = f_c + (k − ⌊N/2⌋)·Δf,    Δf = f_s / N,    k = 0..N
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sarsolver_core::aperture::Aperture;
//! use sarsolver_core::coordinates::Vec3;
//!
//! let track: Vec<Vec3> = (0..8)
//!     .map(|i| Vec3::new(2000.0, -30.0 + 60.0 * i as f64 / 7.0, 0.0))
//!     .collect();
//! let srps = vec![Vec3::ZERO; track.len()];
//! let aperture = Aperture::new(track.clone(), track, srps, 10.0e9, 300.0e6, 64).unwrap();
//!
//! assert_eq!(aperture.num_pulses(), 8);
//! assert!((aperture.range_resolution() - 0.4997).abs() < 1e-3);
//! ```

use crate::coordinates::{Vec3, SPEED_OF_LIGHT};
use crate::types::{SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Serializable construction record for an [`Aperture`].
///
/// Positions are `[x, y, z]` triples in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureConfig {
    /// Transmit antenna position per pulse
    pub transmit_positions: Vec<[f64; 3]>,
    /// Receive antenna position per pulse
    pub receive_positions: Vec<[f64; 3]>,
    /// Scene reference point per pulse
    pub scene_reference_points: Vec<[f64; 3]>,
    /// Centre frequency (Hz)
    pub centre_frequency: f64,
    /// Sample frequency, i.e. sampled bandwidth (Hz)
    pub sample_frequency: f64,
    /// Frequency samples per pulse
    pub num_frequencies: usize,
    /// Effective propagation speed (m/s), vacuum light speed when absent
    #[serde(default)]
    pub propagation_speed: Option<f64>,
}

/// Immutable pulse-by-pulse sensor geometry and frequency sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    transmit_positions: Vec<Vec3>,
    receive_positions: Vec<Vec3>,
    scene_reference_points: Vec<Vec3>,
    centre_frequency: f64,
    sample_frequency: f64,
    num_frequencies: usize,
    propagation_speed: f64,
}

impl Aperture {
    /// Create an aperture propagating at the vacuum speed of light.
    pub fn new(
        transmit_positions: Vec<Vec3>,
        receive_positions: Vec<Vec3>,
        scene_reference_points: Vec<Vec3>,
        centre_frequency: f64,
        sample_frequency: f64,
        num_frequencies: usize,
    ) -> SarResult<Self> {
        Self::with_propagation_speed(
            transmit_positions,
            receive_positions,
            scene_reference_points,
            centre_frequency,
            sample_frequency,
            num_frequencies,
            SPEED_OF_LIGHT,
        )
    }

    /// Create an aperture with an explicit effective propagation speed.
    pub fn with_propagation_speed(
        transmit_positions: Vec<Vec3>,
        receive_positions: Vec<Vec3>,
        scene_reference_points: Vec<Vec3>,
        centre_frequency: f64,
        sample_frequency: f64,
        num_frequencies: usize,
        propagation_speed: f64,
    ) -> SarResult<Self> {
        let num_pulses = transmit_positions.len();
        if receive_positions.len() != num_pulses || scene_reference_points.len() != num_pulses {
            return Err(SarError::InvalidGeometry(format!(
                "pulse count mismatch: {} transmit, {} receive, {} scene reference points",
                num_pulses,
                receive_positions.len(),
                scene_reference_points.len()
            )));
        }
        for (name, value) in [
            ("centre_frequency", centre_frequency),
            ("sample_frequency", sample_frequency),
            ("propagation_speed", propagation_speed),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SarError::InvalidGeometry(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if num_frequencies == 0 {
            return Err(SarError::InvalidGeometry(
                "num_frequencies must be at least 1".to_string(),
            ));
        }
        let all_finite = transmit_positions
            .iter()
            .chain(&receive_positions)
            .chain(&scene_reference_points)
            .all(Vec3::is_finite);
        if !all_finite {
            return Err(SarError::InvalidGeometry(
                "aperture positions must be finite".to_string(),
            ));
        }

        Ok(Self {
            transmit_positions,
            receive_positions,
            scene_reference_points,
            centre_frequency,
            sample_frequency,
            num_frequencies,
            propagation_speed,
        })
    }

    /// Build an aperture from its serializable record.
    pub fn from_config(config: &ApertureConfig) -> SarResult<Self> {
        let to_vec3 = |v: &[[f64; 3]]| v.iter().copied().map(Vec3::from_array).collect::<Vec<_>>();
        Self::with_propagation_speed(
            to_vec3(&config.transmit_positions),
            to_vec3(&config.receive_positions),
            to_vec3(&config.scene_reference_points),
            config.centre_frequency,
            config.sample_frequency,
            config.num_frequencies,
            config.propagation_speed.unwrap_or(SPEED_OF_LIGHT),
        )
    }

    /// Serializable record of this aperture.
    pub fn to_config(&self) -> ApertureConfig {
        let to_arrays = |v: &[Vec3]| v.iter().map(|p| p.to_array()).collect::<Vec<_>>();
        ApertureConfig {
            transmit_positions: to_arrays(&self.transmit_positions),
            receive_positions: to_arrays(&self.receive_positions),
            scene_reference_points: to_arrays(&self.scene_reference_points),
            centre_frequency: self.centre_frequency,
            sample_frequency: self.sample_frequency,
            num_frequencies: self.num_frequencies,
            propagation_speed: Some(self.propagation_speed),
        }
    }

    /// Copy of this aperture with a single SRP (the mean) shared by every pulse.
    pub fn simplified(&self) -> Self {
        let srp = self.mean_scene_reference_point();
        Self {
            scene_reference_points: vec![srp; self.num_pulses()],
            ..self.clone()
        }
    }

    pub fn num_pulses(&self) -> usize {
        self.transmit_positions.len()
    }

    pub fn num_frequencies(&self) -> usize {
        self.num_frequencies
    }

    pub fn transmit_positions(&self) -> &[Vec3] {
        &self.transmit_positions
    }

    pub fn receive_positions(&self) -> &[Vec3] {
        &self.receive_positions
    }

    pub fn scene_reference_points(&self) -> &[Vec3] {
        &self.scene_reference_points
    }

    pub fn centre_frequency(&self) -> f64 {
        self.centre_frequency
    }

    pub fn sample_frequency(&self) -> f64 {
        self.sample_frequency
    }

    pub fn propagation_speed(&self) -> f64 {
        self.propagation_speed
    }

    /// Spacing between adjacent frequency samples (Hz)
    pub fn frequency_step(&self) -> f64 {
        self.sample_frequency / self.num_frequencies as f64
    }

    /// Frequency of bin `k` (Hz)
    pub fn frequency(&self, k: usize) -> f64 {
        let offset = k as f64 - (self.num_frequencies / 2) as f64;
        self.centre_frequency + offset * self.frequency_step()
    }

    /// All sampled frequencies in bin order (Hz)
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.num_frequencies).map(|k| self.frequency(k)).collect()
    }

    /// Sampled bandwidth (Hz)
    pub fn bandwidth(&self) -> f64 {
        self.sample_frequency
    }

    /// Wavelength at the centre frequency (m)
    pub fn centre_wavelength(&self) -> f64 {
        self.propagation_speed / self.centre_frequency
    }

    pub fn mean_scene_reference_point(&self) -> Vec3 {
        Vec3::mean(&self.scene_reference_points)
    }

    /// Range resolution (m) = c / (2 * B).
    pub fn range_resolution(&self) -> f64 {
        self.propagation_speed / (2.0 * self.bandwidth())
    }

    /// Bistatic look direction of pulse `p` as seen from `origin`: the unit
    /// bisector of the transmit and receive lines of sight.
    pub fn look_direction(&self, p: usize, origin: &Vec3) -> Option<Vec3> {
        let to_tx = (self.transmit_positions[p] - *origin).normalized()?;
        let to_rx = (self.receive_positions[p] - *origin).normalized()?;
        (to_tx + to_rx).normalized()
    }

    /// Angle subtended by the trajectory at the mean SRP (radians).
    ///
    /// Measured as the largest angle between the first pulse's look direction
    /// and any other pulse's.
    pub fn angular_extent(&self) -> f64 {
        let origin = self.mean_scene_reference_point();
        let mut looks = (0..self.num_pulses()).filter_map(|p| self.look_direction(p, &origin));
        let Some(first) = looks.next() else {
            return 0.0;
        };
        looks.map(|d| first.angle_to(&d)).fold(0.0, f64::max)
    }

    /// Cross-range resolution (m) = λ_c / (2 Δθ); infinite for a zero-extent aperture.
    pub fn cross_range_resolution(&self) -> f64 {
        let extent = self.angular_extent();
        if extent > 0.0 {
            self.centre_wavelength() / (2.0 * extent)
        } else {
            f64::INFINITY
        }
    }
}
