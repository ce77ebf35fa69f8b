//! Straight-track apertures
//!
//! The platform flies parallel to the y axis at a fixed standoff along x from
//! the scene reference point:
//!
//! ```text
//!            y
//!            ▲   tx_0 … tx_{P−1}  (x = srp.x + standoff, z = srp.z + height)
//!            │   │
//!    srp ●───┼───┤ ◀── track_length ──▶
//!            │   │
//!            └───┴────────────▶ x
//! ```
//!
//! A non-zero `receiver_offset` makes the geometry bistatic: each receive
//! position is the transmit position shifted by the offset.

use serde::{Deserialize, Serialize};

use sarsolver_core::{Aperture, GridGeometry, Vec3};

use crate::{SimError, SimResult};

/// Straight-track aperture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearTrackConfig {
    /// Pulses evenly spaced along the track (>= 2)
    pub num_pulses: usize,
    /// Frequency samples per pulse
    pub num_frequencies: usize,
    /// Hz
    pub centre_frequency: f64,
    /// Sampled bandwidth (Hz)
    pub sample_frequency: f64,
    /// Distance from the scene reference point along x (m)
    pub standoff_range: f64,
    /// Track length along y (m)
    pub track_length: f64,
    /// Platform height above the scene reference point (m)
    pub height: f64,
    /// Receive position minus transmit position; zero for monostatic
    pub receiver_offset: Vec3,
    pub scene_reference_point: Vec3,
}

impl Default for LinearTrackConfig {
    fn default() -> Self {
        Self {
            num_pulses: 32,
            num_frequencies: 32,
            centre_frequency: 10.0e9,
            sample_frequency: 300.0e6,
            standoff_range: 2000.0,
            track_length: 60.0,
            height: 0.0,
            receiver_offset: Vec3::ZERO,
            scene_reference_point: Vec3::ZERO,
        }
    }
}

impl LinearTrackConfig {
    pub fn is_monostatic(&self) -> bool {
        self.receiver_offset == Vec3::ZERO
    }
}

/// Build the aperture described by `config`.
pub fn linear_track_aperture(config: &LinearTrackConfig) -> SimResult<Aperture> {
    if config.num_pulses < 2 {
        return Err(SimError::InvalidParameter(format!(
            "a track needs at least 2 pulses, got {}",
            config.num_pulses
        )));
    }
    if !(config.track_length.is_finite() && config.track_length > 0.0) {
        return Err(SimError::InvalidParameter(format!(
            "track length must be positive, got {}",
            config.track_length
        )));
    }

    let srp = config.scene_reference_point;
    let last = (config.num_pulses - 1) as f64;
    let transmit: Vec<Vec3> = (0..config.num_pulses)
        .map(|p| {
            let along = config.track_length * (p as f64 / last - 0.5);
            srp + Vec3::new(config.standoff_range, along, config.height)
        })
        .collect();
    let receive = transmit.iter().map(|&tx| tx + config.receiver_offset).collect();

    tracing::debug!(
        pulses = config.num_pulses,
        frequencies = config.num_frequencies,
        monostatic = config.is_monostatic(),
        "Linear track aperture"
    );
    let aperture = Aperture::new(
        transmit,
        receive,
        vec![srp; config.num_pulses],
        config.centre_frequency,
        config.sample_frequency,
        config.num_frequencies,
    )?;
    Ok(aperture)
}

/// The "little" reference aperture: 249 pulses of 251 frequencies at 10 GHz
/// over 300 MHz, along a 60 m track at 2 km standoff, SRP at the origin.
pub fn little_aperture() -> SimResult<Aperture> {
    linear_track_aperture(&LinearTrackConfig {
        num_pulses: 249,
        num_frequencies: 251,
        ..Default::default()
    })
}

/// The reference grid for [`little_aperture`]: a flat 40 m × 40 m patch
/// around the origin, sampled at three times the aperture's resolution.
pub fn little_grid(aperture: &Aperture) -> SimResult<GridGeometry> {
    Ok(GridGeometry::from_aperture(aperture, Vec3::ZERO, [40.0, 40.0, 0.0], 3.0)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_endpoints() {
        let ap = linear_track_aperture(&LinearTrackConfig::default()).unwrap();
        let tx = ap.transmit_positions();
        assert_eq!(tx.len(), 32);
        assert!((tx[0].y + 30.0).abs() < 1e-12);
        assert!((tx[31].y - 30.0).abs() < 1e-12);
        assert!(tx.iter().all(|p| p.x == 2000.0 && p.z == 0.0));
        assert_eq!(ap.transmit_positions(), ap.receive_positions());
    }

    #[test]
    fn test_bistatic_offset() {
        let config = LinearTrackConfig {
            receiver_offset: Vec3::new(0.0, 0.0, 100.0),
            scene_reference_point: Vec3::new(5.0, 0.0, 0.0),
            ..Default::default()
        };
        assert!(!config.is_monostatic());
        let ap = linear_track_aperture(&config).unwrap();
        assert_eq!(ap.receive_positions()[3], ap.transmit_positions()[3] + Vec3::new(0.0, 0.0, 100.0));
        assert_eq!(ap.transmit_positions()[0].x, 2005.0);
        assert!(ap.scene_reference_points().iter().all(|p| *p == Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_invalid_track() {
        let single = LinearTrackConfig {
            num_pulses: 1,
            ..Default::default()
        };
        assert!(matches!(linear_track_aperture(&single), Err(SimError::InvalidParameter(_))));

        let bad_band = LinearTrackConfig {
            sample_frequency: -1.0,
            ..Default::default()
        };
        assert!(matches!(linear_track_aperture(&bad_band), Err(SimError::Core(_))));
    }

    #[test]
    fn test_little_fixture() {
        let ap = little_aperture().unwrap();
        assert_eq!(ap.num_pulses(), 249);
        assert_eq!(ap.num_frequencies(), 251);
        assert_eq!(ap.centre_frequency(), 10.0e9);
        assert_eq!(ap.sample_frequency(), 300.0e6);

        let grid = little_grid(&ap).unwrap();
        let [nx, ny, nz] = grid.counts();
        assert_eq!(nz, 1);
        assert_eq!(nx, ny);
        assert!(nx > 200);
    }
}
