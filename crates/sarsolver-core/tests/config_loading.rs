//! Configuration loading through the environment variable, and a run driven
//! entirely by a parsed configuration.

use std::sync::Arc;

use sarsolver_core::config::CONFIG_ENV_VAR;
use sarsolver_core::{
    ConfigError, Geometry, LandweberSolver, MeasurementGeometry, PhaseReference, ReconstructionConfig, SarOperator,
    Vec3,
};
use sarsolver_sim::{linear_track_aperture, LinearTrackConfig};

const YAML: &str = r#"
operator:
  phase_reference: absolute
solver:
  max_iterations: 5
  tolerance: 0.0
grid:
  safety_factor: 2.0
logging:
  level: warn
"#;

// Single test touching the process environment, so nothing races on it.
#[test]
fn load_follows_environment_variable() {
    let path = std::env::temp_dir().join(format!("sarsolver-env-{}.yaml", std::process::id()));
    std::fs::write(&path, YAML).unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let loaded = ReconstructionConfig::load();
    std::env::set_var(CONFIG_ENV_VAR, path.with_extension("missing"));
    let missing = ReconstructionConfig::load();
    std::env::remove_var(CONFIG_ENV_VAR);
    std::fs::remove_file(&path).ok();

    let config = loaded.unwrap();
    assert_eq!(config.operator.phase_reference, PhaseReference::Absolute);
    assert_eq!(config.solver.max_iterations, 5);
    assert_eq!(config.grid.safety_factor, 2.0);
    assert!(matches!(missing, Err(ConfigError::NotFound(_))));
}

#[test]
fn configuration_drives_a_reconstruction() {
    let config = ReconstructionConfig::parse(YAML).unwrap();
    config.validate().unwrap();

    let aperture = linear_track_aperture(&LinearTrackConfig {
        num_pulses: 12,
        num_frequencies: 12,
        ..Default::default()
    })
    .unwrap();
    let grid = Arc::new(config.grid.build(&aperture, Vec3::ZERO, [2.0, 2.0, 0.0]).unwrap());
    // Safety factor 2 halves the spacing relative to the resolution.
    assert!((grid.spacing()[0] * 2.0 - aperture.range_resolution().min(aperture.cross_range_resolution())).abs() < 1e-12);

    let measurement = Arc::new(MeasurementGeometry::new(Arc::new(aperture)));
    let op = SarOperator::with_config(grid.clone(), measurement, config.operator.clone()).unwrap();

    let mut scene = grid.allocate();
    scene.as_mut_slice()[grid.num_voxels() / 2] = sarsolver_core::Complex::new(1.0, 0.0);
    let measured = op.forward(&scene).unwrap();

    let result = LandweberSolver::new(config.solver.clone()).unwrap().solve(&op, &measured).unwrap();
    assert_eq!(result.iterations, 5);
    assert!(result.final_residual_norm < result.initial_residual_norm);
}
