//! # Configuration System
//!
//! YAML configuration for a reconstruction run:
//!
//! - Operator settings (phase reference, power iteration)
//! - Solver settings (iteration budget, step scale, divergence guard, regularization)
//! - Grid derivation (safety factor)
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `SARSOLVER_CONFIG` environment variable
//! 2. `./sarsolver.yaml` (current directory)
//!
//! ## Example Configuration
//!
//! ```yaml
//! operator:
//!   phase_reference: scene_reference_point
//!   power_iteration:
//!     max_iterations: 200
//!
//! solver:
//!   max_iterations: 30
//!   step_scale: 0.9
//!   regularization:
//!     kind: soft_threshold
//!     threshold: 0.05
//!
//! grid:
//!   safety_factor: 2.0
//!
//! logging:
//!   level: debug
//!   format: compact
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aperture::Aperture;
use crate::coordinates::Vec3;
use crate::geometry::GridGeometry;
use crate::observe::LogConfig;
use crate::operator::OperatorConfig;
use crate::solver::SolverConfig;
use crate::types::SarResult;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "SARSOLVER_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Grid derivation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Oversampling of the aperture resolution (>= 1)
    pub safety_factor: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { safety_factor: 1.0 }
    }
}

impl GridConfig {
    /// Grid of full side lengths `extents` around `centre`, resolving `aperture`.
    pub fn build(&self, aperture: &Aperture, centre: Vec3, extents: [f64; 3]) -> SarResult<GridGeometry> {
        GridGeometry::from_aperture(aperture, centre, extents, self.safety_factor)
    }
}

/// Complete reconstruction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Operator configuration
    pub operator: OperatorConfig,
    /// Solver configuration
    pub solver: SolverConfig,
    /// Grid configuration
    pub grid: GridConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl ReconstructionConfig {
    /// Load configuration from the default search path.
    ///
    /// Search order:
    /// 1. `SARSOLVER_CONFIG` environment variable
    /// 2. `./sarsolver.yaml`
    ///
    /// Returns default config if no file is found. A path named by the
    /// environment variable that does not exist is an error.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points at {}",
                    CONFIG_ENV_VAR,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths (after the environment variable).
    pub fn config_search_paths() -> Vec<PathBuf> {
        vec![PathBuf::from("./sarsolver.yaml")]
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: crate::types::SarError| ConfigError::ValidationError(e.to_string());
        self.operator.validate().map_err(invalid)?;
        self.solver.validate().map_err(invalid)?;

        if !(self.grid.safety_factor.is_finite() && self.grid.safety_factor >= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "grid.safety_factor must be at least 1, got {}",
                self.grid.safety_factor
            )));
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            solver: SolverConfig {
                max_iterations: 30,
                regularization: crate::solver::Regularization::NonNegative,
                ..Default::default()
            },
            grid: GridConfig { safety_factor: 2.0 },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
