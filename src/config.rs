//! Daemon configuration: EKF noise parameters, the calibration file path,
//! and thread cadences. Loaded from a JSON file with `clap`-driven
//! command-line overrides layered on top.

use crate::ekf::EkfConfig;
use crate::error::{EstimatorError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub calib_path: PathBuf,
    pub ekf: EkfConfig,
    pub imu_rate_hz: f32,
    pub magmot_recalc_hz: f32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            calib_path: PathBuf::from("calib.conf"),
            ekf: EkfConfig::default(),
            imu_rate_hz: 200.0,
            magmot_recalc_hz: 10.0,
        }
    }
}

impl DaemonConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EstimatorError::CalibrationLoad(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| EstimatorError::CalibrationLoad(format!("parsing {}: {e}", path.display())))
    }
}

/// Command-line overrides for [`DaemonConfig`]. Any field left unset keeps
/// whatever the config file (or the built-in default) already supplied.
#[derive(Debug, Parser)]
#[command(name = "uav_ekf", about = "Inertial state estimator daemon")]
pub struct Cli {
    /// Path to a JSON daemon config file; falls back to built-in defaults
    /// if omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides `calib_path` from the config file.
    #[arg(long)]
    pub calib_path: Option<PathBuf>,

    /// Overrides `imu_rate_hz` from the config file.
    #[arg(long)]
    pub imu_rate_hz: Option<f32>,
}

impl Cli {
    pub fn resolve(&self) -> Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::load_from_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(p) = &self.calib_path {
            config.calib_path = p.clone();
        }
        if let Some(hz) = self.imu_rate_hz {
            config.imu_rate_hz = hz;
        }
        Ok(config)
    }
}
