pub mod calib;
pub mod config;
pub mod correction;
pub mod ekf;
pub mod error;
pub mod linalg;
pub mod lma;
pub mod mavlink;
pub mod pwm;
pub mod sensors;
pub mod telemetry;

pub use error::{EstimatorError, Result};
