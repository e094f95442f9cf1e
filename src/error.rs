//! Crate-wide error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("scratch workspace too small: need at least {needed} elements, have {have}")]
    WorkspaceTooSmall { needed: usize, have: usize },

    #[error("sensor read failed: {0}")]
    SensorRead(String),

    #[error("calibration load failed: {0}")]
    CalibrationLoad(String),

    #[error("solver callback failed: {0}")]
    CallbackFailure(String),

    #[error("motor/actuator write failed: {0}")]
    ActuatorWrite(String),
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
