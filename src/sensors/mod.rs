//! Sensor client: the boundary between raw device/transport concerns and
//! the estimator. A [`SensorSource`] exposes up to three logical
//! channels — the IMU group (accel + gyro + mag), barometric altitude, and
//! GPS — bundled into one [`SensorBatch`] per read so a single poll can
//! carry whichever channels happened to have fresh data.

pub mod mock;

use crate::error::{EstimatorError, Result};
use crate::linalg::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct ImuEvent {
    pub timestamp: f64,
    pub accel: Vec3,
    pub gyro: Vec3,
    pub mag: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct BaroEvent {
    pub timestamp: f64,
    pub altitude: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct GpsEvent {
    pub timestamp: f64,
    pub position: Vec3,
    pub velocity: Option<Vec3>,
}

/// One poll's worth of sensor data. Channels with no fresh reading this
/// cycle are simply absent rather than stale-filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorBatch {
    pub imu: Option<ImuEvent>,
    pub baro: Option<BaroEvent>,
    pub gps: Option<GpsEvent>,
}

impl SensorBatch {
    pub fn require_imu(&self) -> Result<ImuEvent> {
        self.imu
            .ok_or_else(|| EstimatorError::SensorRead("imu channel absent from batch".into()))
    }

    pub fn require_baro(&self) -> Result<BaroEvent> {
        self.baro
            .ok_or_else(|| EstimatorError::SensorRead("baro channel absent from batch".into()))
    }

    pub fn require_gps(&self) -> Result<GpsEvent> {
        self.gps
            .ok_or_else(|| EstimatorError::SensorRead("gps channel absent from batch".into()))
    }
}

/// A source of sensor readings. Implementations are responsible for
/// running any raw corrections (e.g. magnetometer) before handing data
/// back, so the estimator only ever sees corrected values.
pub trait SensorSource: Send + Sync {
    fn read(&self) -> Result<SensorBatch>;
}
