//! Synthetic sensor source for tests, calibration fitting, and demos —
//! generates smooth sine-wave streams in place of real hardware, in the
//! same spirit as the device-less generators a sensor-manager integration
//! normally falls back to when no hardware is attached.

use super::{BaroEvent, GpsEvent, ImuEvent, SensorBatch, SensorSource};
use crate::correction::MagCorrectionPipeline;
use crate::error::Result;
use crate::linalg::Vec3;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Emits a gently oscillating IMU/baro/GPS stream and applies the real
/// magnetometer correction pipeline to the synthetic mag reading, so
/// callers exercise the same code path a hardware-backed source would.
pub struct MockSensorSource {
    counter: AtomicU64,
    corrections: Arc<MagCorrectionPipeline>,
}

impl MockSensorSource {
    pub fn new(corrections: Arc<MagCorrectionPipeline>) -> Self {
        MockSensorSource { counter: AtomicU64::new(0), corrections }
    }

    fn tick(&self) -> f64 {
        self.counter.fetch_add(1, Ordering::Relaxed) as f64 * 0.02
    }
}

impl SensorSource for MockSensorSource {
    fn read(&self) -> Result<SensorBatch> {
        let t = self.tick();
        let timestamp = now_secs();

        let accel = Vec3::new(
            ((t * 2.0 * PI).sin() * 0.5) as f32,
            ((t * 2.0 * PI).cos() * 0.3) as f32,
            (9.80665 + (t * PI).sin() * 0.1) as f32,
        );
        let gyro = Vec3::new(
            ((t * 0.5).sin() * 0.05) as f32,
            ((t * 0.3).cos() * 0.03) as f32,
            ((t * 1.0).sin() * 0.1) as f32,
        );
        let raw_mag = Vec3::new(
            (1.0 + (t * 0.1).sin() * 0.05) as f32,
            ((t * 0.1).cos() * 0.05) as f32,
            0.0,
        );
        let mag = self.corrections.apply(raw_mag);

        let imu = ImuEvent { timestamp, accel, gyro, mag };
        let baro = BaroEvent { timestamp, altitude: (50.0 + (t * 0.2).sin() * 2.0) as f32 };
        let gps = GpsEvent {
            timestamp,
            position: Vec3::new((t * 0.5) as f32, (t * 0.3) as f32, (t * 0.2) as f32),
            velocity: Some(Vec3::new(0.5, 0.3, 0.2)),
        };

        Ok(SensorBatch { imu: Some(imu), baro: Some(baro), gps: Some(gps) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::store::{MagIronCalib, MagMotorCalib};

    #[test]
    fn mock_source_produces_all_three_channels() {
        let pipeline = Arc::new(MagCorrectionPipeline::new(
            MagIronCalib::default(),
            MagMotorCalib::default(),
        ));
        let source = MockSensorSource::new(pipeline);
        let batch = source.read().unwrap();
        assert!(batch.imu.is_some());
        assert!(batch.baro.is_some());
        assert!(batch.gps.is_some());
    }

    #[test]
    fn successive_reads_advance_the_synthetic_clock() {
        let pipeline = Arc::new(MagCorrectionPipeline::new(
            MagIronCalib::default(),
            MagMotorCalib::default(),
        ));
        let source = MockSensorSource::new(pipeline);
        let first = source.read().unwrap().imu.unwrap();
        let second = source.read().unwrap().imu.unwrap();
        assert_ne!(first.accel.x, second.accel.x);
    }
}
