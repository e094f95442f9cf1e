use clap::Parser;
use crossbeam::channel::bounded;
use log::{info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use uav_ekf::calib::CalibrationStore;
use uav_ekf::config::Cli;
use uav_ekf::correction::scheduler::{CorrectionScheduler, DynamicEntry};
use uav_ekf::correction::MagCorrectionPipeline;
use uav_ekf::ekf::EkfFacade;
use uav_ekf::sensors::mock::MockSensorSource;
use uav_ekf::sensors::SensorSource;
use uav_ekf::telemetry::{self, TelemetryTx};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.resolve().map_err(|e| anyhow::anyhow!("failed to resolve configuration: {e}"))?;

    let calib = match std::fs::read_to_string(&config.calib_path) {
        Ok(text) => CalibrationStore::parse(&text),
        Err(e) => {
            warn!(
                "could not read calibration file {}: {e}; falling back to defaults",
                config.calib_path.display()
            );
            CalibrationStore::default()
        }
    };

    let corrections = Arc::new(MagCorrectionPipeline::new(calib.mag_iron, calib.mag_motor));

    let recalc_entry = {
        let corrections = corrections.clone();
        DynamicEntry {
            recalc: Box::new(move || corrections.mag_motor.recalc()),
            period: Duration::from_secs_f32(1.0 / config.magmot_recalc_hz),
        }
    };
    let scheduler = CorrectionScheduler::spawn(vec![recalc_entry]);

    let sensors: Arc<dyn SensorSource> = Arc::new(MockSensorSource::new(corrections.clone()));
    let ekf = Arc::new(EkfFacade::new(config.ekf, uav_ekf::linalg::Vec3::UNIT_X));

    let (telemetry_shutdown_tx, telemetry_shutdown_rx) = bounded::<()>(0);
    let (frame_tx, frame_rx) = bounded(64);
    let sink_handle = telemetry::logging_sink(frame_rx);
    let telemetry_tx = TelemetryTx::spawn(ekf.clone(), frame_tx, telemetry_shutdown_rx);

    info!("estimator running; imu_rate_hz={}", config.imu_rate_hz);
    let period = Duration::from_secs_f32(1.0 / config.imu_rate_hz);
    let mut iterations: u64 = 0;
    loop {
        let now = Instant::now();
        if let Err(e) = ekf.predict(now) {
            warn!("predict failed: {e}");
        }

        match sensors.read() {
            Ok(batch) => {
                if let Some(imu) = batch.imu {
                    if let Err(e) = ekf.update_imu(imu.accel, imu.gyro, imu.mag) {
                        warn!("imu update rejected: {e}");
                    }
                }
                if let Some(baro) = batch.baro {
                    if let Err(e) = ekf.update_baro(baro.altitude) {
                        warn!("baro update rejected: {e}");
                    }
                }
                if let Some(gps) = batch.gps {
                    if let Err(e) = ekf.update_gps(gps.position, gps.velocity) {
                        warn!("gps update rejected: {e}");
                    }
                }
            }
            Err(e) => warn!("sensor read failed: {e}"),
        }

        iterations += 1;
        if iterations % (config.imu_rate_hz as u64).max(1) == 0 {
            let snap = ekf.snapshot();
            info!(
                "pos=({:.2},{:.2},{:.2}) vel=({:.2},{:.2},{:.2})",
                snap.position.x, snap.position.y, snap.position.z,
                snap.velocity.x, snap.velocity.y, snap.velocity.z,
            );
        }

        thread::sleep(period.saturating_sub(now.elapsed()));

        // A real deployment runs until signaled; this demo daemon caps
        // itself so `cargo run` without arguments terminates on its own.
        if iterations >= (config.imu_rate_hz as u64) * 10 {
            break;
        }
    }

    drop(telemetry_shutdown_tx);
    telemetry_tx.join();
    let _ = sink_handle.join();
    scheduler.stop();
    Ok(())
}
