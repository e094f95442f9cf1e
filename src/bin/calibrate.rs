//! Offline calibration tool: fits the magnetometer hard/soft-iron
//! ellipsoid and the per-motor magnetic-interference curves against a
//! synthetic sample set, then emits a calibration file in the same
//! grammar the daemon reads at startup.

use clap::Parser;
use log::info;
use std::f32::consts::PI;
use std::path::PathBuf;

use uav_ekf::calib::ellipsoid::fit_mag_iron;
use uav_ekf::calib::motor_interference::fit_motor_axis_sweep;
use uav_ekf::calib::store::{CalibrationStore, MagMotorCalib, NUM_MOTORS};
use uav_ekf::linalg::{RunningStats, Vec3};

#[derive(Debug, Parser)]
#[command(name = "calibrate", about = "Fits magnetometer calibration from synthetic samples")]
struct Args {
    /// Where to write the resulting calibration file.
    #[arg(long, default_value = "calib.conf")]
    output: PathBuf,

    /// Number of synthetic magnetometer samples to fit against.
    #[arg(long, default_value_t = 64)]
    mag_samples: usize,
}

/// Synthetic samples on a sphere of the given radius, offset by `hard_iron`,
/// standing in for a real "wave the vehicle around" calibration sweep.
fn synthetic_mag_samples(n: usize, radius: f32, hard_iron: Vec3) -> Vec<Vec3> {
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let theta = t * 2.0 * PI * 3.0;
            let phi = t * PI;
            let x = radius * phi.sin() * theta.cos();
            let y = radius * phi.sin() * theta.sin();
            let z = radius * phi.cos();
            Vec3::new(x, y, z).add(&hard_iron)
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let true_hard_iron = Vec3::new(12.0, -4.0, 6.0);
    let samples = synthetic_mag_samples(args.mag_samples, 50.0, true_hard_iron);

    let mut magnitude_stats = RunningStats::new();
    for s in &samples {
        magnitude_stats.update(s.len() as f64);
    }
    info!(
        "sampling {} points, magnitude mean={:.2} std_dev={:.2}",
        magnitude_stats.count(),
        magnitude_stats.mean(),
        magnitude_stats.std_dev()
    );

    let (soft, hard) =
        fit_mag_iron(samples).ok_or_else(|| anyhow::anyhow!("ellipsoid fit failed to converge"))?;
    info!("fitted hard-iron offset: ({:.2}, {:.2}, {:.2})", hard[0], hard[1], hard[2]);

    let throttle_levels: Vec<f32> = (0..11).map(|i| i as f32 / 10.0).collect();
    let mut mag_motor = MagMotorCalib::default();
    for motor in 0..NUM_MOTORS {
        let true_coeffs = [(0.0, 0.1 * motor as f32, 0.0), (0.0, 0.0, 0.0), (0.0, 0.0, 0.0)];
        let axis_samples: Vec<[f32; 3]> = throttle_levels
            .iter()
            .map(|&t| {
                let mut sample = [0.0f32; 3];
                for axis in 0..3 {
                    let (a, b, c) = true_coeffs[axis];
                    sample[axis] = a * t * t + b * t + c;
                }
                sample
            })
            .collect();
        mag_motor.coeffs[motor] = fit_motor_axis_sweep(&throttle_levels, &axis_samples)?;
    }

    let store = CalibrationStore {
        mag_iron: uav_ekf::calib::store::MagIronCalib { soft, hard },
        mag_motor,
        ..CalibrationStore::default()
    };

    let text = store.write_to_string();
    std::fs::write(&args.output, text)?;
    info!("wrote calibration to {}", args.output.display());
    Ok(())
}
