pub mod matrix;
pub mod quat;
pub mod stats;
pub mod vec3;

pub use matrix::Matrix;
pub use quat::Quat;
pub use stats::RunningStats;
pub use vec3::Vec3;
