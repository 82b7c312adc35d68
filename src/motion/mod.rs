// src/motion/mod.rs - Angle tracking and motion control
pub mod angle;
pub mod controller;
pub mod filter;
pub mod target;

pub use angle::{normalize_angle, raw_angle, AngleState, AngleTracker};
pub use controller::{seek_velocity, MotionController, MotionState, MotionStatus, Sensitivity};
pub use filter::SampleFilter;
pub use target::TargetChannel;

use orient_shared::HardwareError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
}
