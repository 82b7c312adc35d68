// orient-rs: accelerometer-guided rotating platform control

pub mod config;
pub mod hardware;
pub mod monitor;
pub mod motion;
pub mod platform;

pub use config::{Config, ConfigError, ControlConfig, FailurePolicy, MonitorConfig};
pub use monitor::{ActivationMonitor, MonitorError, ProcessTable, WorkloadSource};
pub use motion::{MotionController, MotionError, MotionState, MotionStatus, TargetChannel};
pub use platform::{Platform, PlatformError, PlatformHandle};
