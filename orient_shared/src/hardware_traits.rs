// Trait-based interfaces for the motor and accelerometer channels (shared)

use std::time::Duration;

use crate::{DeviceEvents, HardwareError};

/// DC motor channel. Velocity is a duty fraction in [-1.0, 1.0].
pub trait MotorChannel: Send {
    /// Open the channel and wait up to `timeout` for the device to attach.
    /// Attach/detach/error notifications are delivered through `events`.
    fn open(&mut self, timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError>;
    fn close(&mut self) -> Result<(), HardwareError>;
    fn set_acceleration(&mut self, acceleration: f64) -> Result<(), HardwareError>;
    fn set_target_velocity(&mut self, velocity: f64) -> Result<(), HardwareError>;
    fn target_velocity(&self) -> Result<f64, HardwareError>;
}

/// 3-axis accelerometer channel. Samples arrive as `DeviceEvent::Sample`.
pub trait AccelerometerChannel: Send {
    fn open(&mut self, timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError>;
    fn close(&mut self) -> Result<(), HardwareError>;
    /// Minimum per-axis change (in g) before a new sample is reported.
    /// 0.0 reports every sample.
    fn set_change_trigger(&mut self, threshold: f64) -> Result<(), HardwareError>;
    fn set_data_interval(&mut self, interval: Duration) -> Result<(), HardwareError>;
}
