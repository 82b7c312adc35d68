// orient_shared: hardware-facing types shared by the host and the simulator

pub mod hardware_traits;

pub use hardware_traits::{AccelerometerChannel, MotorChannel};

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// One accelerometer reading, in g, stamped with time since the session opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub acceleration: [f64; 3],
    pub timestamp: Duration,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: Duration) -> Self {
        Self {
            acceleration: [x, y, z],
            timestamp,
        }
    }

    pub fn x(&self) -> f64 {
        self.acceleration[0]
    }

    pub fn y(&self) -> f64 {
        self.acceleration[1]
    }

    pub fn z(&self) -> f64 {
        self.acceleration[2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Motor,
    Accelerometer,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Motor => write!(f, "motor"),
            DeviceKind::Accelerometer => write!(f, "accelerometer"),
        }
    }
}

/// Notifications raised by the device layer from its own delivery thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Sample(Sample),
    Attached(DeviceKind),
    Detached(DeviceKind),
    Error {
        device: DeviceKind,
        code: i32,
        description: String,
    },
}

impl DeviceEvent {
    /// Detach and device errors end the control session.
    pub fn is_fault(&self) -> bool {
        matches!(self, DeviceEvent::Detached(_) | DeviceEvent::Error { .. })
    }
}

/// Sending half handed to a device on `open`. Sending never blocks, so it is
/// safe to call from a driver callback thread.
pub type DeviceEvents = UnboundedSender<DeviceEvent>;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("{device} did not attach within {timeout:?}")]
    AttachTimeout { device: DeviceKind, timeout: Duration },
    #[error("{0} is not attached")]
    NotAttached(DeviceKind),
    #[error("velocity {0} is outside [-1.0, 1.0]")]
    VelocityOutOfRange(f64),
    #[error("{device} error: {description}")]
    Device {
        device: DeviceKind,
        description: String,
    },
}
