// Shared test doubles for integration tests
#![allow(dead_code)]

use orient_shared::{
    AccelerometerChannel, DeviceEvent, DeviceEvents, DeviceKind, HardwareError, MotorChannel, Sample,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(DeviceKind),
    Close(DeviceKind),
    Acceleration(f64),
    Velocity(f64),
    ChangeTrigger(f64),
    DataInterval(Duration),
}

#[derive(Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<Command>>>);

impl CommandLog {
    pub fn push(&self, command: Command) {
        self.0.lock().unwrap().push(command);
    }

    pub fn all(&self) -> Vec<Command> {
        self.0.lock().unwrap().clone()
    }

    pub fn velocities(&self) -> Vec<f64> {
        self.all()
            .into_iter()
            .filter_map(|c| match c {
                Command::Velocity(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn triggers(&self) -> Vec<f64> {
        self.all()
            .into_iter()
            .filter_map(|c| match c {
                Command::ChangeTrigger(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct RecordingMotor {
    log: CommandLog,
    velocity: f64,
    fail_commands: bool,
}

impl RecordingMotor {
    pub fn new(log: CommandLog) -> Self {
        Self { log, velocity: 0.0, fail_commands: false }
    }

    /// A motor whose velocity commands always fail.
    pub fn failing(log: CommandLog) -> Self {
        Self { log, velocity: 0.0, fail_commands: true }
    }
}

impl MotorChannel for RecordingMotor {
    fn open(&mut self, _timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError> {
        self.log.push(Command::Open(DeviceKind::Motor));
        let _ = events.send(DeviceEvent::Attached(DeviceKind::Motor));
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.log.push(Command::Close(DeviceKind::Motor));
        Ok(())
    }

    fn set_acceleration(&mut self, acceleration: f64) -> Result<(), HardwareError> {
        self.log.push(Command::Acceleration(acceleration));
        Ok(())
    }

    fn set_target_velocity(&mut self, velocity: f64) -> Result<(), HardwareError> {
        if self.fail_commands {
            return Err(HardwareError::Device {
                device: DeviceKind::Motor,
                description: "bus fault".to_string(),
            });
        }
        self.log.push(Command::Velocity(velocity));
        self.velocity = velocity;
        Ok(())
    }

    fn target_velocity(&self) -> Result<f64, HardwareError> {
        Ok(self.velocity)
    }
}

/// Pushes samples into an opened [`RecordingAccelerometer`].
#[derive(Clone, Default)]
pub struct SampleFeed(Arc<Mutex<Option<DeviceEvents>>>);

impl SampleFeed {
    pub fn send(&self, event: DeviceEvent) -> bool {
        match self.0.lock().unwrap().as_ref() {
            Some(events) => events.send(event).is_ok(),
            None => false,
        }
    }

    pub fn sample(&self, angle: f64, t_ms: u64) -> bool {
        self.send(DeviceEvent::Sample(sample_at(angle, t_ms)))
    }
}

pub struct RecordingAccelerometer {
    log: CommandLog,
    feed: SampleFeed,
}

impl RecordingAccelerometer {
    pub fn new(log: CommandLog) -> (Self, SampleFeed) {
        let feed = SampleFeed::default();
        (Self { log, feed: feed.clone() }, feed)
    }
}

impl AccelerometerChannel for RecordingAccelerometer {
    fn open(&mut self, _timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError> {
        self.log.push(Command::Open(DeviceKind::Accelerometer));
        let _ = events.send(DeviceEvent::Attached(DeviceKind::Accelerometer));
        *self.feed.0.lock().unwrap() = Some(events);
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.log.push(Command::Close(DeviceKind::Accelerometer));
        *self.feed.0.lock().unwrap() = None;
        Ok(())
    }

    fn set_change_trigger(&mut self, threshold: f64) -> Result<(), HardwareError> {
        self.log.push(Command::ChangeTrigger(threshold));
        Ok(())
    }

    fn set_data_interval(&mut self, interval: Duration) -> Result<(), HardwareError> {
        self.log.push(Command::DataInterval(interval));
        Ok(())
    }
}

/// A noise-free reading of a platform sitting at `angle` degrees.
pub fn sample_at(angle: f64, t_ms: u64) -> Sample {
    let theta = angle.to_radians();
    Sample::new(-theta.sin(), -theta.cos(), 0.0, Duration::from_millis(t_ms))
}

pub fn approx(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}
