//! Simulated motor and accelerometer channels sharing one turntable model

use orient_shared::{
    AccelerometerChannel, DeviceEvent, DeviceEvents, DeviceKind, HardwareError, MotorChannel, Sample,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::turntable::{TurntableModel, TurntableParams};

const DEFAULT_DATA_INTERVAL: Duration = Duration::from_millis(16);

struct Rig {
    model: Mutex<TurntableModel>,
    links: Mutex<HashMap<DeviceKind, DeviceEvents>>,
    attach_delays: Mutex<HashMap<DeviceKind, Duration>>,
}

// A poisoned lock only means a test thread panicked mid-update; the model
// itself is still plain data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Rig {
    fn attach(&self, device: DeviceKind, timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError> {
        let delay = lock(&self.attach_delays).get(&device).copied().unwrap_or_default();
        if delay > timeout {
            thread::sleep(timeout);
            return Err(HardwareError::AttachTimeout { device, timeout });
        }
        thread::sleep(delay);
        let _ = events.send(DeviceEvent::Attached(device));
        lock(&self.links).insert(device, events);
        tracing::debug!("Simulated {} attached", device);
        Ok(())
    }

    fn detach(&self, device: DeviceKind) {
        lock(&self.links).remove(&device);
    }

    fn notify(&self, device: DeviceKind, event: DeviceEvent) -> bool {
        match lock(&self.links).get(&device) {
            Some(link) => link.send(event).is_ok(),
            None => false,
        }
    }
}

/// A simulated rig: one turntable, one motor, one accelerometer.
///
/// The accelerometer's delivery thread is the simulation clock; the model only
/// advances while the accelerometer is open.
#[derive(Clone)]
pub struct SimulatedTurntable {
    rig: Arc<Rig>,
}

impl SimulatedTurntable {
    pub fn new(params: TurntableParams) -> Self {
        tracing::info!(
            "Simulated turntable at {:.1} deg, max speed {:.1} deg/s",
            params.start_angle,
            params.max_speed
        );
        Self {
            rig: Arc::new(Rig {
                model: Mutex::new(TurntableModel::new(params)),
                links: Mutex::new(HashMap::new()),
                attach_delays: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn motor(&self) -> SimMotor {
        SimMotor {
            rig: self.rig.clone(),
            attached: false,
            velocity: 0.0,
        }
    }

    pub fn accelerometer(&self) -> SimAccelerometer {
        SimAccelerometer {
            rig: self.rig.clone(),
            settings: Arc::new(Mutex::new(DeliverySettings {
                interval: DEFAULT_DATA_INTERVAL,
                change_trigger: 0.0,
            })),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Unwrapped platform angle in degrees.
    pub fn angle(&self) -> f64 {
        lock(&self.rig.model).angle()
    }

    pub fn commanded_velocity(&self) -> f64 {
        lock(&self.rig.model).commanded_velocity()
    }

    /// Make the next `open` of `device` take `delay` to attach.
    pub fn set_attach_delay(&self, device: DeviceKind, delay: Duration) {
        lock(&self.rig.attach_delays).insert(device, delay);
    }

    /// Raise a detach notification as if the cable had been pulled.
    /// Returns false when the device is not open.
    pub fn inject_detach(&self, device: DeviceKind) -> bool {
        self.rig.notify(device, DeviceEvent::Detached(device))
    }

    pub fn inject_error(&self, device: DeviceKind, code: i32, description: &str) -> bool {
        self.rig.notify(
            device,
            DeviceEvent::Error {
                device,
                code,
                description: description.to_string(),
            },
        )
    }
}

pub struct SimMotor {
    rig: Arc<Rig>,
    attached: bool,
    velocity: f64,
}

impl MotorChannel for SimMotor {
    fn open(&mut self, timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError> {
        self.rig.attach(DeviceKind::Motor, timeout, events)?;
        self.attached = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        if self.attached {
            lock(&self.rig.model).set_velocity(0.0);
            self.rig.detach(DeviceKind::Motor);
            self.attached = false;
            self.velocity = 0.0;
        }
        Ok(())
    }

    fn set_acceleration(&mut self, acceleration: f64) -> Result<(), HardwareError> {
        if !self.attached {
            return Err(HardwareError::NotAttached(DeviceKind::Motor));
        }
        lock(&self.rig.model).set_acceleration(acceleration);
        Ok(())
    }

    fn set_target_velocity(&mut self, velocity: f64) -> Result<(), HardwareError> {
        if !self.attached {
            return Err(HardwareError::NotAttached(DeviceKind::Motor));
        }
        if !velocity.is_finite() || velocity.abs() > 1.0 {
            return Err(HardwareError::VelocityOutOfRange(velocity));
        }
        lock(&self.rig.model).set_velocity(velocity);
        self.velocity = velocity;
        Ok(())
    }

    fn target_velocity(&self) -> Result<f64, HardwareError> {
        if !self.attached {
            return Err(HardwareError::NotAttached(DeviceKind::Motor));
        }
        Ok(self.velocity)
    }
}

#[derive(Debug, Clone, Copy)]
struct DeliverySettings {
    interval: Duration,
    change_trigger: f64,
}

pub struct SimAccelerometer {
    rig: Arc<Rig>,
    settings: Arc<Mutex<DeliverySettings>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimAccelerometer {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn deliver(rig: Arc<Rig>, settings: Arc<Mutex<DeliverySettings>>, running: Arc<AtomicBool>, events: DeviceEvents) {
    let mut rng = rand::rng();
    let mut last_reported: Option<[f64; 3]> = None;
    let mut timestamp = Duration::ZERO;
    while running.load(Ordering::SeqCst) {
        let DeliverySettings { interval, change_trigger } = *lock(&settings);
        thread::sleep(interval);
        timestamp += interval;

        let reading = {
            let mut model = lock(&rig.model);
            model.advance(interval);
            model.reading(&mut rng)
        };

        let changed = match last_reported {
            None => true,
            Some(last) => (0..3).any(|axis| (reading[axis] - last[axis]).abs() >= change_trigger),
        };
        if !changed {
            continue;
        }
        last_reported = Some(reading);
        let sample = Sample::new(reading[0], reading[1], reading[2], timestamp);
        if events.send(DeviceEvent::Sample(sample)).is_err() {
            tracing::debug!("Sample receiver dropped, stopping simulated accelerometer");
            break;
        }
    }
}

impl AccelerometerChannel for SimAccelerometer {
    fn open(&mut self, timeout: Duration, events: DeviceEvents) -> Result<(), HardwareError> {
        self.rig.attach(DeviceKind::Accelerometer, timeout, events.clone())?;
        self.running.store(true, Ordering::SeqCst);
        let rig = self.rig.clone();
        let settings = self.settings.clone();
        let running = self.running.clone();
        self.worker = Some(thread::spawn(move || deliver(rig, settings, running, events)));
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.stop();
        self.rig.detach(DeviceKind::Accelerometer);
        Ok(())
    }

    fn set_change_trigger(&mut self, threshold: f64) -> Result<(), HardwareError> {
        lock(&self.settings).change_trigger = threshold.max(0.0);
        Ok(())
    }

    fn set_data_interval(&mut self, interval: Duration) -> Result<(), HardwareError> {
        lock(&self.settings).interval = interval.max(Duration::from_millis(1));
        Ok(())
    }
}

impl Drop for SimAccelerometer {
    fn drop(&mut self) {
        self.stop();
    }
}
