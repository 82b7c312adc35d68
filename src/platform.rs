// src/platform.rs - Control session: device lifecycle, the shared lock and both loops
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use orient_shared::{AccelerometerChannel, DeviceEvent, DeviceEvents, HardwareError, MotorChannel};

use crate::config::{Config, ConfigError, FailurePolicy};
use crate::monitor::ActivationMonitor;
use crate::motion::{MotionController, MotionError, MotionStatus, TargetChannel};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Device setup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// State touched by both the sample context and the polling context.
struct Shared {
    controller: Mutex<MotionController>,
    terminated: AtomicBool,
    // Wakes the polling loop as soon as termination is requested.
    stop: Notify,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn request_termination(&self, reason: &str) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            tracing::warn!("Termination requested: {}", reason);
            self.stop.notify_one();
        }
    }

    async fn turn_to(&self, angle: f64) {
        if self.is_terminated() {
            return;
        }
        if !angle.is_finite() {
            tracing::warn!("Ignoring turn request to non-finite angle {}", angle);
            return;
        }
        // Sensitivity and the pending slot change under one lock.
        let requested = self.controller.lock().await.request_target(angle);
        match requested {
            Ok(Some(stored)) => tracing::info!("Turn requested to {:.2} deg", stored),
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to raise accelerometer sensitivity: {}", e);
                self.request_termination("accelerometer command failed");
            }
        }
    }
}

/// Cheap, cloneable access to a running platform from other tasks (signal
/// handlers, external schedulers). Every call is a no-op once the platform
/// has shut down.
#[derive(Clone)]
pub struct PlatformHandle {
    shared: Weak<Shared>,
}

impl PlatformHandle {
    pub async fn turn_to(&self, angle: f64) {
        if let Some(shared) = self.shared.upgrade() {
            shared.turn_to(angle).await;
        }
    }

    pub fn request_termination(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.request_termination("external request");
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.upgrade().is_none_or(|shared| shared.is_terminated())
    }

    pub async fn status(&self) -> Option<MotionStatus> {
        let shared = self.shared.upgrade()?;
        let status = shared.controller.lock().await.status();
        Some(status)
    }
}

/// An open control session over one motor and one accelerometer.
pub struct Platform {
    config: Config,
    shared: Arc<Shared>,
    sample_task: Option<JoinHandle<()>>,
}

fn open_devices(
    config: &Config,
    mut motor: Box<dyn MotorChannel>,
    mut accelerometer: Box<dyn AccelerometerChannel>,
    events: DeviceEvents,
) -> Result<(Box<dyn MotorChannel>, Box<dyn AccelerometerChannel>), HardwareError> {
    let timeout = config.hardware.attach_timeout();
    tracing::info!("Opening motor (timeout {:?})", timeout);
    motor.open(timeout, events.clone())?;
    if let Err(e) = motor.set_acceleration(config.control.acceleration) {
        let _ = motor.close();
        return Err(e);
    }

    tracing::info!("Opening accelerometer (timeout {:?})", timeout);
    let opened = accelerometer
        .open(timeout, events)
        .and_then(|_| accelerometer.set_data_interval(config.hardware.sample_interval()));
    if let Err(e) = opened {
        let _ = accelerometer.close();
        let _ = motor.close();
        return Err(e);
    }
    Ok((motor, accelerometer))
}

async fn deliver_samples(shared: Arc<Shared>, mut events: UnboundedReceiver<DeviceEvent>) {
    while let Some(event) = events.recv().await {
        if shared.is_terminated() {
            break;
        }
        match event {
            DeviceEvent::Sample(sample) => {
                let result = shared.controller.lock().await.on_sample(&sample);
                if let Err(e) = result {
                    tracing::error!("Control loop fault: {}", e);
                    shared.request_termination("device command failed");
                }
            }
            DeviceEvent::Attached(device) => {
                tracing::info!("{} attached", device);
            }
            DeviceEvent::Detached(device) => {
                tracing::error!("{} detached", device);
                shared.request_termination("device detached");
            }
            DeviceEvent::Error { device, code, description } => {
                tracing::error!("{} reported error {}: {}", device, code, description);
                shared.request_termination("device error");
            }
        }
    }
    tracing::debug!("Sample delivery stopped");
}

impl Platform {
    /// Open both devices, start sample delivery and request the configured
    /// initial angle. Attach timeouts abort startup.
    pub async fn start(
        config: Config,
        motor: Box<dyn MotorChannel>,
        accelerometer: Box<dyn AccelerometerChannel>,
    ) -> Result<Self, PlatformError> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Attaching blocks for up to the timeout.
        let setup_config = config.clone();
        let (motor, accelerometer) = tokio::task::spawn_blocking(move || {
            open_devices(&setup_config, motor, accelerometer, events_tx)
        })
        .await??;

        let targets = Arc::new(TargetChannel::new());
        let controller = MotionController::new(config.control.clone(), motor, accelerometer, targets);
        let shared = Arc::new(Shared {
            controller: Mutex::new(controller),
            terminated: AtomicBool::new(false),
            stop: Notify::new(),
        });
        let sample_task = tokio::spawn(deliver_samples(shared.clone(), events_rx));

        shared.turn_to(config.initial_angle).await;
        tracing::info!("Platform ready");

        Ok(Self {
            config,
            shared,
            sample_task: Some(sample_task),
        })
    }

    pub fn handle(&self) -> PlatformHandle {
        PlatformHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub async fn turn_to(&self, angle: f64) {
        self.shared.turn_to(angle).await;
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    pub async fn status(&self) -> MotionStatus {
        self.shared.controller.lock().await.status()
    }

    /// Run the polling tick until termination is requested, then shut down.
    pub async fn run(self, mut monitor: Option<ActivationMonitor>) -> Result<(), PlatformError> {
        let mut ticker = tokio::time::interval(self.config.monitor.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shared.stop.notified() => {}
            }
            if self.shared.is_terminated() {
                break;
            }
            if self.sample_task.as_ref().is_some_and(|task| task.is_finished()) {
                self.shared.request_termination("sample delivery ended");
                break;
            }
            if let Some(monitor) = monitor.as_mut() {
                match monitor.poll().await {
                    Ok(Some(angle)) => self.shared.turn_to(angle).await,
                    Ok(None) => {}
                    Err(e) => match monitor.failure_policy() {
                        FailurePolicy::Fatal => {
                            tracing::error!("Workload monitoring failed: {}", e);
                            self.shared.request_termination("workload monitoring failed");
                        }
                        FailurePolicy::Retry => {
                            tracing::warn!(
                                "Workload monitoring failed ({} in a row), retrying: {}",
                                monitor.consecutive_failures(),
                                e
                            );
                        }
                    },
                }
            }
            if tracing::enabled!(tracing::Level::TRACE) {
                let status = self.shared.controller.lock().await.status();
                tracing::trace!("Heartbeat: {:?}", status);
            }
        }
        self.shutdown().await
    }

    /// Stop accepting samples, stop the motor under the lock, then release
    /// the device sessions.
    pub async fn shutdown(mut self) -> Result<(), PlatformError> {
        tracing::info!("Shutting down platform");
        self.shared.request_termination("shutdown");

        if let Some(task) = self.sample_task.take() {
            task.abort();
            let _ = task.await;
        }

        let stopped = self.shared.controller.lock().await.terminate();
        if let Err(e) = &stopped {
            tracing::error!("Failed to stop motor: {}", e);
        }

        let closed = match Arc::try_unwrap(self.shared) {
            Ok(shared) => shared.controller.into_inner().close_devices(),
            Err(shared) => {
                tracing::warn!("Platform still referenced during shutdown, closing devices under lock");
                shared.controller.lock().await.close_devices()
            }
        };
        if let Err(e) = &closed {
            tracing::error!("Failed to close devices: {}", e);
        }
        tracing::info!("Platform shut down");
        stopped?;
        closed?;
        Ok(())
    }
}
