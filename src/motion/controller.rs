// src/motion/controller.rs - Sample-driven seek/settle state machine
use std::sync::Arc;
use std::time::Duration;

use orient_shared::{AccelerometerChannel, MotorChannel, Sample};

use super::angle::{raw_angle, AngleState, AngleTracker};
use super::filter::SampleFilter;
use super::target::TargetChannel;
use super::MotionError;
use crate::config::ControlConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    /// Filling the moving-average window; `remaining` samples to go.
    Priming { remaining: usize },
    Idle,
    Seeking,
    /// Stopped inside the tolerance, waiting for `deadline` (sample time).
    Settling { deadline: Duration },
    Terminated,
}

/// Accelerometer reporting density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    /// Report every change; used while position control needs feedback.
    Fine,
    /// Report rarely; used while holding still.
    Coarse,
}

/// Read-only view of the controller for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStatus {
    pub state: MotionState,
    pub angle: Option<AngleState>,
    pub target: Option<f64>,
    pub commanded_velocity: f64,
}

/// Velocity for a signed position error `target - absolute`, in degrees.
///
/// Magnitude grows linearly from `min_velocity` at zero error to
/// `max_velocity` at `clamp_distance` and stays there beyond it.
pub fn seek_velocity(control: &ControlConfig, error: f64) -> f64 {
    let distance = error.abs().min(control.clamp_distance);
    let magnitude = distance * (control.max_velocity - control.min_velocity) / control.clamp_distance
        + control.min_velocity;
    let direction = if error >= 0.0 { 1.0 } else { -1.0 };
    if control.invert_direction {
        -direction * magnitude
    } else {
        direction * magnitude
    }
}

pub struct MotionController {
    control: ControlConfig,
    motor: Box<dyn MotorChannel>,
    accelerometer: Box<dyn AccelerometerChannel>,
    targets: Arc<TargetChannel>,
    filters: [SampleFilter; 3],
    tracker: AngleTracker,
    state: MotionState,
    target: Option<f64>,
    commanded_velocity: f64,
    last_timestamp: Option<Duration>,
}

impl MotionController {
    pub fn new(
        control: ControlConfig,
        motor: Box<dyn MotorChannel>,
        accelerometer: Box<dyn AccelerometerChannel>,
        targets: Arc<TargetChannel>,
    ) -> Self {
        let depth = control.filter_depth.max(1);
        Self {
            filters: [SampleFilter::new(depth), SampleFilter::new(depth), SampleFilter::new(depth)],
            tracker: AngleTracker::new(control.wrap_threshold),
            state: MotionState::Priming { remaining: depth },
            target: None,
            commanded_velocity: 0.0,
            last_timestamp: None,
            control,
            motor,
            accelerometer,
            targets,
        }
    }

    /// Process one accelerometer sample: filter, track the angle, pick up a
    /// pending target, then drive the motor.
    pub fn on_sample(&mut self, sample: &Sample) -> Result<(), MotionError> {
        if self.state == MotionState::Terminated {
            return Ok(());
        }
        if let Some(last) = self.last_timestamp {
            if sample.timestamp <= last {
                tracing::warn!(
                    "Dropping out-of-order sample at {:?} (last {:?})",
                    sample.timestamp,
                    last
                );
                return Ok(());
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let x = self.filters[0].update(sample.x());
        let y = self.filters[1].update(sample.y());
        let z = self.filters[2].update(sample.z());
        tracing::trace!(
            "Sample t={:?} raw=({:.4}, {:.4}, {:.4}) filtered=({:.4}, {:.4}, {:.4})",
            sample.timestamp,
            sample.x(),
            sample.y(),
            sample.z(),
            x,
            y,
            z
        );
        let raw = raw_angle(x, y);

        let angle = match self.state {
            MotionState::Priming { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    self.state = MotionState::Priming { remaining };
                    return Ok(());
                }
                let angle = self.tracker.initialize(raw);
                self.set_sensitivity(Sensitivity::Coarse)?;
                self.state = MotionState::Idle;
                tracing::info!(
                    "Primed at {:.2} deg (rotation count {})",
                    angle.relative,
                    angle.rotations
                );
                angle
            }
            _ => {
                let (angle, wrapped) = self.tracker.update(raw);
                if wrapped {
                    tracing::debug!(
                        "Wrapped through 0/360, rotation count now {}",
                        angle.rotations
                    );
                }
                angle
            }
        };

        self.accept_pending_target()?;
        self.regulate(angle.absolute, sample.timestamp)
    }

    fn accept_pending_target(&mut self) -> Result<(), MotionError> {
        let Some(requested) = self.targets.consume_pending() else {
            return Ok(());
        };
        if self.target == Some(requested) {
            tracing::debug!("Already holding target {:.2} deg", requested);
            return Ok(());
        }
        tracing::info!("Seeking target {:.2} deg", requested);
        self.target = Some(requested);
        self.set_sensitivity(Sensitivity::Fine)?;
        self.state = MotionState::Seeking;
        Ok(())
    }

    fn regulate(&mut self, absolute: f64, now: Duration) -> Result<(), MotionError> {
        let Some(target) = self.target else {
            return Ok(());
        };
        let settling_deadline = match self.state {
            MotionState::Seeking => None,
            MotionState::Settling { deadline } => Some(deadline),
            _ => return Ok(()),
        };

        let error = target - absolute;
        let distance = error.abs().min(self.control.clamp_distance);
        tracing::trace!("Angle {:.2} deg, distance {:.2} deg", absolute, distance);

        if distance >= self.control.arrival_tolerance {
            if settling_deadline.is_some() {
                tracing::debug!("Drifted {:.2} deg off target while settling, resuming", distance);
            }
            self.state = MotionState::Seeking;
            let velocity = seek_velocity(&self.control, error);
            let current = self.motor.target_velocity()?;
            if current != velocity {
                self.send_velocity(velocity)?;
            }
            return Ok(());
        }

        match settling_deadline {
            None => {
                self.send_velocity(0.0)?;
                let deadline = now + self.control.settle_time();
                self.state = MotionState::Settling { deadline };
                tracing::debug!("Within tolerance at {:.2} deg, settling until {:?}", absolute, deadline);
            }
            Some(deadline) if now >= deadline => {
                self.set_sensitivity(Sensitivity::Coarse)?;
                self.target = None;
                self.state = MotionState::Idle;
                tracing::info!("Arrived at {:.2} deg (target {:.2} deg)", absolute, target);
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn send_velocity(&mut self, velocity: f64) -> Result<(), MotionError> {
        self.motor.set_target_velocity(velocity)?;
        self.commanded_velocity = velocity;
        tracing::debug!("Motor velocity -> {:.3}", velocity);
        Ok(())
    }

    fn set_sensitivity(&mut self, sensitivity: Sensitivity) -> Result<(), MotionError> {
        let threshold = match sensitivity {
            Sensitivity::Fine => self.control.fine_sensitivity,
            Sensitivity::Coarse => self.control.coarse_sensitivity,
        };
        self.accelerometer.set_change_trigger(threshold)?;
        tracing::debug!("Accelerometer sensitivity {:?} ({})", sensitivity, threshold);
        Ok(())
    }

    /// Switch to dense reporting ahead of a new target request.
    pub fn prepare_for_target(&mut self) -> Result<(), MotionError> {
        if self.state == MotionState::Terminated {
            return Ok(());
        }
        self.set_sensitivity(Sensitivity::Fine)
    }

    /// Raise the sensitivity and store `angle` as the pending target in one
    /// step, so no sample can drop back to coarse reporting in between.
    /// Returns the stored (normalized) angle.
    pub fn request_target(&mut self, angle: f64) -> Result<Option<f64>, MotionError> {
        if self.state == MotionState::Terminated || !angle.is_finite() {
            return Ok(None);
        }
        self.prepare_for_target()?;
        Ok(self.targets.request(angle))
    }

    /// Enter the absorbing Terminated state, stopping the motor exactly once.
    pub fn terminate(&mut self) -> Result<(), MotionError> {
        if self.state == MotionState::Terminated {
            return Ok(());
        }
        self.state = MotionState::Terminated;
        self.target = None;
        tracing::info!("Motion controller terminated, stopping motor");
        self.send_velocity(0.0)
    }

    /// Close both device sessions, accelerometer first so no further samples
    /// arrive. Both are attempted; the first failure is returned.
    pub fn close_devices(&mut self) -> Result<(), MotionError> {
        let accelerometer = self.accelerometer.close();
        let motor = self.motor.close();
        accelerometer?;
        motor?;
        Ok(())
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn angle(&self) -> Option<AngleState> {
        self.tracker.state()
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    pub fn commanded_velocity(&self) -> f64 {
        self.commanded_velocity
    }

    pub fn status(&self) -> MotionStatus {
        MotionStatus {
            state: self.state,
            angle: self.angle(),
            target: self.target,
            commanded_velocity: self.commanded_velocity,
        }
    }
}
