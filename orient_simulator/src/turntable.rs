//! Turntable physics for the simulator

use rand::Rng;
use std::time::Duration;

/// Physical parameters of the simulated rig.
#[derive(Debug, Clone)]
pub struct TurntableParams {
    /// Platform speed in deg/s at a commanded velocity of 1.0.
    pub max_speed: f64,
    /// deg/s² per unit of motor acceleration setting.
    pub accel_scale: f64,
    /// Peak uniform noise added to each axis, in g.
    pub noise: f64,
    /// Magnitude of the gravity projection in the x/y plane, in g.
    pub gravity: f64,
    /// Constant z-axis reading, in g.
    pub z_reading: f64,
    /// Angle the platform powers on at, in degrees.
    pub start_angle: f64,
}

impl Default for TurntableParams {
    fn default() -> Self {
        Self {
            max_speed: 90.0,
            accel_scale: 720.0,
            noise: 0.01,
            gravity: 1.0,
            z_reading: 0.0,
            start_angle: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurntableModel {
    params: TurntableParams,
    /// Unwrapped platform angle in degrees.
    angle: f64,
    /// Angular speed in deg/s.
    speed: f64,
    commanded_velocity: f64,
    acceleration: f64,
    elapsed: Duration,
}

impl TurntableModel {
    pub fn new(params: TurntableParams) -> Self {
        let angle = params.start_angle;
        Self {
            params,
            angle,
            speed: 0.0,
            commanded_velocity: 0.0,
            acceleration: 1.0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.commanded_velocity = velocity;
    }

    pub fn commanded_velocity(&self) -> f64 {
        self.commanded_velocity
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        self.acceleration = acceleration.max(0.0);
    }

    /// Integrate speed and angle over `dt`, ramping speed toward the
    /// commanded value under the acceleration limit.
    pub fn advance(&mut self, dt: Duration) {
        let secs = dt.as_secs_f64();
        let target_speed = self.commanded_velocity * self.params.max_speed;
        let max_delta = self.acceleration * self.params.accel_scale * secs;
        self.speed += (target_speed - self.speed).clamp(-max_delta, max_delta);
        self.angle += self.speed * secs;
        self.elapsed += dt;
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Noise-free accelerometer reading. The gravity vector is projected so
    /// that `atan2(x, y)` in degrees plus 180 recovers the platform angle.
    pub fn ideal_reading(&self) -> [f64; 3] {
        let theta = self.angle.to_radians();
        [
            -self.params.gravity * theta.sin(),
            -self.params.gravity * theta.cos(),
            self.params.z_reading,
        ]
    }

    pub fn reading<R: Rng>(&self, rng: &mut R) -> [f64; 3] {
        let mut reading = self.ideal_reading();
        if self.params.noise > 0.0 {
            let noise = self.params.noise;
            for axis in reading.iter_mut() {
                *axis += rng.random_range(-noise..=noise);
            }
        }
        reading
    }
}
