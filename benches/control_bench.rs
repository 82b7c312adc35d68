// Benchmark for the per-sample control path
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;

use orient_rs::config::ControlConfig;
use orient_rs::hardware::{AccelerometerChannel, DeviceEvents, HardwareError, MotorChannel, Sample};
use orient_rs::motion::{raw_angle, AngleTracker, MotionController, SampleFilter, TargetChannel};

struct NullMotor(f64);

impl MotorChannel for NullMotor {
    fn open(&mut self, _timeout: Duration, _events: DeviceEvents) -> Result<(), HardwareError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }
    fn set_acceleration(&mut self, _acceleration: f64) -> Result<(), HardwareError> {
        Ok(())
    }
    fn set_target_velocity(&mut self, velocity: f64) -> Result<(), HardwareError> {
        self.0 = velocity;
        Ok(())
    }
    fn target_velocity(&self) -> Result<f64, HardwareError> {
        Ok(self.0)
    }
}

struct NullAccelerometer;

impl AccelerometerChannel for NullAccelerometer {
    fn open(&mut self, _timeout: Duration, _events: DeviceEvents) -> Result<(), HardwareError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }
    fn set_change_trigger(&mut self, _threshold: f64) -> Result<(), HardwareError> {
        Ok(())
    }
    fn set_data_interval(&mut self, _interval: Duration) -> Result<(), HardwareError> {
        Ok(())
    }
}

/// A platform sweeping two full turns from 0, crossing zero once.
fn sweep(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let theta = (i as f64 * 720.0 / count as f64).to_radians();
            Sample::new(-theta.sin(), -theta.cos(), 0.0, Duration::from_millis(i as u64 + 1))
        })
        .collect()
}

fn bench_angle_pipeline(c: &mut Criterion) {
    let samples = sweep(10_000);
    c.bench_function("filter + unwrap 10k samples", |b| {
        b.iter(|| {
            let mut x = SampleFilter::new(5);
            let mut y = SampleFilter::new(5);
            let mut tracker = AngleTracker::new(300.0);
            let mut wraps = 0;
            for sample in &samples {
                let raw = raw_angle(x.update(sample.x()), y.update(sample.y()));
                if tracker.update(raw).1 {
                    wraps += 1;
                }
            }
            assert_eq!(wraps, 1);
        });
    });
}

fn bench_controller(c: &mut Criterion) {
    let samples = sweep(10_000);
    c.bench_function("controller on_sample 10k samples", |b| {
        b.iter(|| {
            let targets = Arc::new(TargetChannel::new());
            let mut controller = MotionController::new(
                ControlConfig::default(),
                Box::new(NullMotor(0.0)),
                Box::new(NullAccelerometer),
                targets.clone(),
            );
            targets.request(180.0);
            for sample in &samples {
                controller.on_sample(sample).unwrap();
            }
            controller.status()
        });
    });
}

criterion_group!(benches, bench_angle_pipeline, bench_controller);
criterion_main!(benches);
