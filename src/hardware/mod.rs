// src/hardware/mod.rs - Device channels consumed by the control loop
//
// The control loop only sees the `MotorChannel` / `AccelerometerChannel`
// traits from orient_shared. Vendor drivers implement those traits outside
// this crate; the simulated rig is the backend shipped here.

pub use orient_shared::{
    AccelerometerChannel, DeviceEvent, DeviceEvents, DeviceKind, HardwareError, MotorChannel, Sample,
};
pub use orient_simulator::SimulatedTurntable;

use crate::config::SimulatorConfig;

/// One motor and one accelerometer, ready to be opened by the platform.
pub struct DeviceSet {
    pub motor: Box<dyn MotorChannel>,
    pub accelerometer: Box<dyn AccelerometerChannel>,
}

/// Build a simulated rig. The returned turntable handle observes the
/// platform angle and injects faults.
pub fn simulated_devices(config: &SimulatorConfig) -> (SimulatedTurntable, DeviceSet) {
    let rig = SimulatedTurntable::new(config.turntable_params());
    let devices = DeviceSet {
        motor: Box::new(rig.motor()),
        accelerometer: Box::new(rig.accelerometer()),
    };
    (rig, devices)
}
