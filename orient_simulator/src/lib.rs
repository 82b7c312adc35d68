// orient_simulator: a simulated turntable rig implementing the shared device traits

pub mod devices;
pub mod turntable;

pub use devices::{SimAccelerometer, SimMotor, SimulatedTurntable};
pub use turntable::{TurntableModel, TurntableParams};
