//! # Platform Configuration
//!
//! All tunables of the control loop, the device session, the activation
//! monitor and the simulated rig live in one TOML file. Every field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! initial_angle = 90.0
//!
//! [control]
//! min_velocity = 0.2
//! settle_ms = 750
//!
//! [monitor]
//! default_angle = 0.0
//! on_failure = "retry"
//!
//! [[monitor.targets]]
//! workload = "blender"
//! angle = 180.0
//! ```
//!
//! `min_velocity` has been run at both 0.1 and 0.2 on different rigs; the
//! default is 0.1.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the control loop, hardware, monitor and simulator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Angle requested once the devices are open, in degrees.
    #[serde(default)]
    pub initial_angle: f64,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_angle: 0.0,
            control: ControlConfig::default(),
            hardware: HardwareConfig::default(),
            monitor: MonitorConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Control-loop tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Moving-average depth, and the number of priming samples.
    #[serde(default = "default_filter_depth")]
    pub filter_depth: usize,
    /// Per-sample raw angle jump (deg) that can only be a wrap through 0/360.
    #[serde(default = "default_wrap_threshold")]
    pub wrap_threshold: f64,
    /// Velocity at or beyond the clamp distance (V1).
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// Creep velocity just outside the arrival tolerance (V2).
    #[serde(default = "default_min_velocity")]
    pub min_velocity: f64,
    /// Error (deg) beyond which velocity saturates.
    #[serde(default = "default_clamp_distance")]
    pub clamp_distance: f64,
    /// Error (deg) below which the platform counts as on target.
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f64,
    /// Dwell inside the tolerance before arrival is declared.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Accelerometer change trigger while seeking (report every change).
    #[serde(default = "default_fine_sensitivity")]
    pub fine_sensitivity: f64,
    /// Accelerometer change trigger while idle.
    #[serde(default = "default_coarse_sensitivity")]
    pub coarse_sensitivity: f64,
    /// Motor acceleration setting applied after attach.
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    /// Set when positive motor velocity turns the platform toward decreasing angle.
    #[serde(default)]
    pub invert_direction: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            filter_depth: default_filter_depth(),
            wrap_threshold: default_wrap_threshold(),
            max_velocity: default_max_velocity(),
            min_velocity: default_min_velocity(),
            clamp_distance: default_clamp_distance(),
            arrival_tolerance: default_arrival_tolerance(),
            settle_ms: default_settle_ms(),
            fine_sensitivity: default_fine_sensitivity(),
            coarse_sensitivity: default_coarse_sensitivity(),
            acceleration: default_acceleration(),
            invert_direction: false,
        }
    }
}

impl ControlConfig {
    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.filter_depth == 0 {
            return Err("control.filter_depth must be at least 1".to_string());
        }
        if !(self.wrap_threshold > 180.0 && self.wrap_threshold < 360.0) {
            return Err(format!(
                "control.wrap_threshold must be between 180 and 360, got {}",
                self.wrap_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.max_velocity) {
            return Err("control.max_velocity must be within [0, 1]".to_string());
        }
        if !(0.0..=self.max_velocity).contains(&self.min_velocity) {
            return Err("control.min_velocity must be within [0, max_velocity]".to_string());
        }
        if !(self.arrival_tolerance > 0.0) {
            return Err("control.arrival_tolerance must be > 0".to_string());
        }
        if !(self.clamp_distance > self.arrival_tolerance) {
            return Err("control.clamp_distance must be greater than arrival_tolerance".to_string());
        }
        if !(self.fine_sensitivity >= 0.0 && self.coarse_sensitivity >= 0.0) {
            return Err("control sensitivities must be >= 0".to_string());
        }
        if !(self.acceleration > 0.0) {
            return Err("control.acceleration must be > 0".to_string());
        }
        Ok(())
    }
}

/// Device session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareConfig {
    #[serde(default = "default_attach_timeout_ms")]
    pub attach_timeout_ms: u64,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            attach_timeout_ms: default_attach_timeout_ms(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl HardwareConfig {
    pub fn attach_timeout(&self) -> Duration {
        Duration::from_millis(self.attach_timeout_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// What a failed workload observation does to the session.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Terminate the control session.
    #[default]
    Fatal,
    /// Log, keep the current target and poll again on the next tick.
    Retry,
}

/// One workload → angle mapping. Earlier entries take priority.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkloadTarget {
    pub workload: String,
    pub angle: f64,
}

/// Activation monitor settings. The monitor only runs when `targets` is non-empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub default_angle: f64,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default)]
    pub targets: Vec<WorkloadTarget>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_angle: 0.0,
            on_failure: FailurePolicy::default(),
            targets: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn is_enabled(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Workload names in priority order.
    pub fn watched_workloads(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.workload.clone()).collect()
    }
}

/// Simulated rig parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_sim_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_sim_accel_scale")]
    pub accel_scale: f64,
    #[serde(default = "default_sim_noise")]
    pub noise: f64,
    #[serde(default = "default_sim_gravity")]
    pub gravity: f64,
    #[serde(default)]
    pub start_angle: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_speed: default_sim_max_speed(),
            accel_scale: default_sim_accel_scale(),
            noise: default_sim_noise(),
            gravity: default_sim_gravity(),
            start_angle: 0.0,
        }
    }
}

impl SimulatorConfig {
    pub fn turntable_params(&self) -> orient_simulator::TurntableParams {
        orient_simulator::TurntableParams {
            max_speed: self.max_speed,
            accel_scale: self.accel_scale,
            noise: self.noise,
            gravity: self.gravity,
            z_reading: 0.0,
            start_angle: self.start_angle,
        }
    }
}

impl Config {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_angle.is_finite() {
            return Err(ConfigError::Invalid("initial_angle must be finite".to_string()));
        }
        self.control.validate().map_err(ConfigError::Invalid)?;
        if self.hardware.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("hardware.sample_interval_ms must be >= 1".to_string()));
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("monitor.poll_interval_ms must be >= 1".to_string()));
        }
        if !self.monitor.default_angle.is_finite() {
            return Err(ConfigError::Invalid("monitor.default_angle must be finite".to_string()));
        }
        for target in &self.monitor.targets {
            if !target.angle.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "angle for workload '{}' must be finite",
                    target.workload
                )));
            }
        }
        if !(self.simulator.max_speed > 0.0) {
            return Err(ConfigError::Invalid("simulator.max_speed must be > 0".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_filter_depth() -> usize { 5 }
fn default_wrap_threshold() -> f64 { 300.0 }
fn default_max_velocity() -> f64 { 0.4 }
fn default_min_velocity() -> f64 { 0.1 }
fn default_clamp_distance() -> f64 { 10.0 }
fn default_arrival_tolerance() -> f64 { 1.0 }
fn default_settle_ms() -> u64 { 500 }
fn default_fine_sensitivity() -> f64 { 0.0 }
fn default_coarse_sensitivity() -> f64 { 1.0 }
fn default_acceleration() -> f64 { 1.0 }
fn default_attach_timeout_ms() -> u64 { 500 }
fn default_sample_interval_ms() -> u64 { 16 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_sim_max_speed() -> f64 { 90.0 }
fn default_sim_accel_scale() -> f64 { 720.0 }
fn default_sim_noise() -> f64 { 0.01 }
fn default_sim_gravity() -> f64 { 1.0 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.control.filter_depth, 5);
        assert_eq!(config.control.wrap_threshold, 300.0);
        assert_eq!(config.control.max_velocity, 0.4);
        assert_eq!(config.control.min_velocity, 0.1);
        assert_eq!(config.control.clamp_distance, 10.0);
        assert_eq!(config.control.arrival_tolerance, 1.0);
        assert_eq!(config.control.settle_time(), Duration::from_millis(500));
        assert_eq!(config.hardware.attach_timeout(), Duration::from_millis(500));
        assert_eq!(config.hardware.sample_interval(), Duration::from_millis(16));
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.monitor.on_failure, FailurePolicy::Fatal);
        assert!(!config.monitor.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("orient.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "initial_angle = 45.0\n[control]\nmin_velocity = 0.2\nsettle_ms = 750").unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.initial_angle, 45.0);
        assert_eq!(config.control.min_velocity, 0.2);
        assert_eq!(config.control.settle_ms, 750);
        // Defaults for missing fields
        assert_eq!(config.control.max_velocity, 0.4);
        assert_eq!(config.hardware.sample_interval_ms, 16);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "[control]\nmin_velocity = 0.6\nmax_velocity = 0.4").unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_monitor_config_parsing() {
        let toml = r#"
        [monitor]
        poll_interval_ms = 250
        default_angle = 15.0
        on_failure = "retry"

        [[monitor.targets]]
        workload = "blender"
        angle = 180.0

        [[monitor.targets]]
        workload = "kicad"
        angle = 270.0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.monitor.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.monitor.on_failure, FailurePolicy::Retry);
        assert_eq!(config.monitor.targets.len(), 2);
        assert_eq!(config.monitor.targets[0].workload, "blender");
        assert_eq!(config.monitor.targets[1].angle, 270.0);
        assert_eq!(config.monitor.watched_workloads(), vec!["blender", "kicad"]);
        assert!(config.monitor.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_control_validation() {
        let mut control = ControlConfig::default();
        control.filter_depth = 0;
        assert!(control.validate().is_err());

        let mut control = ControlConfig::default();
        control.wrap_threshold = 360.0;
        assert!(control.validate().is_err());

        let mut control = ControlConfig::default();
        control.clamp_distance = 0.5;
        assert!(control.validate().is_err());

        let mut control = ControlConfig::default();
        control.max_velocity = 1.2;
        assert!(control.validate().is_err());

        let mut control = ControlConfig::default();
        control.min_velocity = 0.2;
        assert!(control.validate().is_ok());
    }
}
