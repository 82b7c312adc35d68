// src/monitor/mod.rs - Maps the active workload to a platform angle
pub mod process;

pub use process::ProcessTable;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{FailurePolicy, MonitorConfig, WorkloadTarget};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Workload source unavailable: {0}")]
    Unavailable(String),
}

/// Something that can tell which workload is currently active.
#[async_trait]
pub trait WorkloadSource: Send {
    async fn active_workload(&mut self) -> Result<Option<String>, MonitorError>;
}

/// Polls a [`WorkloadSource`] and yields a new target angle whenever the
/// observed workload changes.
pub struct ActivationMonitor {
    source: Box<dyn WorkloadSource>,
    targets: Vec<WorkloadTarget>,
    default_angle: f64,
    on_failure: FailurePolicy,
    // Outer None: nothing observed yet.
    last_seen: Option<Option<String>>,
    consecutive_failures: u32,
}

impl ActivationMonitor {
    pub fn new(config: &MonitorConfig, source: Box<dyn WorkloadSource>) -> Self {
        Self {
            source,
            targets: config.targets.clone(),
            default_angle: config.default_angle,
            on_failure: config.on_failure,
            last_seen: None,
            consecutive_failures: 0,
        }
    }

    /// Angle for a workload. Unknown workloads and "nothing active" both map
    /// to the default angle.
    pub fn angle_for(&self, workload: Option<&str>) -> f64 {
        workload
            .and_then(|name| self.targets.iter().find(|t| t.workload == name))
            .map(|t| t.angle)
            .unwrap_or(self.default_angle)
    }

    /// Observe the source once. Returns `Some(angle)` only when the active
    /// workload differs from the previous observation.
    pub async fn poll(&mut self) -> Result<Option<f64>, MonitorError> {
        let observed = match self.source.active_workload().await {
            Ok(observed) => observed,
            Err(e) => {
                self.consecutive_failures += 1;
                return Err(e);
            }
        };
        if self.consecutive_failures > 0 {
            tracing::info!(
                "Workload source recovered after {} failed polls",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
        }
        if self.last_seen.as_ref() == Some(&observed) {
            return Ok(None);
        }
        let angle = self.angle_for(observed.as_deref());
        tracing::info!(
            "Active workload now {} -> {:.1} deg",
            observed.as_deref().unwrap_or("<none>"),
            angle
        );
        self.last_seen = Some(observed);
        Ok(Some(angle))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
