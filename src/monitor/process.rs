// src/monitor/process.rs - Workload detection from the Linux process table
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;

use super::{MonitorError, WorkloadSource};

/// Reports the first watched workload (in priority order) that has a running
/// process, matching on `/proc/<pid>/comm`.
#[derive(Debug, Clone)]
pub struct ProcessTable {
    root: PathBuf,
    watched: Vec<String>,
}

impl ProcessTable {
    pub fn new(watched: Vec<String>) -> Self {
        Self::with_root("/proc", watched)
    }

    pub fn with_root(root: impl Into<PathBuf>, watched: Vec<String>) -> Self {
        Self {
            root: root.into(),
            watched,
        }
    }

    async fn running_commands(&self) -> Result<HashSet<String>, MonitorError> {
        let mut running = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_pid = name
                .to_str()
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            if !is_pid {
                continue;
            }
            // The process may exit between listing and reading.
            if let Ok(comm) = tokio::fs::read_to_string(entry.path().join("comm")).await {
                running.insert(comm.trim().to_string());
            }
        }
        Ok(running)
    }
}

#[async_trait]
impl WorkloadSource for ProcessTable {
    async fn active_workload(&mut self) -> Result<Option<String>, MonitorError> {
        let running = self.running_commands().await?;
        tracing::trace!("{} distinct commands running", running.len());
        Ok(self.watched.iter().find(|w| running.contains(*w)).cloned())
    }
}
