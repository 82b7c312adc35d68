// src/motion/target.rs - Single-slot, last-write-wins target handoff
use std::sync::{Mutex, MutexGuard};

use super::angle::normalize_angle;

/// Holds at most one pending target angle. A new request overwrites an
/// unconsumed one; nothing queues.
#[derive(Debug, Default)]
pub struct TargetChannel {
    pending: Mutex<Option<f64>>,
}

impl TargetChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<f64>> {
        // The slot is a plain Option, still consistent after a poisoning panic.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `angle` normalized into `[0, 360)` and return the stored value.
    /// Non-finite angles are dropped.
    pub fn request(&self, angle: f64) -> Option<f64> {
        if !angle.is_finite() {
            tracing::warn!("Ignoring non-finite target angle {}", angle);
            return None;
        }
        let normalized = normalize_angle(angle);
        let replaced = self.slot().replace(normalized);
        if let Some(previous) = replaced {
            tracing::debug!("Target {:.2} superseded by {:.2} before pickup", previous, normalized);
        }
        Some(normalized)
    }

    /// Take the pending target, clearing the slot.
    pub fn consume_pending(&self) -> Option<f64> {
        self.slot().take()
    }

    pub fn peek(&self) -> Option<f64> {
        *self.slot()
    }
}
