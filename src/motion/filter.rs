// src/motion/filter.rs - Per-axis moving-average smoothing
use std::collections::VecDeque;

/// Fixed-depth moving average over the most recent raw values.
///
/// The window starts zero-filled, so the first `depth` outputs are biased
/// toward zero. Callers treat the output as valid once [`is_primed`] holds.
///
/// [`is_primed`]: SampleFilter::is_primed
#[derive(Debug, Clone)]
pub struct SampleFilter {
    window: VecDeque<f64>,
    depth: usize,
    consumed: usize,
}

impl SampleFilter {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            window: std::iter::repeat(0.0).take(depth).collect(),
            depth,
            consumed: 0,
        }
    }

    /// Push `value`, dropping the oldest, and return the mean of the window
    /// including `value`.
    pub fn update(&mut self, value: f64) -> f64 {
        self.window.pop_front();
        self.window.push_back(value);
        self.consumed = self.consumed.saturating_add(1);
        self.window.iter().sum::<f64>() / self.depth as f64
    }

    pub fn is_primed(&self) -> bool {
        self.consumed >= self.depth
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
