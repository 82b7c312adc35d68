// src/motion/angle.rs - Unwrapping the tilt angle into an absolute angle

/// A platform that powers on beyond this raw angle is assumed to sit just
/// short of a full turn, so counting starts at -1 rotation.
const BOOT_WRAP_ANGLE: f64 = 270.0;

/// Normalize any finite angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Raw platform angle in `[0, 360)` from the filtered gravity projection.
pub fn raw_angle(x: f64, y: f64) -> f64 {
    normalize_angle(x.atan2(y).to_degrees() + 180.0)
}

/// Snapshot of the tracked angle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleState {
    pub relative: f64,
    pub absolute: f64,
    pub rotations: i64,
}

/// Turns the cyclic raw angle into a continuous absolute angle by counting
/// wraps through 0/360.
#[derive(Debug, Clone)]
pub struct AngleTracker {
    wrap_threshold: f64,
    state: Option<AngleState>,
}

impl AngleTracker {
    pub fn new(wrap_threshold: f64) -> Self {
        Self {
            wrap_threshold,
            state: None,
        }
    }

    /// Seed the tracker from the first valid raw angle.
    pub fn initialize(&mut self, raw: f64) -> AngleState {
        let relative = normalize_angle(raw);
        let rotations = if relative > BOOT_WRAP_ANGLE { -1 } else { 0 };
        let state = AngleState {
            relative,
            absolute: relative + (rotations * 360) as f64,
            rotations,
        };
        self.state = Some(state);
        state
    }

    /// Advance with a new raw angle. Returns the new state and whether a
    /// rotation was counted. An uninitialized tracker initializes instead.
    pub fn update(&mut self, raw: f64) -> (AngleState, bool) {
        let Some(previous) = self.state else {
            return (self.initialize(raw), false);
        };
        let relative = normalize_angle(raw);
        let delta = previous.relative - relative;
        let mut rotations = previous.rotations;
        let wrapped = delta.abs() > self.wrap_threshold;
        if wrapped {
            rotations += if delta >= 0.0 { 1 } else { -1 };
        }
        let state = AngleState {
            relative,
            absolute: relative + (rotations * 360) as f64,
            rotations,
        };
        self.state = Some(state);
        (state, wrapped)
    }

    pub fn state(&self) -> Option<AngleState> {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_angle() {
        assert!(approx(normalize_angle(400.0), 40.0));
        assert!(approx(normalize_angle(-10.0), 350.0));
        assert!(approx(normalize_angle(720.0), 0.0));
        assert!(approx(normalize_angle(359.5), 359.5));
        let tiny = normalize_angle(-1e-20);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn test_raw_angle_quadrants() {
        // Gravity along -y reads as 0 degrees.
        assert!(approx(raw_angle(0.0, -1.0), 0.0));
        assert!(approx(raw_angle(-1.0, 0.0), 90.0));
        assert!(approx(raw_angle(0.0, 1.0), 180.0));
        assert!(approx(raw_angle(1.0, 0.0), 270.0));
    }

    #[test]
    fn test_wrap_forward_counts_rotation() {
        let mut tracker = AngleTracker::new(300.0);
        tracker.initialize(359.0);
        let before = tracker.state().unwrap().rotations;
        let (state, wrapped) = tracker.update(2.0);
        assert!(wrapped);
        assert_eq!(state.rotations, before + 1);
        assert!(approx(state.absolute, 2.0 + 360.0 * (before + 1) as f64));
    }

    #[test]
    fn test_boot_past_wrap_starts_at_minus_one() {
        let mut tracker = AngleTracker::new(300.0);
        let state = tracker.initialize(350.0);
        assert_eq!(state.rotations, -1);
        assert!(approx(state.absolute, -10.0));

        let state = AngleTracker::new(300.0).initialize(270.0);
        assert_eq!(state.rotations, 0);
        assert!(approx(state.absolute, 270.0));
    }

    #[test]
    fn test_wrap_backward_counts_rotation() {
        let mut tracker = AngleTracker::new(300.0);
        tracker.initialize(1.0);
        let (state, wrapped) = tracker.update(358.0);
        assert!(wrapped);
        assert_eq!(state.rotations, -1);
        assert!(approx(state.absolute, -2.0));
    }

    #[test]
    fn test_absolute_angle_has_no_silent_jumps() {
        let mut tracker = AngleTracker::new(300.0);
        tracker.initialize(0.0);
        let mut previous = tracker.state().unwrap();
        // Three and a half turns forward then back, 7 degrees per sample.
        let mut angle: f64 = 0.0;
        for step in 0..400 {
            angle += if step < 200 { 7.0 } else { -7.0 };
            let (state, wrapped) = tracker.update(normalize_angle(angle));
            assert!(approx(state.absolute, state.relative + 360.0 * state.rotations as f64));
            if !wrapped {
                assert!((state.absolute - previous.absolute).abs() < 300.0);
            }
            assert!(approx(state.absolute, angle));
            previous = state;
        }
    }

    #[test]
    fn test_update_without_initialize_seeds_tracker() {
        let mut tracker = AngleTracker::new(300.0);
        assert!(!tracker.is_initialized());
        let (state, wrapped) = tracker.update(300.0);
        assert!(!wrapped);
        assert_eq!(state.rotations, -1);
        assert!(tracker.is_initialized());
    }
}
