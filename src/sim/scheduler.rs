//! Step scheduler
//!
//! Turns continuous frame time into discrete "take one step" events.

use serde::{Deserialize, Serialize};

/// Per-entity time accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepScheduler {
    accumulator: f32,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `dt` and report whether a step is due at `rate` steps/sec.
    ///
    /// Fires at most once per call. The interval is subtracted rather than
    /// resetting to zero, so fractional remainders carry over.
    pub fn advance(&mut self, dt: f32, rate: f32) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            return false;
        }
        self.accumulator += dt;
        let interval = 1.0 / rate;
        if self.accumulator >= interval {
            self.accumulator -= interval;
            true
        } else {
            false
        }
    }

    /// Time banked toward the next step
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_interval() {
        let mut sched = StepScheduler::new();
        // 4 steps/sec = 0.25s interval
        assert!(!sched.advance(0.2, 4.0));
        assert!(sched.advance(0.1, 4.0));
        assert!((sched.accumulated() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_at_most_one_step_per_pass() {
        let mut sched = StepScheduler::new();
        // A long frame banks time instead of firing multiple steps
        assert!(sched.advance(1.0, 10.0));
        assert!((sched.accumulated() - 0.9).abs() < 1e-6);
        assert!(sched.advance(0.0, 10.0));
    }

    #[test]
    fn test_remainder_preserved() {
        let mut sched = StepScheduler::new();
        let mut steps = 0;
        // 4 steps/sec over 1 second of 64 Hz frames (exact in binary)
        for _ in 0..64 {
            if sched.advance(1.0 / 64.0, 4.0) {
                steps += 1;
            }
        }
        assert_eq!(steps, 4);
        assert_eq!(sched.accumulated(), 0.0);
    }

    #[test]
    fn test_zero_rate_never_fires() {
        let mut sched = StepScheduler::new();
        assert!(!sched.advance(10.0, 0.0));
        assert!(!sched.advance(10.0, f32::NAN));
        assert_eq!(sched.accumulated(), 0.0);
    }
}
