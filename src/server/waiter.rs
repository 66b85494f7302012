//! Cooldown gate.

use std::thread;
use std::time::{Duration, Instant};

/// Enforces a minimum time between a reset and the next action.
///
/// Used to let the landing zone stop oscillating before it is armed again.
#[derive(Debug, Clone)]
pub struct Waiter {
    period: Duration,
    last_reset: Instant,
}

impl Waiter {
    /// Create a waiter; the first period starts now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_reset: Instant::now(),
        }
    }

    /// Get the cooldown period.
    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start a new period.
    pub fn reset(&mut self) {
        self.last_reset = Instant::now();
    }

    /// Time left in the current period.
    pub fn remaining(&self) -> Duration {
        self.period.saturating_sub(self.last_reset.elapsed())
    }

    /// Whether the current period has not yet elapsed.
    pub fn is_waiting(&self) -> bool {
        !self.remaining().is_zero()
    }

    /// Sleep until the current period has elapsed and return the time slept.
    pub fn wait(&self) -> Duration {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_after_reset() {
        let mut waiter = Waiter::new(Duration::from_millis(50));
        waiter.reset();
        assert!(waiter.is_waiting());

        let start = Instant::now();
        let slept = waiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(slept <= Duration::from_millis(50));

        assert!(!waiter.is_waiting());
        assert_eq!(waiter.wait(), Duration::ZERO);
    }

    #[test]
    fn test_zero_period_never_waits() {
        let mut waiter = Waiter::new(Duration::ZERO);
        waiter.reset();
        assert!(!waiter.is_waiting());
        assert_eq!(waiter.wait(), Duration::ZERO);
    }
}
