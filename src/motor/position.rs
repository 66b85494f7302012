//! Position tracking for the worm gear axis.
//!
//! Provides the absolute step counter with conversions to travel distance.

use crate::config::position_to_steps;

/// Absolute step counter.
///
/// Updated after every single pulse so it always matches the physical
/// position, even when a move is interrupted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Current position in steps (from origin)
    steps: i64,
    /// Travel distance of one step
    step_width: f64,
}

impl Position {
    /// Create a position tracker at a specific step count.
    #[inline]
    pub fn at(steps: i64, step_width: f64) -> Self {
        Self { steps, step_width }
    }

    /// Get current position in steps.
    #[inline]
    pub fn steps(&self) -> i64 {
        self.steps
    }

    /// Get current position in travel distance.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.steps as f64 * self.step_width
    }

    /// Get the travel distance of one step.
    #[inline]
    pub fn step_width(&self) -> f64 {
        self.step_width
    }

    /// Convert a travel distance to the nearest step count.
    #[inline]
    pub fn steps_for(&self, distance: f64) -> i64 {
        position_to_steps(distance, self.step_width)
    }

    /// Move by a number of steps.
    #[inline]
    pub fn move_steps(&mut self, delta: i64) {
        self.steps += delta;
    }

    /// Calculate steps needed to reach a target step count.
    #[inline]
    pub fn steps_to(&self, target: i64) -> i64 {
        target - self.steps
    }
}
