//! Travel limits of the worm gear axis.

use crate::error::{MotorError, Result};

/// Travel limits converted to steps (for runtime use).
///
/// Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLimits {
    /// Lowest allowed absolute step count.
    pub lower: i64,
    /// Highest allowed absolute step count.
    pub upper: i64,
}

impl StepLimits {
    /// Create new step limits.
    pub const fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    /// Convert travel limits in position units to steps.
    ///
    /// Positions are rounded to the nearest whole step.
    pub fn from_positions(lower: f64, upper: f64, step_width: f64) -> Self {
        Self {
            lower: position_to_steps(lower, step_width),
            upper: position_to_steps(upper, step_width),
        }
    }

    /// Check if a step count is within limits.
    #[inline]
    pub fn contains(&self, steps: i64) -> bool {
        steps >= self.lower && steps <= self.upper
    }

    /// Reject step counts outside the limits.
    pub fn check(&self, target: i64) -> Result<i64> {
        if self.contains(target) {
            Ok(target)
        } else {
            Err(MotorError::OutOfRange {
                target,
                lower: self.lower,
                upper: self.upper,
            }
            .into())
        }
    }
}

/// Convert a position to the nearest whole step count.
#[inline]
pub fn position_to_steps(position: f64, step_width: f64) -> i64 {
    libm::round(position / step_width) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_limits_inclusive() {
        let limits = StepLimits::new(0, 3280);

        assert!(limits.contains(0));
        assert!(limits.contains(3280));
        assert!(!limits.contains(-1));
        assert!(!limits.contains(3281));
    }

    #[test]
    fn test_check_reports_both_limits() {
        let limits = StepLimits::new(-10, 10);

        assert_eq!(limits.check(5), Ok(5));
        assert_eq!(
            limits.check(11),
            Err(Error::Motor(MotorError::OutOfRange { target: 11, lower: -10, upper: 10 }))
        );
    }

    #[test]
    fn test_from_positions_rounds() {
        // 82 / 0.025 is 3279.9999... in floating point
        let limits = StepLimits::from_positions(0.0, 82.0, 0.025);
        assert_eq!(limits, StepLimits::new(0, 3280));
    }
}
