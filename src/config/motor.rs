//! Stepper driver, worm gear motor and ramp configuration.

use serde::Deserialize;

use super::limits::StepLimits;
use super::units::{Degrees, Level};

/// GPIO pin numbers of the four stepper driver lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DriverPins {
    /// Active-low enable line.
    pub enable: u8,
    /// Active-low sleep line.
    pub sleep: u8,
    /// Step pulse line.
    pub step: u8,
    /// Direction line.
    pub direction: u8,
}

/// Worm gear motor configuration from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MotorConfig {
    /// Direction line level that increases the position.
    pub direction: Level,

    /// Travel distance of a single pulse.
    pub step_width: f64,

    /// Commanded stepping rate in pulses per second.
    pub pps: f64,

    /// Lowest allowed position (also the home position).
    pub limit_lower: f64,

    /// Highest allowed position.
    pub limit_upper: f64,

    /// Return to the lower limit on shutdown.
    #[serde(default = "default_reset_on_shutdown")]
    pub reset_on_shutdown: bool,
}

fn default_reset_on_shutdown() -> bool {
    true
}

impl MotorConfig {
    /// Travel limits in steps.
    pub fn step_limits(&self) -> StepLimits {
        StepLimits::from_positions(self.limit_lower, self.limit_upper, self.step_width)
    }
}

/// Ramp geometry from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RampConfig {
    /// Length of the ramp side adjacent to the tilt angle, in position units.
    pub adjacent: f64,

    /// Angle of the ramp when the motor sits at position zero.
    #[serde(default, rename = "offset_degrees")]
    pub offset: Degrees,

    /// Angle moved between two current angle publications.
    #[serde(rename = "step_size_degrees")]
    pub step_size: Degrees,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limits() {
        let config = MotorConfig {
            direction: Level::Low,
            step_width: 0.025,
            pps: 1000.0,
            limit_lower: 0.0,
            limit_upper: 82.0,
            reset_on_shutdown: true,
        };

        assert_eq!(config.step_limits(), StepLimits::new(0, 3280));
    }
}
