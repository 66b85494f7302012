//! Unit and polarity types.
//!
//! Keeps logic levels and angle units explicit so a boolean or a bare float
//! never has to carry meaning on its own.

use core::ops::Not;

use serde::Deserialize;

/// Logic level of a digital line.
///
/// | Variant | Line state | Stepper driver meaning                         |
/// |---------|------------|------------------------------------------------|
/// | `Low`   | 0 V        | enable: enabled, sleep: sleeping               |
/// | `High`  | VCC        | enable: disabled, sleep: awake                 |
///
/// On the direction line the meaning of each level depends on the wiring,
/// which is why the motor is configured with the level that moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Logic low.
    #[default]
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// Get the other level.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    /// Whether this is the high level.
    #[inline]
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl Not for Level {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.opposite()
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Angle in degrees.
///
/// Used for configuration only. Everything at runtime works in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

impl Degrees {
    /// Create a new Degrees value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Convert to radians.
    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Create from radians.
    #[inline]
    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_opposite() {
        assert_eq!(Level::Low.opposite(), Level::High);
        assert_eq!(!Level::High, Level::Low);
        assert_eq!(Level::from(true), Level::High);
    }

    #[test]
    fn test_degrees_conversion() {
        let d = Degrees(180.0);
        assert!((d.to_radians() - core::f64::consts::PI).abs() < 1e-12);
        assert!((Degrees::from_radians(core::f64::consts::FRAC_PI_2).value() - 90.0).abs() < 1e-9);
    }
}
