//! Ramp geometry.
//!
//! The motor lifts one end of the track, so the motor position is the side
//! opposite the tilt angle: `opposite = tan(angle) * adjacent`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use libm::{atan, tan};

use crate::config::RampConfig;
use crate::error::{ConfigError, Result};
use crate::motor::{StepChunks, WormMotor};

/// Tilting track driven by a worm gear motor.
pub struct Ramp<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    motor: WormMotor<P, D>,
    adjacent: f64,
    /// Angular offset folded into a position, since tan(a + b) != tan(a) + tan(b).
    offset: f64,
}

impl<P, D> Ramp<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Create a ramp from its motor, the adjacent side length and the
    /// angle (radians) the ramp has at motor position zero.
    pub fn new(motor: WormMotor<P, D>, adjacent: f64, offset: f64) -> Result<Self> {
        if !(adjacent > 0.0) {
            return Err(ConfigError::InvalidAdjacent(adjacent).into());
        }

        Ok(Self {
            motor,
            adjacent,
            offset: tan(offset) * adjacent,
        })
    }

    /// Create a ramp from configuration.
    pub fn from_config(motor: WormMotor<P, D>, config: &RampConfig) -> Result<Self> {
        Self::new(motor, config.adjacent, config.offset.to_radians())
    }

    /// Motor position that tilts the ramp to `angle` radians.
    #[inline]
    pub fn position_for(&self, angle: f64) -> f64 {
        tan(angle) * self.adjacent - self.offset
    }

    /// Ramp angle in radians at motor position `position`.
    #[inline]
    pub fn angle_for(&self, position: f64) -> f64 {
        atan((position + self.offset) / self.adjacent)
    }

    /// Tilt the ramp to `angle` radians.
    pub fn set_angle(&mut self, angle: f64) -> Result<()> {
        let position = self.position_for(angle);
        self.motor.set_position(position)
    }

    /// Get the ramp angle in radians.
    pub fn get_angle(&self) -> f64 {
        self.angle_for(self.motor.get_position())
    }

    /// Tilt the ramp to `angle` radians, pausing every `step_size` radians.
    ///
    /// Both angles are translated to travel distances and the move runs as
    /// [`WormMotor::iter_position`]. Each item is the ramp angle reached
    /// after a chunk.
    pub fn iter_angle(&mut self, angle: f64, step_size: f64) -> Result<AngleChunks<'_, P, D>> {
        let position = self.position_for(angle);
        let distance = tan(step_size) * self.adjacent;
        let geometry = Geometry {
            adjacent: self.adjacent,
            offset: self.offset,
            step_width: self.motor.step_width(),
        };

        Ok(AngleChunks {
            steps: self.motor.iter_position(position, distance)?,
            geometry,
        })
    }

    /// Get the adjacent side length.
    #[inline]
    pub fn adjacent(&self) -> f64 {
        self.adjacent
    }

    /// Get the angular offset as a position.
    #[inline]
    pub fn offset_position(&self) -> f64 {
        self.offset
    }

    /// Get the motor.
    #[inline]
    pub fn motor(&self) -> &WormMotor<P, D> {
        &self.motor
    }

    /// Get the motor mutably.
    #[inline]
    pub fn motor_mut(&mut self) -> &mut WormMotor<P, D> {
        &mut self.motor
    }

    /// Shut the motor down.
    pub fn shutdown(self) -> Result<()> {
        self.motor.shutdown()
    }
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    adjacent: f64,
    offset: f64,
    step_width: f64,
}

/// An incremental ramp move, yielding the angle reached after each chunk.
pub struct AngleChunks<'a, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    steps: StepChunks<'a, P, D>,
    geometry: Geometry,
}

impl<P, D> Iterator for AngleChunks<'_, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let g = self.geometry;
        self.steps.next().map(|steps| {
            steps.map(|steps| atan((steps as f64 * g.step_width + g.offset) / g.adjacent))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl<P, D> core::iter::FusedIterator for AngleChunks<'_, P, D>
where
    P: OutputPin,
    D: DelayNs,
{
}
