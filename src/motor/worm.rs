//! Worm gear motor.
//!
//! Turns absolute step or position targets into pulse sequences on a
//! [`StepperDriver`], keeping the step counter inside the travel limits.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::units::Level;
use crate::config::{MotorConfig, StepLimits};
use crate::error::{MotorError, Result};

use super::chunks::StepChunks;
use super::driver::StepperDriver;
use super::position::Position;

/// Direction of travel along the worm gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing step count.
    Forward,
    /// Decreasing step count.
    Backward,
}

impl Direction {
    /// Get direction from a signed step delta.
    #[inline]
    pub fn from_delta(delta: i64) -> Self {
        if delta >= 0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Stepper motor driving a worm gear linear axis.
///
/// The axis starts at its lower limit. Dropping the motor runs the same
/// shutdown as [`WormMotor::shutdown`].
pub struct WormMotor<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    driver: StepperDriver<P, D>,

    /// Direction line level that increases the step count.
    forward: Level,

    /// Absolute step counter.
    position: Position,

    /// Inclusive travel limits in steps.
    limits: StepLimits,

    /// Pause after each pulse so the rate matches the configured pps.
    pulse_interval_ns: u64,

    /// Move back to the lower limit on shutdown.
    reset_on_shutdown: bool,

    shut_down: bool,
}

impl<P, D> WormMotor<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Create a motor on top of a driver.
    ///
    /// The driver is put to sleep and enabled so it is ready as soon as it
    /// is woken for the first move.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry is invalid or a driver line fails.
    pub fn new(mut driver: StepperDriver<P, D>, config: &MotorConfig) -> Result<Self> {
        crate::config::validate_motor(config)?;

        driver.sleep()?;
        driver.enable()?;

        let pulse_width = f64::from(driver.timing().pulse_width_ns);
        let interval = 1_000_000_000.0 / config.pps - 2.0 * pulse_width;
        let limits = config.step_limits();

        Ok(Self {
            driver,
            forward: config.direction,
            position: Position::at(limits.lower, config.step_width),
            limits,
            pulse_interval_ns: if interval > 0.0 { interval as u64 } else { 0 },
            reset_on_shutdown: config.reset_on_shutdown,
            shut_down: false,
        })
    }

    /// Move to an absolute step count.
    ///
    /// # Errors
    ///
    /// Returns [`MotorError::OutOfRange`] without touching the hardware if
    /// `target` is outside the travel limits.
    pub fn set_steps(&mut self, target: i64) -> Result<()> {
        let delta = self.position.steps_to(self.limits.check(target)?);
        if delta == 0 {
            return Ok(());
        }

        for chunk in self.iter_steps(target, delta.abs())? {
            chunk?;
        }
        Ok(())
    }

    /// Get the absolute step count.
    #[inline]
    pub fn get_steps(&self) -> i64 {
        self.position.steps()
    }

    /// Move to an absolute step count in chunks of `chunk` pulses.
    ///
    /// The returned iterator performs one chunk per call to `next` and
    /// yields the step count reached. Limits and chunk size are checked
    /// before any pulse is issued.
    pub fn iter_steps(&mut self, target: i64, chunk: i64) -> Result<StepChunks<'_, P, D>> {
        if chunk <= 0 {
            return Err(MotorError::InvalidChunk(chunk).into());
        }
        let delta = self.position.steps_to(self.limits.check(target)?);

        Ok(StepChunks::new(
            self,
            Direction::from_delta(delta),
            delta.unsigned_abs(),
            chunk as u64,
        ))
    }

    /// Move to an absolute position.
    pub fn set_position(&mut self, position: f64) -> Result<()> {
        self.set_steps(self.position.steps_for(position))
    }

    /// Get the absolute position.
    #[inline]
    pub fn get_position(&self) -> f64 {
        self.position.distance()
    }

    /// Move to an absolute position in chunks of `step_size` travel.
    pub fn iter_position(&mut self, position: f64, step_size: f64) -> Result<StepChunks<'_, P, D>> {
        let target = self.position.steps_for(position);
        let chunk = self.position.steps_for(step_size);
        self.iter_steps(target, chunk)
    }

    /// Get the travel limits in steps.
    #[inline]
    pub fn limits(&self) -> StepLimits {
        self.limits
    }

    /// Get the travel distance of one step.
    #[inline]
    pub fn step_width(&self) -> f64 {
        self.position.step_width()
    }

    /// Get the pause after each pulse in nanoseconds.
    #[inline]
    pub fn pulse_interval_ns(&self) -> u64 {
        self.pulse_interval_ns
    }

    /// Get the underlying driver.
    #[inline]
    pub fn driver(&self) -> &StepperDriver<P, D> {
        &self.driver
    }

    /// Return to the lower limit if configured, then shut the driver down.
    ///
    /// The driver shutdown runs even if the return move fails.
    pub fn shutdown(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.shut_down = true;

        let homed = if self.reset_on_shutdown {
            self.set_steps(self.limits.lower)
        } else {
            Ok(())
        };
        if let Err(e) = &homed {
            log::error!("failed to return motor to {}: {}", self.limits.lower, e);
        }

        let powered_down = self.driver.power_down();
        homed.and(powered_down)
    }

    pub(super) fn start_move(&mut self, direction: Direction) -> Result<()> {
        let level = match direction {
            Direction::Forward => self.forward,
            Direction::Backward => self.forward.opposite(),
        };
        self.driver.set_direction(level)?;
        self.driver.wake()
    }

    pub(super) fn pulse(&mut self, direction: Direction) -> Result<()> {
        self.driver.step()?;
        self.position.move_steps(direction.sign());
        self.driver.pause_ns(self.pulse_interval_ns);
        Ok(())
    }

    pub(super) fn rest(&mut self) -> Result<()> {
        self.driver.sleep()
    }
}

impl<P, D> Drop for WormMotor<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    fn drop(&mut self) {
        if !self.shut_down {
            if let Err(e) = self.finish() {
                log::error!("motor shutdown failed: {}", e);
            }
        }
    }
}
