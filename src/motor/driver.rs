//! A4988-style stepper driver.
//!
//! Owns the four driver lines and issues raw step pulses. Generic over
//! embedded-hal 1.0 output pins and delay providers.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::units::Level;
use crate::error::{Line, MotorError, Result};

/// Time the driver needs after leaving sleep mode before it accepts pulses (1 ms).
pub const WAKE_SETTLE_NS: u32 = 1_000_000;

/// Minimum high and low time of a step pulse (1 µs).
pub const PULSE_WIDTH_NS: u32 = 1_000;

/// Driver chip timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTiming {
    /// Settle delay after waking, in nanoseconds.
    pub wake_settle_ns: u32,
    /// Duration of each half of a step pulse, in nanoseconds.
    pub pulse_width_ns: u32,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            wake_settle_ns: WAKE_SETTLE_NS,
            pulse_width_ns: PULSE_WIDTH_NS,
        }
    }
}

/// Stepper driver with active-low enable and sleep lines.
///
/// Generic over:
/// - `P`: line type shared by enable, sleep, step and direction (must implement `OutputPin`)
/// - `D`: delay provider (must implement `DelayNs`)
///
/// Dropping the driver puts it to sleep and disables it before the lines
/// are released, so the coils are never left energized.
pub struct StepperDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    enable: P,
    sleep: P,
    step: P,
    direction: P,
    delay: D,
    timing: DriverTiming,

    /// Level of each control line after its last successful write.
    /// `OutputPin` lines cannot be read back.
    enabled: bool,
    sleeping: bool,
    level: Level,

    /// Set once the driver has been powered down for good.
    shut_down: bool,
}

impl<P, D> StepperDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the driver lines.
    ///
    /// The driver starts disabled and awake, with the step and direction
    /// lines low.
    pub fn new(enable: P, sleep: P, step: P, direction: P, delay: D) -> Result<Self> {
        let mut driver = Self {
            enable,
            sleep,
            step,
            direction,
            delay,
            timing: DriverTiming::default(),
            enabled: false,
            sleeping: false,
            level: Level::Low,
            shut_down: false,
        };

        driver.enable.set_high().map_err(|_| MotorError::Line(Line::Enable))?;
        driver.sleep.set_high().map_err(|_| MotorError::Line(Line::Sleep))?;
        driver.step.set_low().map_err(|_| MotorError::Line(Line::Step))?;
        driver.direction.set_low().map_err(|_| MotorError::Line(Line::Direction))?;

        Ok(driver)
    }

    /// Override the chip timing.
    pub fn with_timing(mut self, timing: DriverTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Get the chip timing.
    #[inline]
    pub fn timing(&self) -> DriverTiming {
        self.timing
    }

    /// Energize the motor (enable line low).
    pub fn enable(&mut self) -> Result<()> {
        self.enable.set_low().map_err(|_| MotorError::Line(Line::Enable))?;
        self.enabled = true;
        Ok(())
    }

    /// De-energize the motor (enable line high).
    pub fn disable(&mut self) -> Result<()> {
        self.enable.set_high().map_err(|_| MotorError::Line(Line::Enable))?;
        self.enabled = false;
        Ok(())
    }

    /// Whether the enable line is low.
    ///
    /// Reflects the last successful write; a failed write leaves it as is.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enter sleep mode (sleep line low).
    pub fn sleep(&mut self) -> Result<()> {
        self.sleep.set_low().map_err(|_| MotorError::Line(Line::Sleep))?;
        self.sleeping = true;
        Ok(())
    }

    /// Leave sleep mode and wait until the chip accepts pulses.
    pub fn wake(&mut self) -> Result<()> {
        self.sleep.set_high().map_err(|_| MotorError::Line(Line::Sleep))?;
        self.sleeping = false;
        self.delay.delay_ns(self.timing.wake_settle_ns);
        Ok(())
    }

    /// Whether the sleep line is low.
    ///
    /// Reflects the last successful write; a failed write leaves it as is.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Set the direction line.
    pub fn set_direction(&mut self, level: Level) -> Result<()> {
        match level {
            Level::High => self.direction.set_high(),
            Level::Low => self.direction.set_low(),
        }
        .map_err(|_| MotorError::Line(Line::Direction))?;
        self.level = level;
        Ok(())
    }

    /// Get the last level written to the direction line.
    #[inline]
    pub fn direction(&self) -> Level {
        self.level
    }

    /// Issue a single step pulse.
    pub fn step(&mut self) -> Result<()> {
        self.step.set_high().map_err(|_| MotorError::Line(Line::Step))?;
        self.delay.delay_ns(self.timing.pulse_width_ns);
        self.step.set_low().map_err(|_| MotorError::Line(Line::Step))?;
        self.delay.delay_ns(self.timing.pulse_width_ns);
        Ok(())
    }

    /// Block for `ns` nanoseconds using the driver's delay provider.
    pub(crate) fn pause_ns(&mut self, ns: u64) {
        if ns > u64::from(u32::MAX) {
            self.delay.delay_us((ns / 1_000).min(u64::from(u32::MAX)) as u32);
        } else if ns > 0 {
            self.delay.delay_ns(ns as u32);
        }
    }

    /// Put the driver to sleep, disable it and release the lines.
    ///
    /// Both line writes are attempted even if the first one fails; the
    /// first failure is returned.
    pub fn shutdown(mut self) -> Result<()> {
        self.power_down()
    }

    pub(crate) fn power_down(&mut self) -> Result<()> {
        self.shut_down = true;
        let slept = self.sleep();
        let disabled = self.disable();
        slept.and(disabled)
    }
}

impl<P, D> Drop for StepperDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    fn drop(&mut self) {
        if !self.shut_down {
            if let Err(e) = self.power_down() {
                log::error!("failed to power down stepper driver: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    struct Lines {
        enable: PinMock,
        sleep: PinMock,
        step: PinMock,
        direction: PinMock,
    }

    impl Lines {
        fn new(
            enable: &[Transaction],
            sleep: &[Transaction],
            step: &[Transaction],
            direction: &[Transaction],
        ) -> Self {
            Self {
                enable: PinMock::new(enable),
                sleep: PinMock::new(sleep),
                step: PinMock::new(step),
                direction: PinMock::new(direction),
            }
        }

        fn driver(&self) -> StepperDriver<PinMock, NoopDelay> {
            StepperDriver::new(
                self.enable.clone(),
                self.sleep.clone(),
                self.step.clone(),
                self.direction.clone(),
                NoopDelay::new(),
            )
            .unwrap()
        }

        fn done(mut self) {
            self.enable.done();
            self.sleep.done();
            self.step.done();
            self.direction.done();
        }
    }

    #[test]
    fn test_new_then_shutdown_sequence() {
        let lines = Lines::new(
            &[Transaction::set(State::High), Transaction::set(State::High)],
            &[Transaction::set(State::High), Transaction::set(State::Low)],
            &[Transaction::set(State::Low)],
            &[Transaction::set(State::Low)],
        );

        let driver = lines.driver();
        assert!(!driver.is_enabled());
        assert!(!driver.is_sleeping());
        driver.shutdown().unwrap();

        lines.done();
    }

    #[test]
    fn test_enable_wake_step() {
        let lines = Lines::new(
            &[
                Transaction::set(State::High),
                Transaction::set(State::Low),
                // drop
                Transaction::set(State::High),
            ],
            &[
                Transaction::set(State::High),
                Transaction::set(State::Low),
                Transaction::set(State::High),
                // drop
                Transaction::set(State::Low),
            ],
            &[
                Transaction::set(State::Low),
                Transaction::set(State::High),
                Transaction::set(State::Low),
            ],
            &[Transaction::set(State::Low), Transaction::set(State::High)],
        );

        {
            let mut driver = lines.driver();
            driver.enable().unwrap();
            assert!(driver.is_enabled());
            driver.sleep().unwrap();
            assert!(driver.is_sleeping());
            driver.wake().unwrap();
            assert!(!driver.is_sleeping());
            driver.set_direction(Level::High).unwrap();
            assert_eq!(driver.direction(), Level::High);
            driver.step().unwrap();
        }

        lines.done();
    }

    #[test]
    fn test_default_timing() {
        let timing = DriverTiming::default();
        assert_eq!(timing.wake_settle_ns, 1_000_000);
        assert_eq!(timing.pulse_width_ns, 1_000);
    }
}
