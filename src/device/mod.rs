//! Elevator and landing zone devices.
//!
//! The server only needs to switch the elevator on and off and to wait for
//! the landing zone to report an edge, so both are small traits.

use core::time::Duration;

use embedded_hal::pwm::SetDutyCycle;

use crate::error::{ConfigError, DeviceError, Message, Result};

#[cfg(feature = "rpi")]
pub mod rpi;

/// Actuator carrying the ball to the top of the ramp.
pub trait Actuator {
    /// Start the actuator.
    fn enable(&mut self) -> Result<()>;

    /// Stop the actuator.
    fn disable(&mut self) -> Result<()>;

    /// Stop the actuator and give up the underlying hardware.
    fn release(mut self) -> Result<()>
    where
        Self: Sized,
    {
        self.disable()
    }
}

/// Edge sensing input detecting the ball's arrival.
pub trait EdgeSensor {
    /// Block until an edge is observed or `timeout` expires.
    ///
    /// Returns `Ok(true)` for an edge and `Ok(false)` on timeout. Edges
    /// that happened before the call are ignored.
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<bool>;

    /// Give up the underlying hardware.
    fn release(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Elevator driven by any embedded-hal PWM channel.
///
/// Enabling applies the configured duty cycle, disabling turns the output
/// fully off.
pub struct PwmActuator<P>
where
    P: SetDutyCycle,
{
    pwm: P,
    duty_cycle: f64,
    enabled: bool,
}

impl<P> PwmActuator<P>
where
    P: SetDutyCycle,
{
    /// Wrap a PWM channel; `duty_cycle` is in percent.
    pub fn new(pwm: P, duty_cycle: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&duty_cycle) {
            return Err(ConfigError::InvalidDutyCycle(duty_cycle).into());
        }

        let mut actuator = Self {
            pwm,
            duty_cycle,
            enabled: true,
        };
        actuator.disable()?;
        Ok(actuator)
    }

    /// Whether the duty cycle is currently applied.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Give back the PWM channel, turned off.
    pub fn into_inner(mut self) -> Result<P> {
        self.disable()?;
        Ok(self.pwm)
    }
}

impl<P> Actuator for PwmActuator<P>
where
    P: SetDutyCycle,
{
    fn enable(&mut self) -> Result<()> {
        let max = f64::from(self.pwm.max_duty_cycle());
        let duty = libm::round(max * self.duty_cycle / 100.0) as u16;
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|e| DeviceError::Actuator(debug_text(&e)))?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|e| DeviceError::Actuator(debug_text(&e)))?;
        self.enabled = false;
        Ok(())
    }
}

fn debug_text<E: core::fmt::Debug>(error: &E) -> Message {
    use core::fmt::Write;

    let mut text = Message::new();
    // truncated output is still useful
    let _ = write!(text, "{:?}", error);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct FakePwm {
        duty: u16,
    }

    impl embedded_hal::pwm::ErrorType for FakePwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_pwm_actuator_duty() {
        let mut elevator = PwmActuator::new(FakePwm { duty: 500 }, 7.5).unwrap();
        assert!(!elevator.is_enabled());

        elevator.enable().unwrap();
        assert!(elevator.is_enabled());
        assert_eq!(elevator.pwm.duty, 75);

        elevator.disable().unwrap();
        assert_eq!(elevator.into_inner().unwrap().duty, 0);
    }

    #[test]
    fn test_pwm_actuator_rejects_duty() {
        assert!(PwmActuator::new(FakePwm { duty: 0 }, 120.0).is_err());
    }
}
