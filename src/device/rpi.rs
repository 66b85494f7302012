//! Raspberry Pi hardware built on `rppal`.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::hal::Delay;
use rppal::pwm::{Channel, Polarity, Pwm};

use crate::config::{DriverPins, Edge, ElevatorConfig, LandingZoneConfig};
use crate::error::{message, DeviceError, Result};
use crate::motor::StepperDriver;

use super::{Actuator, EdgeSensor};

fn gpio_error(e: rppal::gpio::Error) -> DeviceError {
    DeviceError::Gpio(message(&e.to_string()))
}

/// Open the GPIO controller.
pub fn open_gpio() -> Result<Gpio> {
    Ok(Gpio::new().map_err(gpio_error)?)
}

/// Acquire the four driver lines and build a stepper driver on them.
///
/// The lines start at the driver's power-on levels: enable high
/// (disabled), sleep high (awake), step and direction low.
pub fn open_driver(gpio: &Gpio, pins: &DriverPins) -> Result<StepperDriver<OutputPin, Delay>> {
    let output = |pin: u8, high: bool| -> Result<OutputPin> {
        let pin = gpio.get(pin).map_err(gpio_error)?;
        Ok(if high {
            pin.into_output_high()
        } else {
            pin.into_output_low()
        })
    };

    StepperDriver::new(
        output(pins.enable, true)?,
        output(pins.sleep, true)?,
        output(pins.step, false)?,
        output(pins.direction, false)?,
        Delay::new(),
    )
}

/// Elevator on a hardware PWM channel.
pub struct RpiActuator {
    pwm: Pwm,
}

impl RpiActuator {
    /// Configure a PWM channel, initially disabled.
    pub fn new(config: &ElevatorConfig) -> Result<Self> {
        let channel = match config.channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            2 => Channel::Pwm2,
            3 => Channel::Pwm3,
            other => {
                return Err(DeviceError::Gpio(message(&format!("no PWM channel {}", other))).into())
            }
        };

        let pwm = Pwm::with_frequency(
            channel,
            config.frequency,
            config.duty_cycle / 100.0,
            Polarity::Normal,
            false,
        )
        .map_err(|e| DeviceError::Actuator(message(&e.to_string())))?;

        Ok(Self { pwm })
    }
}

impl Actuator for RpiActuator {
    fn enable(&mut self) -> Result<()> {
        self.pwm
            .enable()
            .map_err(|e| DeviceError::Actuator(message(&e.to_string())).into())
    }

    fn disable(&mut self) -> Result<()> {
        self.pwm
            .disable()
            .map_err(|e| DeviceError::Actuator(message(&e.to_string())).into())
    }
}

/// Landing zone on an interrupt-capable input pin.
pub struct RpiEdgeSensor {
    pin: InputPin,
}

impl RpiEdgeSensor {
    /// Acquire the input pin and arm edge detection.
    pub fn new(gpio: &Gpio, config: &LandingZoneConfig) -> Result<Self> {
        let mut pin = gpio.get(config.pin).map_err(gpio_error)?.into_input();
        let trigger = match config.edge {
            Edge::Rising => Trigger::RisingEdge,
            Edge::Falling => Trigger::FallingEdge,
            Edge::Both => Trigger::Both,
        };
        pin.set_interrupt(trigger, None).map_err(gpio_error)?;

        Ok(Self { pin })
    }
}

impl EdgeSensor for RpiEdgeSensor {
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<bool> {
        let event = self
            .pin
            .poll_interrupt(true, Some(timeout))
            .map_err(|e| DeviceError::Sensor(message(&e.to_string())))?;
        Ok(event.is_some())
    }

    fn release(mut self) -> Result<()> {
        self.pin
            .clear_interrupt()
            .map_err(|e| DeviceError::Sensor(message(&e.to_string())).into())
    }
}
