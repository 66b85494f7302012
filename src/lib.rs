//! # ramp-experiment
//!
//! Remote controlled ramp experiment: a worm gear stepper motor tilts a
//! track, an elevator releases a ball and a landing zone sensor reports
//! its arrival. Targets and telemetry travel over a publish/subscribe bus.
//!
//! ## Features
//!
//! - **embedded-hal 1.0**: Driver lines are `OutputPin`s, timing uses `DelayNs`
//! - **no_std compatible**: Motor, ramp and wire codec work without standard library
//! - **Limit checked**: Moves outside the travel limits never touch the hardware
//! - **Incremental moves**: Long moves yield after every chunk for telemetry
//! - **Safe teardown**: Every layer powers its hardware down when dropped
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ramp_experiment::{Ramp, StepperDriver, WormMotor};
//!
//! let config = ramp_experiment::load_config("ramp.toml")?;
//!
//! let driver = StepperDriver::new(enable, sleep, step, direction, delay)?;
//! let motor = WormMotor::new(driver, &config.motor)?;
//! let mut ramp = Ramp::from_config(motor, &config.ramp)?;
//!
//! for angle in ramp.iter_angle(0.1, 0.01)? {
//!     println!("at {} rad", angle?);
//! }
//! ramp.shutdown()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables TOML loading, the server and the transport seam
//! - `defmt`: Enables defmt formatting for embedded targets
//! - `rpi`: Raspberry Pi GPIO and PWM through `rppal`
//! - `mqtt`: MQTT transport through `rumqttc`
//! - `cli`: Logging and argument parsing for the `ramp-experiment` binary

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod device;
pub mod error;
pub mod motor;
pub mod protocol;
pub mod ramp;

// Runtime modules (std only)
#[cfg(feature = "std")]
pub mod server;
#[cfg(feature = "std")]
pub mod transport;

// Re-exports for ergonomic API
pub use config::{validate_config, ExperimentConfig, MotorConfig, RampConfig};
pub use device::{Actuator, EdgeSensor, PwmActuator};
pub use error::{Error, Result};
pub use motor::{Direction, StepChunks, StepperDriver, WormMotor};
pub use protocol::{QoS, Status};
pub use ramp::{AngleChunks, Ramp};

#[cfg(feature = "std")]
pub use server::{ExperimentServer, ServerHandle, ServerSettings, Waiter};
#[cfg(feature = "std")]
pub use transport::{MessageHandler, Transport};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Degrees, Level};
