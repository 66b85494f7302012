//! Configuration module for the ramp experiment.
//!
//! Provides types for loading and validating the experiment configuration
//! from TOML files (with `std` feature) or pre-parsed data.

mod limits;
mod motor;
mod server;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use limits::{position_to_steps, StepLimits};
pub use motor::{DriverPins, MotorConfig, RampConfig};
pub use server::{
    Edge, ElevatorConfig, ExperimentSettings, LandingZoneConfig, LoggingConfig, MqttConfig,
    TopicConfig,
};
pub use system::ExperimentConfig;
pub use validation::validate_config;
pub(crate) use validation::validate_motor;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Degrees, Level};
