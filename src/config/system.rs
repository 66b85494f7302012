//! Experiment configuration - root configuration structure.

use serde::Deserialize;

use super::motor::{DriverPins, MotorConfig, RampConfig};
use super::server::{
    ElevatorConfig, ExperimentSettings, LandingZoneConfig, LoggingConfig, MqttConfig, TopicConfig,
};

/// Root configuration structure from TOML.
///
/// Loaded once at process start and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperimentConfig {
    /// Broker connection.
    pub mqtt: MqttConfig,

    /// Topic names.
    pub topics: TopicConfig,

    /// Stepper driver pins.
    pub driver: DriverPins,

    /// Worm gear motor geometry and speed.
    pub motor: MotorConfig,

    /// Ramp geometry.
    pub ramp: RampConfig,

    /// Elevator PWM channel.
    pub elevator: ElevatorConfig,

    /// Landing zone input.
    pub landing_zone: LandingZoneConfig,

    /// Sensor timeout and cooldown.
    pub experiment: ExperimentSettings,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}
