//! Transport, device and experiment configuration.

use heapless::String;
use serde::Deserialize;

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub host: String<64>,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional user name.
    #[serde(default)]
    pub user: Option<String<64>>,

    /// Optional password (only used together with `user`).
    #[serde(default)]
    pub password: Option<String<64>>,

    /// Connect using TLS.
    #[serde(default)]
    pub tls: bool,

    /// Client identifier.
    pub client_id: String<64>,

    /// Start with a clean session.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,

    /// Quality of service for every publish and subscribe.
    #[serde(default)]
    pub qos: u8,

    /// Keep alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_clean_session() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    60
}

/// Topic names used by the experiment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicConfig {
    /// Retained experiment status (also the last will).
    pub status: String<64>,
    /// Time of the last landing zone event.
    pub last_timestamp: String<64>,
    /// Current ramp angle.
    pub current_angle: String<64>,
    /// Requested ramp angle.
    pub target_angle: String<64>,
}

/// Hardware PWM channel driving the elevator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElevatorConfig {
    /// PWM channel number.
    pub channel: u8,
    /// PWM frequency in hertz.
    pub frequency: f64,
    /// Duty cycle in percent while the elevator runs.
    pub duty_cycle: f64,
}

/// Which signal transition counts as a landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Low to high transition.
    #[default]
    Rising,
    /// High to low transition.
    Falling,
    /// Any transition.
    Both,
}

/// Edge sensing input of the landing zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LandingZoneConfig {
    /// GPIO pin number.
    pub pin: u8,
    /// Edge to wait for.
    #[serde(default)]
    pub edge: Edge,
}

/// Timing of a single experiment run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperimentSettings {
    /// How long to wait for the ball to reach the landing zone.
    pub timeout_secs: f64,
    /// Minimum time between two landing zone waits.
    pub cooldown_secs: f64,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_level")]
    pub level: String<16>,
    /// Optional log file, written in addition to the terminal.
    #[serde(default)]
    pub file: Option<String<128>>,
}

fn default_level() -> String<16> {
    let mut level = String::new();
    let _ = level.push_str("info");
    level
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}
