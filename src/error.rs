//! Error types for the ramp experiment.
//!
//! Provides unified error handling across configuration, motor control,
//! devices, the wire protocol and the message transport.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Short human-readable error message.
pub type Message = heapless::String<128>;

/// Unified error type for all ramp experiment operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor or stepper driver error
    Motor(MotorError),
    /// Payload encoding or decoding error
    Protocol(ProtocolError),
    /// Elevator or landing zone error
    Device(DeviceError),
    /// Message transport error
    Transport(TransportError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(Message),
    /// Step width must be > 0
    InvalidStepWidth(f64),
    /// Pulses per second must be > 0
    InvalidPulsesPerSecond(f64),
    /// Lower travel limit above upper travel limit
    InvalidLimits {
        /// Lower limit (position units)
        lower: f64,
        /// Upper limit (position units)
        upper: f64,
    },
    /// Adjacent side length must be > 0
    InvalidAdjacent(f64),
    /// Angular chunk size must be > 0
    InvalidStepSize(f64),
    /// Quality of service must be 0, 1 or 2
    InvalidQos(u8),
    /// Duty cycle must be within 0-100 percent
    InvalidDutyCycle(f64),
    /// PWM frequency must be > 0
    InvalidFrequency(f64),
    /// Sensor timeout must be > 0
    InvalidTimeout(f64),
    /// Cooldown period must be >= 0
    InvalidCooldown(f64),
    /// Topic name is empty
    EmptyTopic(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(Message),
}

/// Hardware line of the stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Active-low enable line
    Enable,
    /// Active-low sleep line
    Sleep,
    /// Step pulse line
    Step,
    /// Direction line
    Direction,
}

/// Motor operation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// Requested step count lies outside the travel limits
    OutOfRange {
        /// Requested absolute step count
        target: i64,
        /// Lower step limit
        lower: i64,
        /// Upper step limit
        upper: i64,
    },
    /// Chunk size for an incremental move must be > 0
    InvalidChunk(i64),
    /// Writing a driver line failed
    Line(Line),
}

/// Payload encoding errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Payload has the wrong size
    InvalidLength {
        /// Expected payload size in bytes
        expected: usize,
        /// Received payload size in bytes
        actual: usize,
    },
    /// Status byte does not name a known status
    UnknownStatus(u8),
}

/// Actuator and sensor errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Elevator actuator failed
    Actuator(Message),
    /// Landing zone sensor failed
    Sensor(Message),
    /// Acquiring a GPIO line or PWM channel failed
    Gpio(Message),
}

/// Message transport errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connecting or subscribing failed
    Setup(Message),
    /// Publishing a message failed
    Publish(Message),
    /// The broker did not acknowledge a publish in time
    ConfirmTimeout,
    /// The transport is not connected
    Disconnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Device(e) => write!(f, "Device error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepWidth(v) => write!(f, "Invalid step width: {}. Must be > 0", v),
            ConfigError::InvalidPulsesPerSecond(v) => {
                write!(f, "Invalid pulses per second: {}. Must be > 0", v)
            }
            ConfigError::InvalidLimits { lower, upper } => {
                write!(f, "Invalid travel limits: lower ({}) must be <= upper ({})", lower, upper)
            }
            ConfigError::InvalidAdjacent(v) => write!(f, "Invalid adjacent length: {}. Must be > 0", v),
            ConfigError::InvalidStepSize(v) => {
                write!(f, "Invalid angular step size: {} degrees. Must be below 90 and move at least one step", v)
            }
            ConfigError::InvalidQos(v) => write!(f, "Invalid QoS: {}. Must be 0, 1 or 2", v),
            ConfigError::InvalidDutyCycle(v) => write!(f, "Invalid duty cycle: {}. Must be 0-100", v),
            ConfigError::InvalidFrequency(v) => write!(f, "Invalid PWM frequency: {}. Must be > 0", v),
            ConfigError::InvalidTimeout(v) => write!(f, "Invalid sensor timeout: {}. Must be > 0", v),
            ConfigError::InvalidCooldown(v) => write!(f, "Invalid cooldown: {}. Must be >= 0", v),
            ConfigError::EmptyTopic(role) => write!(f, "Topic '{}' must not be empty", role),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Line::Enable => "enable",
            Line::Sleep => "sleep",
            Line::Step => "step",
            Line::Direction => "direction",
        };
        f.write_str(name)
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::OutOfRange { target, lower, upper } => write!(
                f,
                "step count {} exceeds limits of {} (lower) and {} (upper)",
                target, lower, upper
            ),
            MotorError::InvalidChunk(v) => write!(f, "Invalid chunk size: {}. Must be > 0", v),
            MotorError::Line(line) => write!(f, "GPIO {} line operation failed", line),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidLength { expected, actual } => {
                write!(f, "Expected {} byte payload, got {}", expected, actual)
            }
            ProtocolError::UnknownStatus(v) => write!(f, "Unknown status value {}", v),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Actuator(msg) => write!(f, "Elevator failed: {}", msg),
            DeviceError::Sensor(msg) => write!(f, "Landing zone failed: {}", msg),
            DeviceError::Gpio(msg) => write!(f, "GPIO setup failed: {}", msg),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Setup(msg) => write!(f, "Setup failed: {}", msg),
            TransportError::Publish(msg) => write!(f, "Publish failed: {}", msg),
            TransportError::ConfirmTimeout => write!(f, "Publish was not acknowledged in time"),
            TransportError::Disconnected => write!(f, "Transport is not connected"),
        }
    }
}

/// Build a [`Message`] from arbitrary text, truncating at capacity.
pub(crate) fn message(text: &str) -> Message {
    let mut msg = Message::new();
    for c in text.chars() {
        if msg.push(c).is_err() {
            break;
        }
    }
    msg
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

#[cfg(feature = "std")]
impl std::error::Error for DeviceError {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}
