//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{message, ConfigError, Error, Result};

use super::ExperimentConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use ramp_experiment::load_config;
///
/// let config = load_config("ramp.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::Config(ConfigError::IoError(message(&e.to_string()))))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<ExperimentConfig> {
    let config: ExperimentConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(message(e.message()))))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Edge, Level};

    const CONFIG: &str = r#"
[mqtt]
host = "broker.local"
client_id = "ramp"
qos = 1

[topics]
status = "ramp/status"
last_timestamp = "ramp/timestamp"
current_angle = "ramp/angle/current"
target_angle = "ramp/angle/target"

[driver]
enable = 0
sleep = 1
step = 19
direction = 18

[motor]
direction = "low"
step_width = 0.025
pps = 1000
limit_lower = 0
limit_upper = 82

[ramp]
adjacent = 70.0
step_size_degrees = 1.0

[elevator]
channel = 0
frequency = 50.0
duty_cycle = 7.5

[landing_zone]
pin = 3

[experiment]
timeout_secs = 10.0
cooldown_secs = 2.0
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(CONFIG).unwrap();

        assert_eq!(config.mqtt.port, 1883);
        assert!(config.mqtt.clean_session);
        assert_eq!(config.mqtt.qos, 1);
        assert_eq!(config.motor.direction, Level::Low);
        assert!(config.motor.reset_on_shutdown);
        assert_eq!(config.ramp.offset.value(), 0.0);
        assert_eq!(config.landing_zone.edge, Edge::Rising);
        assert_eq!(config.logging.level.as_str(), "info");
    }

    #[test]
    fn test_parse_rejects_invalid_limits() {
        let broken = CONFIG.replace("limit_upper = 82", "limit_upper = -5");

        assert!(matches!(
            parse_config(&broken),
            Err(Error::Config(ConfigError::InvalidLimits { .. }))
        ));
    }

    #[test]
    fn test_parse_rejects_step_size_below_one_step() {
        // tan(0.01 deg) * 70 is about 0.012, half a step of 0.025
        let tiny = CONFIG.replace("step_size_degrees = 1.0", "step_size_degrees = 0.01");
        assert!(matches!(
            parse_config(&tiny),
            Err(Error::Config(ConfigError::InvalidStepSize(_)))
        ));

        // 0.03 deg is 0.037, which rounds to one step
        let smallest = CONFIG.replace("step_size_degrees = 1.0", "step_size_degrees = 0.03");
        assert!(parse_config(&smallest).is_ok());
    }

    #[test]
    fn test_parse_rejects_step_size_of_right_angle() {
        for degrees in ["90.0", "135.0", "-1.0", "0.0"] {
            let broken = CONFIG.replace(
                "step_size_degrees = 1.0",
                &format!("step_size_degrees = {}", degrees),
            );
            assert!(
                matches!(
                    parse_config(&broken),
                    Err(Error::Config(ConfigError::InvalidStepSize(_)))
                ),
                "{} degrees accepted",
                degrees
            );
        }
    }

    #[test]
    fn test_parse_reports_syntax_errors() {
        assert!(matches!(
            parse_config("[mqtt"),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/ramp.toml"),
            Err(Error::Config(ConfigError::IoError(_)))
        ));
    }
}
