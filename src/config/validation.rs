//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::limits::position_to_steps;
use super::{ExperimentConfig, MotorConfig, TopicConfig};

/// Validate an experiment configuration.
///
/// Checks:
/// - Motor geometry and speed are positive, limits are ordered
/// - Ramp geometry is positive and the angular step size is below 90
///   degrees and moves the motor by at least one step
/// - QoS is 0, 1 or 2 and no topic name is empty
/// - Elevator PWM settings are in range
/// - Sensor timeout is positive and cooldown is not negative
pub fn validate_config(config: &ExperimentConfig) -> Result<()> {
    validate_motor(&config.motor)?;

    if !(config.ramp.adjacent > 0.0) {
        return Err(Error::Config(ConfigError::InvalidAdjacent(config.ramp.adjacent)));
    }
    validate_step_size(config)?;

    if config.mqtt.qos > 2 {
        return Err(Error::Config(ConfigError::InvalidQos(config.mqtt.qos)));
    }
    validate_topics(&config.topics)?;

    let elevator = &config.elevator;
    if !(elevator.frequency > 0.0) {
        return Err(Error::Config(ConfigError::InvalidFrequency(elevator.frequency)));
    }
    if !(0.0..=100.0).contains(&elevator.duty_cycle) {
        return Err(Error::Config(ConfigError::InvalidDutyCycle(elevator.duty_cycle)));
    }

    let experiment = &config.experiment;
    if !(experiment.timeout_secs > 0.0) {
        return Err(Error::Config(ConfigError::InvalidTimeout(experiment.timeout_secs)));
    }
    if !(experiment.cooldown_secs >= 0.0) {
        return Err(Error::Config(ConfigError::InvalidCooldown(experiment.cooldown_secs)));
    }

    Ok(())
}

pub(crate) fn validate_motor(motor: &MotorConfig) -> Result<()> {
    if !(motor.step_width > 0.0) {
        return Err(Error::Config(ConfigError::InvalidStepWidth(motor.step_width)));
    }

    if !(motor.pps > 0.0) {
        return Err(Error::Config(ConfigError::InvalidPulsesPerSecond(motor.pps)));
    }

    if !(motor.limit_lower <= motor.limit_upper) {
        return Err(Error::Config(ConfigError::InvalidLimits {
            lower: motor.limit_lower,
            upper: motor.limit_upper,
        }));
    }

    Ok(())
}

fn validate_step_size(config: &ExperimentConfig) -> Result<()> {
    let degrees = config.ramp.step_size.value();
    if !(degrees > 0.0 && degrees < 90.0) {
        return Err(Error::Config(ConfigError::InvalidStepSize(degrees)));
    }

    // chunks are whole steps measured at the motor
    let travel = libm::tan(config.ramp.step_size.to_radians()) * config.ramp.adjacent;
    if position_to_steps(travel, config.motor.step_width) < 1 {
        return Err(Error::Config(ConfigError::InvalidStepSize(degrees)));
    }

    Ok(())
}

fn validate_topics(topics: &TopicConfig) -> Result<()> {
    let roles = [
        ("status", &topics.status),
        ("last_timestamp", &topics.last_timestamp),
        ("current_angle", &topics.current_angle),
        ("target_angle", &topics.target_angle),
    ];

    for (role, topic) in roles {
        if topic.is_empty() {
            return Err(Error::Config(ConfigError::EmptyTopic(role)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Level;

    fn motor() -> MotorConfig {
        MotorConfig {
            direction: Level::High,
            step_width: 0.025,
            pps: 1000.0,
            limit_lower: 0.0,
            limit_upper: 82.0,
            reset_on_shutdown: true,
        }
    }

    #[test]
    fn test_invalid_step_width() {
        let config = MotorConfig { step_width: 0.0, ..motor() };

        assert!(matches!(
            validate_motor(&config),
            Err(Error::Config(ConfigError::InvalidStepWidth(_)))
        ));
    }

    #[test]
    fn test_nan_pps_rejected() {
        let config = MotorConfig { pps: f64::NAN, ..motor() };

        assert!(matches!(
            validate_motor(&config),
            Err(Error::Config(ConfigError::InvalidPulsesPerSecond(_)))
        ));
    }

    #[test]
    fn test_equal_limits_allowed() {
        let config = MotorConfig { limit_upper: 0.0, ..motor() };

        assert!(validate_motor(&config).is_ok());
    }
}
