//! Message payload encoding.
//!
//! | Topic          | Payload                                  |
//! |----------------|------------------------------------------|
//! | status         | 1 byte, unsigned status value            |
//! | last_timestamp | 8 bytes, big-endian f64, unix seconds    |
//! | current_angle  | 8 bytes, big-endian f64, radians         |
//! | target_angle   | 8 bytes, big-endian f64, radians         |

use crate::error::{ConfigError, ProtocolError, Result};

/// Size of an angle or timestamp payload.
pub const FLOAT_PAYLOAD_LEN: usize = 8;

/// Size of a status payload.
pub const STATUS_PAYLOAD_LEN: usize = 1;

/// Life-cycle state of the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// Ready to process targets.
    Ready = 0,
    /// Processing a target.
    Busy = 1,
    /// The landing zone timeout expired.
    Error = 2,
    /// Server offline or crashed.
    Offline = 3,
}

impl Status {
    /// Get the wire value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire value.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Status::Ready),
            1 => Ok(Status::Busy),
            2 => Ok(Status::Error),
            3 => Ok(Status::Offline),
            other => Err(ProtocolError::UnknownStatus(other).into()),
        }
    }

    /// Encode as a status payload.
    #[inline]
    pub fn to_bytes(self) -> [u8; STATUS_PAYLOAD_LEN] {
        [self.as_u8()]
    }

    /// Decode a status payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        match payload {
            [value] => Self::from_u8(*value),
            _ => Err(ProtocolError::InvalidLength {
                expected: STATUS_PAYLOAD_LEN,
                actual: payload.len(),
            }
            .into()),
        }
    }
}

/// Delivery guarantee for publish and subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce,
    /// Acknowledged delivery, may duplicate.
    AtLeastOnce,
    /// Assured single delivery.
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = crate::error::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other).into()),
        }
    }
}

/// Encode an angle in radians.
#[inline]
pub fn encode_angle(radians: f64) -> [u8; FLOAT_PAYLOAD_LEN] {
    radians.to_be_bytes()
}

/// Decode an angle in radians.
pub fn decode_angle(payload: &[u8]) -> Result<f64> {
    decode_f64(payload)
}

/// Encode a unix timestamp in seconds.
#[inline]
pub fn encode_timestamp(seconds: f64) -> [u8; FLOAT_PAYLOAD_LEN] {
    seconds.to_be_bytes()
}

/// Decode a unix timestamp in seconds.
pub fn decode_timestamp(payload: &[u8]) -> Result<f64> {
    decode_f64(payload)
}

fn decode_f64(payload: &[u8]) -> Result<f64> {
    let bytes: [u8; FLOAT_PAYLOAD_LEN] = payload.try_into().map_err(|_| {
        ProtocolError::InvalidLength {
            expected: FLOAT_PAYLOAD_LEN,
            actual: payload.len(),
        }
    })?;
    Ok(f64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(Status::Ready.to_bytes(), [0]);
        assert_eq!(Status::Busy.to_bytes(), [1]);
        assert_eq!(Status::Error.to_bytes(), [2]);
        assert_eq!(Status::Offline.to_bytes(), [3]);
        assert_eq!(Status::from_bytes(&[3]), Ok(Status::Offline));
    }

    #[test]
    fn test_status_rejects_garbage() {
        assert_eq!(
            Status::from_bytes(&[4]),
            Err(Error::Protocol(ProtocolError::UnknownStatus(4)))
        );
        assert_eq!(
            Status::from_bytes(&[]),
            Err(Error::Protocol(ProtocolError::InvalidLength { expected: 1, actual: 0 }))
        );
    }

    #[test]
    fn test_angle_is_big_endian() {
        // 1.0 as IEEE-754 double
        assert_eq!(encode_angle(1.0), [0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_angle(&[0x3f, 0xf0, 0, 0, 0, 0, 0, 0]), Ok(1.0));
    }

    #[test]
    fn test_angle_wrong_length() {
        assert!(matches!(
            decode_angle(&[0u8; 4]),
            Err(Error::Protocol(ProtocolError::InvalidLength { expected: 8, actual: 4 }))
        ));
    }

    #[test]
    fn test_qos_from_u8() {
        assert_eq!(QoS::try_from(2), Ok(QoS::ExactlyOnce));
        assert!(QoS::try_from(3).is_err());
    }
}
