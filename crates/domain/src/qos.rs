//! Delivery guarantee levels requested from the broker.

use serde::{Deserialize, Serialize};

/// Broker quality-of-service level, serialized as its numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QualityOfService {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// A numeric QoS outside `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid QoS level {0}, expected 0, 1 or 2")]
pub struct InvalidQosError(pub u8);

impl TryFrom<u8> for QualityOfService {
    type Error = InvalidQosError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(InvalidQosError(other)),
        }
    }
}

impl From<QualityOfService> for u8 {
    fn from(qos: QualityOfService) -> Self {
        match qos {
            QualityOfService::AtMostOnce => 0,
            QualityOfService::AtLeastOnce => 1,
            QualityOfService::ExactlyOnce => 2,
        }
    }
}
