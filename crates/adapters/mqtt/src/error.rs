//! MQTT adapter error types.

use halux_domain::error::HaluxError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected the request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The dispatcher dropped its end of the inbound channel.
    #[error("inbound channel closed")]
    ChannelClosed,

    /// A domain-level error.
    #[error("domain error")]
    Domain(#[source] HaluxError),
}

impl MqttError {
    /// Convert into a [`HaluxError::Gateway`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HaluxError {
        match self {
            Self::Domain(err) => err,
            other => HaluxError::Gateway(Box::new(other)),
        }
    }
}

impl From<MqttError> for HaluxError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_display_channel_closed_error() {
        assert_eq!(MqttError::ChannelClosed.to_string(), "inbound channel closed");
    }

    #[test]
    fn should_convert_channel_closed_to_gateway_error() {
        let err: HaluxError = MqttError::ChannelClosed.into();
        assert!(matches!(err, HaluxError::Gateway(_)));
    }

    #[test]
    fn should_convert_domain_error_back_to_domain() {
        let mqtt_err = MqttError::Domain(HaluxError::Timeout(Duration::from_secs(5)));
        let back: HaluxError = mqtt_err.into();
        assert!(matches!(back, HaluxError::Timeout(_)));
    }
}
