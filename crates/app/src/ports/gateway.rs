//! Publisher gateway port: the send/subscribe boundary to the external bus.

use std::future::Future;

use halux_domain::error::HaluxError;
use halux_domain::qos::QualityOfService;

/// Acknowledgment returned by a successful [`PublisherGateway::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Encoded topic the payload was handed over on.
    pub topic: String,
    /// Payload size in bytes.
    pub bytes: usize,
}

/// A raw message delivered by the bus, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Sends messages to, and registers interest on, the external bus.
///
/// Inbound traffic does not flow through this trait: adapters hand it to the
/// dispatcher over a channel of [`InboundMessage`].
pub trait PublisherGateway {
    /// Hand a payload to the bus on an already-encoded topic.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<Delivery, HaluxError>> + Send;

    /// Subscribe to a topic filter (wildcards allowed) at the given QoS.
    fn subscribe(
        &self,
        filter: &str,
        qos: QualityOfService,
    ) -> impl Future<Output = Result<(), HaluxError>> + Send;
}

impl<T: PublisherGateway + Send + Sync> PublisherGateway for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<Delivery, HaluxError>> + Send {
        (**self).publish(topic, payload)
    }

    fn subscribe(
        &self,
        filter: &str,
        qos: QualityOfService,
    ) -> impl Future<Output = Result<(), HaluxError>> + Send {
        (**self).subscribe(filter, qos)
    }
}
