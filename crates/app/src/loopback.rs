//! In-process bus that feeds published messages straight back as inbound
//! traffic, for running without a broker.

use parking_lot::RwLock;
use tokio::sync::mpsc;

use halux_domain::error::HaluxError;
use halux_domain::qos::QualityOfService;
use halux_domain::topic::filter_matches;

use crate::ports::{Delivery, InboundMessage, PublisherGateway};

/// Loopback [`PublisherGateway`] backed by a tokio [`mpsc`] channel.
///
/// A publish is echoed to the inbound channel only when it matches one of the
/// subscribed filters; otherwise it is accepted and dropped, as a broker
/// without subscribers would.
pub struct LoopbackGateway {
    sender: mpsc::Sender<InboundMessage>,
    filters: RwLock<Vec<String>>,
}

impl LoopbackGateway {
    /// Create a loopback bus with the given channel capacity, returning the
    /// receiving end to hand to the dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let gateway = Self {
            sender,
            filters: RwLock::new(Vec::new()),
        };
        (gateway, receiver)
    }

    /// A sender for injecting device traffic directly, bypassing filters.
    #[must_use]
    pub fn inbound(&self) -> mpsc::Sender<InboundMessage> {
        self.sender.clone()
    }

    /// Queue `message` on the inbound channel without waiting for room.
    ///
    /// The dispatcher publishing through this gateway is usually the only
    /// consumer of that channel, so a full channel hands the message to a
    /// detached task instead of parking the caller.
    fn echo(&self, message: InboundMessage) -> Result<(), HaluxError> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::debug!(topic = %message.topic, "inbound channel full, deferring echo");
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if let Err(err) = sender.send(message).await {
                        tracing::warn!(
                            topic = %err.0.topic,
                            "loopback echo dropped, dispatcher gone"
                        );
                    }
                });
                Ok(())
            }
            Err(err @ mpsc::error::TrySendError::Closed(_)) => {
                Err(HaluxError::Gateway(Box::new(err)))
            }
        }
    }
}

impl PublisherGateway for LoopbackGateway {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, HaluxError> {
        let bytes = payload.len();
        let subscribed = self
            .filters
            .read()
            .iter()
            .any(|filter| filter_matches(filter, topic));
        if subscribed {
            self.echo(InboundMessage::new(topic, payload))?;
        }
        Ok(Delivery {
            topic: topic.to_string(),
            bytes,
        })
    }

    async fn subscribe(&self, filter: &str, _qos: QualityOfService) -> Result<(), HaluxError> {
        let mut filters = self.filters.write();
        if !filters.iter().any(|known| known == filter) {
            filters.push(filter.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use halux_domain::topic::{Domain, Operation};

    use super::*;
    use crate::dispatcher::{Dispatcher, Outcome};
    use crate::handlers::{RESPONSE_OK, acknowledge};
    use crate::message_log::MessageLog;
    use crate::registry::OperationRegistry;

    #[tokio::test]
    async fn should_echo_subscribed_topic() {
        let (bus, mut rx) = LoopbackGateway::new(4);
        bus.subscribe("TEMPERATURE/#", QualityOfService::AtLeastOnce)
            .await
            .unwrap();

        let delivery = bus
            .publish("TEMPERATURE/RES/t1", b"21".to_vec())
            .await
            .unwrap();

        assert_eq!(delivery.bytes, 2);
        let received = rx.recv().await.unwrap();
        assert_eq!(received, InboundMessage::new("TEMPERATURE/RES/t1", "21"));
    }

    #[tokio::test]
    async fn should_drop_unsubscribed_topic() {
        let (bus, mut rx) = LoopbackGateway::new(4);
        bus.subscribe("HUMIDITY/#", QualityOfService::AtMostOnce)
            .await
            .unwrap();

        let result = bus.publish("TEMPERATURE/RES/t1", b"21".to_vec()).await;

        assert!(result.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_fail_when_receiver_is_gone() {
        let (bus, rx) = LoopbackGateway::new(4);
        bus.subscribe("#", QualityOfService::AtLeastOnce)
            .await
            .unwrap();
        drop(rx);

        let result = bus.publish("DEVICE/RES/d1", Vec::new()).await;

        assert!(matches!(result, Err(HaluxError::Gateway(_))));
    }

    #[tokio::test]
    async fn should_not_block_when_inbound_channel_is_full() {
        let (bus, mut rx) = LoopbackGateway::new(1);
        bus.subscribe("FREQUENCY/#", QualityOfService::AtLeastOnce)
            .await
            .unwrap();
        bus.inbound()
            .send(InboundMessage::new("TEMPERATURE/RES/t1", "21"))
            .await
            .unwrap();

        let delivery = tokio::time::timeout(
            Duration::from_millis(50),
            bus.publish("FREQUENCY/RES/dev42", b"ok".to_vec()),
        )
        .await
        .expect("publish must not wait for the channel to drain")
        .unwrap();

        assert_eq!(delivery.topic, "FREQUENCY/RES/dev42");
        assert_eq!(rx.recv().await.unwrap().topic, "TEMPERATURE/RES/t1");
        assert_eq!(rx.recv().await.unwrap().topic, "FREQUENCY/RES/dev42");
    }

    #[tokio::test]
    async fn should_deliver_reply_while_dispatcher_has_backlog() {
        let (bus, mut rx) = LoopbackGateway::new(1);
        bus.subscribe("FREQUENCY/#", QualityOfService::AtLeastOnce)
            .await
            .unwrap();
        let injector = bus.inbound();
        injector
            .send(InboundMessage::new("FREQUENCY/RES/dev1", "queued"))
            .await
            .unwrap();

        let registry = Arc::new(OperationRegistry::new());
        registry.register(Domain::FREQUENCY, Operation::Write, acknowledge);
        let dispatcher = Dispatcher::new(registry, Arc::new(MessageLog::new()), bus)
            .with_publish_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let outcome = dispatcher
            .on_message("FREQUENCY/REQ/dev42/W", b"440")
            .await;

        assert_eq!(
            outcome,
            Outcome::Dispatched {
                sequence_id: 1,
                published: 1,
                failed: 0,
            }
        );
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(dispatcher.log().diagnostics().is_empty());
        assert_eq!(rx.recv().await.unwrap().payload, b"queued");
        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.topic, "FREQUENCY/RES/dev42");
        assert_eq!(reply.payload, RESPONSE_OK.as_bytes());
    }

    #[tokio::test]
    async fn should_inject_traffic_without_subscription() {
        let (bus, mut rx) = LoopbackGateway::new(4);
        bus.inbound()
            .send(InboundMessage::new("DEVICE/REQ/d1/R", ""))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().topic, "DEVICE/REQ/d1/R");
    }
}
