//! # halux-adapter-mqtt
//!
//! MQTT adapter: connects the device-messaging core to a broker.
//!
//! ## How it works
//!
//! [`MqttGateway`] wraps a rumqttc [`AsyncClient`] and implements the
//! `PublisherGateway` port. Its companion [`MqttEventLoop`] drives the
//! connection, replays subscriptions after a reconnect and forwards every
//! incoming publish to the dispatcher over an `mpsc` channel.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `halux-app` and `halux-domain`.

mod config;
mod error;
mod event_loop;

pub use config::MqttConfig;
pub use error::MqttError;
pub use event_loop::MqttEventLoop;

use std::sync::Arc;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, QoS};
use tokio::sync::mpsc;

use halux_app::ports::{Delivery, InboundMessage, PublisherGateway};
use halux_domain::error::HaluxError;
use halux_domain::qos::QualityOfService;

/// Map the domain delivery guarantee onto the rumqttc one.
#[must_use]
pub fn to_mqtt_qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Subscriptions made through the gateway, replayed on every reconnect.
pub(crate) type Subscriptions = Arc<Mutex<Vec<(String, QoS)>>>;

/// Broker-backed [`PublisherGateway`].
pub struct MqttGateway {
    client: AsyncClient,
    qos: QoS,
    subscriptions: Subscriptions,
}

impl MqttGateway {
    /// Create the client and its event loop. Nothing touches the network
    /// until the event loop is started.
    #[must_use]
    pub fn new(
        config: &MqttConfig,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> (Self, MqttEventLoop) {
        let (client, event_loop) = AsyncClient::new(config.options(), config.channel_capacity);
        let subscriptions = Subscriptions::default();
        let gateway = Self {
            client: client.clone(),
            qos: to_mqtt_qos(config.qos),
            subscriptions: Arc::clone(&subscriptions),
        };
        let event_loop = MqttEventLoop::new(
            event_loop,
            client,
            subscriptions,
            inbound,
            config.reconnect_delay(),
        );
        (gateway, event_loop)
    }

    /// Send a DISCONNECT to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] when the request queue is closed.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await.map_err(MqttError::Client)
    }
}

impl PublisherGateway for MqttGateway {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, HaluxError> {
        let bytes = payload.len();
        // The event loop that drains this queue may itself be waiting on the
        // dispatcher, so never park here.
        self.client
            .try_publish(topic, self.qos, false, payload)
            .map_err(MqttError::Client)?;
        tracing::debug!(topic, bytes, "MQTT publish queued");
        Ok(Delivery {
            topic: topic.to_string(),
            bytes,
        })
    }

    async fn subscribe(&self, filter: &str, qos: QualityOfService) -> Result<(), HaluxError> {
        let qos = to_mqtt_qos(qos);
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(MqttError::Client)?;
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.iter().any(|(known, _)| known == filter) {
            subscriptions.push((filter.to_string(), qos));
        }
        tracing::info!(filter, ?qos, "MQTT subscription requested");
        Ok(())
    }
}
