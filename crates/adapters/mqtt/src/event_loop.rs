//! MQTT event loop: keeps the broker connection alive and forwards every
//! incoming publish to the dispatcher.
//!
//! [`MqttEventLoop`] owns the rumqttc [`EventLoop`]. It is the only task that
//! drains the client request queue, so it never blocks on the client itself.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use halux_app::ports::InboundMessage;

use crate::error::MqttError;
use crate::Subscriptions;

/// Drives the broker connection and feeds incoming publishes to the
/// dispatcher.
///
/// Connection errors are logged and retried after the configured delay; the
/// loop only stops once the inbound channel has been closed.
pub struct MqttEventLoop {
    event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Subscriptions,
    inbound: mpsc::Sender<InboundMessage>,
    reconnect_delay: Duration,
    connected_once: bool,
}

impl MqttEventLoop {
    pub(crate) fn new(
        event_loop: EventLoop,
        client: AsyncClient,
        subscriptions: Subscriptions,
        inbound: mpsc::Sender<InboundMessage>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            event_loop,
            client,
            subscriptions,
            inbound,
            reconnect_delay,
            connected_once: false,
        }
    }

    /// Spawn the loop on the current runtime.
    #[must_use]
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll the connection until the inbound channel closes.
    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(event) => {
                    if let Err(err) = self.handle(event).await {
                        tracing::info!(%err, "MQTT event loop stopped");
                        return;
                    }
                }
                Err(err) => {
                    if self.inbound.is_closed() {
                        tracing::info!("inbound channel closed, MQTT event loop stopped");
                        return;
                    }
                    tracing::warn!(
                        %err,
                        delay_ms = self.reconnect_delay.as_millis(),
                        "MQTT connection error, retrying"
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    async fn handle(&mut self, event: Event) -> Result<(), MqttError> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                tracing::info!(code = ?ack.code, "MQTT connected");
                if self.connected_once {
                    self.resubscribe();
                }
                self.connected_once = true;
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let topic = publish.topic.clone();
                tracing::debug!(%topic, bytes = publish.payload.len(), "MQTT message received");
                self.inbound
                    .send(InboundMessage::new(topic, publish.payload.to_vec()))
                    .await
                    .map_err(|_| MqttError::ChannelClosed)?;
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::warn!("broker sent DISCONNECT");
            }
            _ => {}
        }
        Ok(())
    }

    /// Re-issue every recorded subscription after a reconnect.
    ///
    /// Uses the non-blocking client call: this runs on the task that drains
    /// the request queue.
    fn resubscribe(&self) {
        for (filter, qos) in self.subscriptions.lock().iter() {
            match self.client.try_subscribe(filter.as_str(), *qos) {
                Ok(()) => tracing::debug!(%filter, "MQTT subscription replayed"),
                Err(err) => tracing::warn!(%err, %filter, "failed to replay MQTT subscription"),
            }
        }
    }
}
