//! Dispatcher: routes inbound bus traffic and publishes handler output.
//!
//! Every inbound wire event ends in exactly one [`Outcome`]:
//!
//! ```text
//! received ─┬─ decode error ───────────────────────────────► Rejected
//!           └─ decoded ─► logged ─┬─ response ─────────────► Terminal
//!                                 └─ request ─┬─ unbound ──► Unroutable
//!                                             └─ invoked ─┬► Dispatched
//!                                                         └► HandlerFailed
//! ```
//!
//! No failure is fatal: each one is recorded on the message log's diagnostic
//! stream and the dispatcher carries on with the next message.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use halux_domain::error::{DecodeError, HaluxError, HandlerError};
use halux_domain::message::{DiagnosticKind, Message};
use halux_domain::topic::{Address, Domain, Route};

use crate::message_log::MessageLog;
use crate::ports::{Delivery, InboundMessage, PublisherGateway};
use crate::registry::{OperationRegistry, Outbox, Request};

/// Default upper bound on a single gateway publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal state of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The topic did not decode; nothing was logged.
    Rejected(DecodeError),
    /// A response, recorded for audit only.
    Terminal { sequence_id: u64 },
    /// A request with no handler bound to it.
    Unroutable { sequence_id: u64 },
    /// The handler ran; `published` of its queued messages reached the
    /// gateway and `failed` did not.
    Dispatched {
        sequence_id: u64,
        published: usize,
        failed: usize,
    },
    /// The handler returned an error or panicked; its queued messages were
    /// dropped.
    HandlerFailed { sequence_id: u64 },
}

/// Decodes, logs and routes bus traffic.
///
/// All entry points take `&self`; share the dispatcher behind an [`Arc`] to
/// call them from several tasks.
pub struct Dispatcher<G> {
    registry: Arc<OperationRegistry>,
    log: Arc<MessageLog>,
    gateway: G,
    publish_timeout: Duration,
}

impl<G: PublisherGateway> Dispatcher<G> {
    /// Create a dispatcher over an existing registry and log.
    pub fn new(registry: Arc<OperationRegistry>, log: Arc<MessageLog>, gateway: G) -> Self {
        Self {
            registry,
            log,
            gateway,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Bound every gateway publish by `timeout`.
    #[must_use]
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn log(&self) -> &Arc<MessageLog> {
        &self.log
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Handle one inbound message.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> Outcome {
        let address: Address = match topic.parse() {
            Ok(address) => address,
            Err(err) => {
                tracing::warn!(error = %err, "dropping message with undecodable topic");
                self.log
                    .record_diagnostic(DiagnosticKind::Rejected, topic, err.to_string());
                return Outcome::Rejected(err);
            }
        };

        if !address.domain().is_known() {
            tracing::debug!(domain = %address.domain(), "message on unrecognized domain");
        }

        let message = Message::inbound(address, payload);
        let sequence_id = self.log.append(&message).sequence_id;

        let operation = match message.address().route() {
            Route::Response => {
                tracing::debug!(sequence_id, "response recorded");
                return Outcome::Terminal { sequence_id };
            }
            Route::Request(operation) => operation,
        };

        let handler = match self.registry.resolve(message.address().domain(), operation) {
            Ok(handler) => handler,
            Err(err) => {
                tracing::info!(sequence_id, error = %err, "request left unrouted");
                self.log
                    .record_diagnostic(DiagnosticKind::Unroutable, topic, err.to_string());
                return Outcome::Unroutable { sequence_id };
            }
        };

        let mut outbox = Outbox::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            handler(&Request::new(&message), &mut outbox)
        }))
        .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

        if let Err(err) = result {
            let detail = describe(&HaluxError::from(err));
            tracing::error!(sequence_id, error = %detail, "handler failed");
            self.log
                .record_diagnostic(DiagnosticKind::HandlerFailed, topic, detail);
            return Outcome::HandlerFailed { sequence_id };
        }

        let mut published = 0;
        let mut failed = 0;
        for outbound in outbox.into_messages() {
            match self.publish_message(&outbound).await {
                Ok(_) => published += 1,
                Err(err) => {
                    failed += 1;
                    self.log.record_diagnostic(
                        DiagnosticKind::PublishFailed,
                        outbound.address().to_string(),
                        describe(&err),
                    );
                }
            }
        }

        tracing::debug!(sequence_id, published, failed, "request dispatched");
        Outcome::Dispatched {
            sequence_id,
            published,
            failed,
        }
    }

    /// Publish `payload` to `device_id` under `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`HaluxError::Decode`] when the address is not encodable,
    /// [`HaluxError::Gateway`] when the gateway fails, and
    /// [`HaluxError::Timeout`] when it does not answer in time. Nothing is
    /// retried.
    pub async fn publish(
        &self,
        domain: Domain,
        device_id: &str,
        route: Route,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Delivery, HaluxError> {
        let address = Address::new(domain, device_id, route)?;
        self.publish_message(&Message::outbound(address, payload))
            .await
    }

    /// Publish a pre-built outbound message.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::publish`], minus the decode error.
    pub async fn publish_message(&self, message: &Message) -> Result<Delivery, HaluxError> {
        let topic = message.address().to_string();
        let send = self.gateway.publish(&topic, message.payload().to_vec());
        match tokio::time::timeout(self.publish_timeout, send).await {
            Ok(Ok(delivery)) => {
                tracing::debug!(
                    topic = %delivery.topic,
                    bytes = delivery.bytes,
                    "message published"
                );
                Ok(delivery)
            }
            Ok(Err(err)) => {
                tracing::warn!(%topic, error = %err, "publish failed");
                Err(err)
            }
            Err(_) => {
                tracing::warn!(%topic, timeout = ?self.publish_timeout, "publish timed out");
                Err(HaluxError::Timeout(self.publish_timeout))
            }
        }
    }

    /// Drain `inbound` until every sender is dropped.
    ///
    /// Messages are handled one at a time, so traffic for a given device is
    /// processed in the order it was received.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        tracing::info!(bindings = self.registry.len(), "dispatcher started");
        while let Some(message) = inbound.recv().await {
            self.on_message(&message.topic, &message.payload).await;
        }
        tracing::info!(
            entries = self.log.last_sequence_id(),
            "inbound channel closed, dispatcher stopped"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Flatten an error and its source chain into one line.
fn describe(err: &HaluxError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    text
}
