//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HaluxError`]
//! when crossing a port boundary.

use std::time::Duration;

use crate::topic::{Domain, Operation};

/// Top-level error for the device-messaging core.
#[derive(Debug, thiserror::Error)]
pub enum HaluxError {
    /// A topic string could not be decoded into an address.
    #[error("topic decode error")]
    Decode(#[from] DecodeError),

    /// No handler is bound for a request.
    #[error("handler not found")]
    NotFound(#[from] NotFoundError),

    /// A handler ran and reported a failure.
    #[error("handler execution failed")]
    Handler(#[from] HandlerError),

    /// The publisher gateway rejected or failed to deliver a message.
    #[error("gateway error")]
    Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The publisher gateway did not answer in time.
    #[error("gateway did not answer within {0:?}")]
    Timeout(Duration),
}

/// Reasons a topic string is rejected by the codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Too few segments, or an empty / reserved-character segment.
    #[error("malformed topic `{topic}`")]
    MalformedTopic { topic: String },

    /// The second segment is neither the request nor the response marker.
    #[error("unknown subtopic `{0}`")]
    UnknownSubtopic(String),

    /// A request topic ends right after the device id.
    #[error("request topic `{topic}` has no operation")]
    MissingOperation { topic: String },

    /// The operation segment is not a recognized operation token.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
}

impl DecodeError {
    pub(crate) fn malformed(topic: impl Into<String>) -> Self {
        Self::MalformedTopic {
            topic: topic.into(),
        }
    }
}

/// No handler is registered for a `(domain, operation)` pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no handler bound for {domain}/{operation}")]
pub struct NotFoundError {
    pub domain: Domain,
    pub operation: Operation,
}

/// Failure reported by (or caught around) an operation handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler refused the request (bad payload, unknown device, …).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The handler hit an underlying error.
    #[error("handler failed")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The handler panicked; the panic was contained at the dispatch boundary.
    #[error("handler panicked: {0}")]
    Panicked(String),
}
