//! Messages and the audit records kept for them.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topic::{Address, Domain, Operation, Route, Subtopic};

/// UTC timestamp attached to audit records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Which way a message travelled across the bus boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One unit of bus traffic. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    address: Address,
    payload: Vec<u8>,
    direction: Direction,
}

impl Message {
    /// A message received from the bus.
    #[must_use]
    pub fn inbound(address: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            payload: payload.into(),
            direction: Direction::Inbound,
        }
    }

    /// A message about to be sent on the bus.
    #[must_use]
    pub fn outbound(address: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            payload: payload.into(),
            direction: Direction::Outbound,
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Immutable audit record of one observed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// 1-based, strictly increasing in append order.
    pub sequence_id: u64,
    pub timestamp: Timestamp,
    pub address: Address,
    pub payload: String,
}

impl LogEntry {
    #[must_use]
    pub fn domain(&self) -> &Domain {
        self.address.domain()
    }

    #[must_use]
    pub fn subtopic(&self) -> Subtopic {
        self.address.subtopic()
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        self.address.device_id()
    }

    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        self.address.operation()
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.address.route()
    }
}

/// Category of a failure observed while handling bus traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The topic could not be decoded; the message was not logged.
    Rejected,
    /// A request had no handler bound to it.
    Unroutable,
    /// The bound handler failed or panicked.
    HandlerFailed,
    /// An outbound message could not be delivered to the gateway.
    PublishFailed,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Unroutable => "unroutable",
            Self::HandlerFailed => "handler_failed",
            Self::PublishFailed => "publish_failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-channel record of a failure, kept next to the log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based, independent of [`LogEntry::sequence_id`].
    pub sequence_id: u64,
    pub timestamp: Timestamp,
    pub kind: DiagnosticKind,
    /// Raw topic the failure relates to.
    pub topic: String,
    pub detail: String,
}
