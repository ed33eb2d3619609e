//! # halux-app
//!
//! Application layer: the device-messaging core and its **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `PublisherGateway`: send to / subscribe on the external bus
//!   - `DeviceCatalog`: look up devices by id (consumed by handlers)
//! - Provide the core:
//!   - `OperationRegistry`: `(domain, operation)` → handler table
//!   - `MessageLog`: append-only audit of inbound traffic and diagnostics
//!   - `Dispatcher`: decode, log, route, publish
//! - Provide the stock handlers, an in-memory device catalog and a loopback
//!   gateway for running without a broker
//!
//! ## Dependency rule
//! Depends on `halux-domain` only (plus `tokio::sync`/`tokio::time` for the
//! inbound channel and publish timeouts). Never imports adapter crates.
//! Adapters depend on *this* crate, not the reverse.

pub mod catalog;
pub mod dispatcher;
pub mod handlers;
pub mod loopback;
pub mod message_log;
pub mod ports;
pub mod registry;
