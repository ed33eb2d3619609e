//! # halux-domain
//!
//! Pure domain model for the halux device-messaging core.
//!
//! ## Responsibilities
//! - Define the **topic address** (`domain/subtopic/device[/operation]`) and
//!   its codec: decoding via [`FromStr`](std::str::FromStr), encoding via
//!   [`Display`](std::fmt::Display)
//! - Define **messages** (one unit of bus traffic) and the immutable audit
//!   records kept for them (**log entries** and **diagnostics**)
//! - Define the **device** record looked up by handlers
//! - Define the error taxonomy shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod device;
pub mod error;
pub mod message;
pub mod qos;
pub mod topic;
