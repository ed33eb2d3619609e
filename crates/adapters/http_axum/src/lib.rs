//! # halux-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Export the message log and the diagnostic stream as JSON
//!   (`/api/logs`, `/api/diagnostics`)
//! - Accept manual publishes (`POST /api/publish`) and hand them to the
//!   dispatcher (driving adapter)
//! - Map dispatcher errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `halux-app` (for the dispatcher and port traits) and
//! `halux-domain` (for types used in request/response mapping). Never leaks
//! axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
