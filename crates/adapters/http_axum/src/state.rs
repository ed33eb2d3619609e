//! Shared application state for axum handlers.

use std::sync::Arc;

use halux_app::dispatcher::Dispatcher;
use halux_app::ports::PublisherGateway;

/// Application state shared across all axum handlers.
///
/// Generic over the gateway type to avoid dynamic dispatch. `Clone` is
/// implemented manually so the gateway itself does not need to be `Clone`.
pub struct AppState<G> {
    /// Dispatcher owning the message log and the gateway.
    pub dispatcher: Arc<Dispatcher<G>>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<G> AppState<G>
where
    G: PublisherGateway + Send + Sync + 'static,
{
    pub fn new(dispatcher: Dispatcher<G>) -> Self {
        Self::from_arc(Arc::new(dispatcher))
    }

    /// Create the state from a dispatcher already shared with the inbound
    /// loop.
    pub fn from_arc(dispatcher: Arc<Dispatcher<G>>) -> Self {
        Self { dispatcher }
    }
}
