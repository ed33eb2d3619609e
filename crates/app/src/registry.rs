//! Operation registry: the `(domain, operation)` → handler table.
//!
//! Adding a controllable device attribute means registering one more handler;
//! the codec and the dispatcher stay untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use halux_domain::error::{HandlerError, NotFoundError};
use halux_domain::message::Message;
use halux_domain::topic::{Address, Domain, Operation};

/// A handler bound to a `(domain, operation)` pair.
///
/// Handlers run synchronously on the dispatcher's task and never perform IO
/// themselves: whatever they want sent goes into the [`Outbox`].
pub type Handler =
    Arc<dyn Fn(&Request<'_>, &mut Outbox) -> Result<(), HandlerError> + Send + Sync>;

/// View of the inbound request handed to a handler.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    message: &'a Message,
}

impl<'a> Request<'a> {
    #[must_use]
    pub fn new(message: &'a Message) -> Self {
        Self { message }
    }

    #[must_use]
    pub fn address(&self) -> &'a Address {
        self.message.address()
    }

    #[must_use]
    pub fn device_id(&self) -> &'a str {
        self.message.address().device_id()
    }

    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        self.message.payload()
    }

    /// Payload as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn payload_text(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.message.payload())
    }
}

/// Outbound messages queued by a handler, published once it returns `Ok`.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Message>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message to an arbitrary address.
    pub fn push(&mut self, address: Address, payload: impl Into<Vec<u8>>) {
        self.messages.push(Message::outbound(address, payload));
    }

    /// Queue a response on the request's domain and device.
    pub fn reply(&mut self, request: &Request<'_>, payload: impl Into<Vec<u8>>) {
        self.push(request.address().reply(), payload);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Read-mostly handler table.
///
/// Last registration for a key wins. Lookups take a shared lock so that
/// concurrent resolves do not serialize against each other.
#[derive(Default)]
pub struct OperationRegistry {
    bindings: RwLock<HashMap<(Domain, Operation), Handler>>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `(domain, operation)`, replacing any previous binding.
    pub fn register<F>(&self, domain: Domain, operation: Operation, handler: F)
    where
        F: Fn(&Request<'_>, &mut Outbox) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let replaced = self
            .bindings
            .write()
            .insert((domain.clone(), operation), Arc::new(handler))
            .is_some();
        if replaced {
            tracing::debug!(%domain, %operation, "handler binding replaced");
        }
    }

    /// Look up the handler bound to `(domain, operation)`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when nothing is bound to the pair.
    pub fn resolve(&self, domain: &Domain, operation: Operation) -> Result<Handler, NotFoundError> {
        self.bindings
            .read()
            .get(&(domain.clone(), operation))
            .cloned()
            .ok_or_else(|| NotFoundError {
                domain: domain.clone(),
                operation,
            })
    }

    /// Every bound pair, sorted by domain then operation.
    #[must_use]
    pub fn bindings(&self) -> Vec<(Domain, Operation)> {
        let mut keys: Vec<_> = self.bindings.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("bindings", &self.bindings())
            .finish()
    }
}
