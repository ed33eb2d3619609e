//! Stock operation handlers.

use std::sync::Arc;

use halux_domain::error::HandlerError;
use halux_domain::topic::{Domain, Operation};

use crate::ports::DeviceCatalog;
use crate::registry::{OperationRegistry, Outbox, Request};

/// Body of a plain acknowledgment.
pub const RESPONSE_OK: &str = r#"{"status": "OK"}"#;

/// Reply [`RESPONSE_OK`] on the request's response topic.
///
/// # Errors
///
/// Never fails; the signature matches the handler table.
pub fn acknowledge(request: &Request<'_>, outbox: &mut Outbox) -> Result<(), HandlerError> {
    outbox.reply(request, RESPONSE_OK);
    Ok(())
}

/// Build a handler that answers with the catalog record of the addressed
/// device, or a `NOT_FOUND` status when the catalog does not know it.
pub fn device_lookup<C>(
    catalog: C,
) -> impl Fn(&Request<'_>, &mut Outbox) -> Result<(), HandlerError> + Send + Sync + 'static
where
    C: DeviceCatalog + 'static,
{
    move |request: &Request<'_>, outbox: &mut Outbox| {
        let body = match catalog.find(request.device_id()) {
            Some(device) => serde_json::json!({
                "status": "OK",
                "device_id": device.id,
                "name": device.name,
                "sensors": device.sensors,
                "actuators": device.actuators,
            }),
            None => serde_json::json!({
                "status": "NOT_FOUND",
                "device_id": request.device_id(),
            }),
        };
        outbox.reply(request, body.to_string());
        Ok(())
    }
}

/// Bind the stock handlers:
///
/// - `W` on every known domain except `DEVICE` → [`acknowledge`]
/// - `DEVICE/R` → [`device_lookup`]
pub fn register_defaults<C>(registry: &OperationRegistry, catalog: Arc<C>)
where
    C: DeviceCatalog + ?Sized + 'static,
{
    for domain in Domain::KNOWN {
        if domain != Domain::DEVICE {
            registry.register(domain, Operation::Write, acknowledge);
        }
    }
    registry.register(Domain::DEVICE, Operation::Read, device_lookup(catalog));
}
