//! JSON REST API handler modules.

pub mod diagnostics;
pub mod logs;
#[allow(clippy::missing_errors_doc)]
pub mod publish;

use axum::Router;
use axum::routing::{get, post};

use halux_app::ports::PublisherGateway;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<G>() -> Router<AppState<G>>
where
    G: PublisherGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/logs", get(logs::list::<G>))
        .route("/diagnostics", get(diagnostics::list::<G>))
        .route("/publish", post(publish::publish::<G>))
}
