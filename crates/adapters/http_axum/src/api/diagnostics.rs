//! JSON export of the diagnostic stream.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use halux_app::ports::PublisherGateway;
use halux_domain::message::Diagnostic;

use crate::state::AppState;

pub enum ListResponse {
    Ok(Json<Vec<Diagnostic>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/diagnostics`: oldest first.
pub async fn list<G>(State(state): State<AppState<G>>) -> ListResponse
where
    G: PublisherGateway + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.dispatcher.log().diagnostics()))
}
