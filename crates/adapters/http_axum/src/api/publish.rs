//! Manual publish endpoint.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use halux_app::ports::PublisherGateway;
use halux_domain::error::HaluxError;
use halux_domain::topic::Address;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a manual publish.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Encoded topic, e.g. `FREQUENCY/RES/dev42`.
    pub topic: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PublishedView {
    pub topic: String,
    pub bytes: usize,
}

/// Possible responses from the publish endpoint.
pub enum PublishResponse {
    Ok(Json<PublishedView>),
}

impl IntoResponse for PublishResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/publish`
pub async fn publish<G>(
    State(state): State<AppState<G>>,
    Json(req): Json<PublishRequest>,
) -> Result<PublishResponse, ApiError>
where
    G: PublisherGateway + Send + Sync + 'static,
{
    let address: Address = req.topic.parse().map_err(HaluxError::from)?;
    let delivery = state
        .dispatcher
        .publish(
            address.domain().clone(),
            address.device_id(),
            address.route(),
            req.message,
        )
        .await?;
    Ok(PublishResponse::Ok(Json(PublishedView {
        topic: delivery.topic,
        bytes: delivery.bytes,
    })))
}
