//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use halux_domain::error::HaluxError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HaluxError`] to an HTTP response with appropriate status code.
pub struct ApiError(HaluxError);

impl From<HaluxError> for ApiError {
    fn from(err: HaluxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HaluxError::Decode(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HaluxError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            HaluxError::Handler(err) => {
                tracing::error!(error = %err, "handler error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            HaluxError::Gateway(err) => {
                tracing::error!(error = %err, "gateway error");
                (StatusCode::BAD_GATEWAY, "gateway error".to_string())
            }
            err @ HaluxError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
