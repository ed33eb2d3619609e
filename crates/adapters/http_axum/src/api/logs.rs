//! JSON export of the message log.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use halux_app::ports::PublisherGateway;
use halux_domain::message::LogEntry;
use halux_domain::topic::{Domain, Subtopic};

use crate::state::AppState;

/// Listing order of `GET /api/logs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Newest first.
    #[default]
    Recent,
    /// Oldest first.
    Chronological,
}

/// Query parameters of `GET /api/logs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub order: Order,
    pub limit: Option<usize>,
}

/// Flattened log entry as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct LogEntryView {
    pub sequence_id: u64,
    pub created_at: DateTime<Utc>,
    pub domain: Domain,
    pub subtopic: Subtopic,
    pub device_id: String,
    /// Operation token, or `RES` for responses.
    pub operation: &'static str,
    pub payload: String,
}

impl From<LogEntry> for LogEntryView {
    fn from(entry: LogEntry) -> Self {
        Self {
            sequence_id: entry.sequence_id,
            created_at: entry.timestamp,
            domain: entry.domain().clone(),
            subtopic: entry.subtopic(),
            device_id: entry.device_id().to_string(),
            operation: entry.route().as_str(),
            payload: entry.payload,
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<LogEntryView>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/logs?order=recent|chronological&limit=N`
pub async fn list<G>(
    State(state): State<AppState<G>>,
    Query(query): Query<LogsQuery>,
) -> ListResponse
where
    G: PublisherGateway + Send + Sync + 'static,
{
    let log = state.dispatcher.log();
    let entries = match (query.order, query.limit) {
        (Order::Recent, limit) => log.recent(limit.unwrap_or(usize::MAX)),
        (Order::Chronological, None) => log.query(),
        (Order::Chronological, Some(limit)) => log.query().into_iter().take(limit).collect(),
    };
    ListResponse::Ok(Json(entries.into_iter().map(LogEntryView::from).collect()))
}
