//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use halux_app::ports::PublisherGateway;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api`. Includes a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<G>(state: AppState<G>) -> Router
where
    G: PublisherGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use halux_app::dispatcher::Dispatcher;
    use halux_app::message_log::MessageLog;
    use halux_app::ports::Delivery;
    use halux_app::registry::OperationRegistry;
    use halux_domain::error::HaluxError;
    use halux_domain::qos::QualityOfService;

    use super::*;

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Accept,
        Fail,
        Stall,
    }

    struct StubGateway {
        mode: Mode,
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl PublisherGateway for StubGateway {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, HaluxError> {
            match self.mode {
                Mode::Accept => {}
                Mode::Fail => return Err(HaluxError::Gateway("broker unreachable".into())),
                Mode::Stall => std::future::pending::<()>().await,
            }
            let bytes = payload.len();
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            Ok(Delivery {
                topic: topic.to_string(),
                bytes,
            })
        }

        async fn subscribe(
            &self,
            _filter: &str,
            _qos: QualityOfService,
        ) -> Result<(), HaluxError> {
            Ok(())
        }
    }

    fn test_state(mode: Mode) -> AppState<StubGateway> {
        let gateway = StubGateway {
            mode,
            published: Mutex::new(Vec::new()),
        };
        let dispatcher = Dispatcher::new(
            Arc::new(OperationRegistry::new()),
            Arc::new(MessageLog::new()),
            gateway,
        )
        .with_publish_timeout(Duration::from_millis(50));
        AppState::new(dispatcher)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    async fn post_publish(
        app: Router,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/publish")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = build(test_state(Mode::Accept));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_list_logs_newest_first_by_default() {
        let state = test_state(Mode::Accept);
        state
            .dispatcher
            .on_message("TEMPERATURE/RES/t1", b"21.5")
            .await;
        state
            .dispatcher
            .on_message("HUMIDITY/RES/h1", b"40")
            .await;

        let (status, body) = get_json(build(state), "/api/logs").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["sequence_id"], 2);
        assert_eq!(body[0]["domain"], "HUMIDITY");
        assert_eq!(body[0]["subtopic"], "RES");
        assert_eq!(body[0]["operation"], "RES");
        assert_eq!(body[1]["payload"], "21.5");
    }

    #[tokio::test]
    async fn should_list_logs_chronologically_with_limit() {
        let state = test_state(Mode::Accept);
        for payload in [b"a", b"b", b"c"] {
            state
                .dispatcher
                .on_message("FREQUENCY/REQ/dev42/W", payload)
                .await;
        }

        let (status, body) =
            get_json(build(state), "/api/logs?order=chronological&limit=2").await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["sequence_id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(body[0]["operation"], "W");
        assert_eq!(body[0]["device_id"], "dev42");
    }

    #[tokio::test]
    async fn should_reject_unknown_order() {
        let app = build(test_state(Mode::Accept));
        let (status, _) = get_json(app, "/api/logs?order=sideways").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_list_diagnostics() {
        let state = test_state(Mode::Accept);
        state.dispatcher.on_message("FREQUENCY/REQ", b"440").await;

        let (status, body) = get_json(build(state), "/api/diagnostics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["kind"], "rejected");
        assert_eq!(body[0]["topic"], "FREQUENCY/REQ");
    }

    #[tokio::test]
    async fn should_publish_through_dispatcher() {
        let state = test_state(Mode::Accept);

        let (status, body) = post_publish(
            build(state.clone()),
            serde_json::json!({"topic": "FREQUENCY/RES/dev42", "message": "440"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topic"], "FREQUENCY/RES/dev42");
        assert_eq!(body["bytes"], 3);
        let published = state.dispatcher.gateway().published.lock().unwrap();
        assert_eq!(published[0], ("FREQUENCY/RES/dev42".to_string(), b"440".to_vec()));
    }

    #[tokio::test]
    async fn should_return_bad_request_for_malformed_topic() {
        let (status, body) = post_publish(
            build(test_state(Mode::Accept)),
            serde_json::json!({"topic": "FREQUENCY", "message": "440"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("FREQUENCY"));
    }

    #[tokio::test]
    async fn should_return_bad_gateway_when_publish_fails() {
        let (status, body) = post_publish(
            build(test_state(Mode::Fail)),
            serde_json::json!({"topic": "FREQUENCY/RES/dev42", "message": "440"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "gateway error");
    }

    #[tokio::test]
    async fn should_return_gateway_timeout_when_publish_stalls() {
        let (status, _) = post_publish(
            build(test_state(Mode::Stall)),
            serde_json::json!({"topic": "FREQUENCY/RES/dev42", "message": "440"}),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
