//! HTTP surface.
//!
//! | Route                      | Response                                  |
//! |----------------------------|-------------------------------------------|
//! | `GET /ember_mug`           | live status page                          |
//! | `GET /api/ember_mug/status`| latest snapshot as JSON, `{}` if none     |
//! | `GET /api/ember_mug/events`| `text/event-stream` of snapshots          |
//! | `GET /api/ember_mug/health`| poll health as JSON                       |

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use futures::Stream;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::coordinator::{Coordinator, PollHealth};
use crate::error::Result;

const PAGE: &str = include_str!("page.html");

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The coordinator behind every route.
    pub coordinator: Arc<Coordinator>,
}

/// Build the router for `coordinator`.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/ember_mug", get(page_handler))
        .route("/api/ember_mug/status", get(status_handler))
        .route("/api/ember_mug/events", get(events_handler))
        .route("/api/ember_mug/health", get(health_handler))
        .with_state(AppState { coordinator })
}

/// Serve the router on `addr` until `shutdown` resolves.
///
/// Open event streams keep the server alive; shut the coordinator down as
/// part of `shutdown` so they end.
pub async fn serve<F>(addr: SocketAddr, coordinator: Arc<Coordinator>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn page_handler(State(state): State<AppState>) -> Html<String> {
    let model = state.coordinator.options().device_type.model_name();
    Html(PAGE.replace("{{model}}", model))
}

/// Latest snapshot. Triggers a poll when nothing is cached yet.
async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    match state.coordinator.latest_or_refresh().await {
        Some(snapshot) => Json(snapshot.to_payload()),
        None => Json(json!({})),
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<PollHealth> {
    Json(state.coordinator.health())
}

/// Stream snapshots as server-sent events.
///
/// The cached snapshot, if any, goes out first. The subscription lives
/// inside the stream, so a client disconnect unregisters it.
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    // Subscribe before reading the cache so no publish falls in between.
    let subscription = state.coordinator.subscribe();
    let initial = state.coordinator.latest().map(|snapshot| snapshot.to_payload());

    debug!("Event stream {} opened", subscription.mailbox().id());

    let stream = async_stream::stream! {
        if let Some(payload) = initial {
            yield Event::default().json_data(&payload);
        }

        while let Some(payload) = subscription.recv().await {
            yield Event::default().json_data(&*payload);
        }

        debug!("Event stream {} closed", subscription.mailbox().id());
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::reader::MockDeviceReader;
    use crate::config::DeviceConfig;
    use crate::data::{DeviceType, StatusSnapshot};
    use crate::error::Error;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            current_temp_c: Some(18.01),
            target_temp_c: Some(55.0),
            battery_percent: Some(87),
            charging: Some(true),
            liquid_state_code: Some(5),
            liquid_level: Some(30),
        }
    }

    async fn coordinator(first: Option<StatusSnapshot>, device_type: DeviceType) -> Arc<Coordinator> {
        let mut mock = MockDeviceReader::new();
        let mut first = first;
        mock.expect_read().returning(move |_| {
            first.take().ok_or_else(|| Error::DeviceNotFound {
                address: "AA:BB".to_string(),
            })
        });

        let config = DeviceConfig::new("AA:BB").with_device_type(device_type);
        Arc::new(Coordinator::start(config, Arc::new(mock)).await.unwrap())
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_status_returns_cached_snapshot() {
        let coordinator = coordinator(Some(snapshot()), DeviceType::Mug).await;
        let (status, body) = get_body(router(coordinator), "/api/ember_mug/status").await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["current_temp_c"], json!(18.01));
        assert_eq!(value["liquid_state"], json!("heating"));
    }

    #[tokio::test]
    async fn test_status_empty_when_device_unreachable() {
        let coordinator = coordinator(None, DeviceType::Mug).await;
        let (status, body) = get_body(router(coordinator), "/api/ember_mug/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_health_reports_failure() {
        let coordinator = coordinator(None, DeviceType::Mug).await;
        let (_, body) = get_body(router(coordinator), "/api/ember_mug/health").await;

        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["available"], json!(false));
        assert_eq!(value["last_error"], json!("Device not found: AA:BB"));
    }

    #[tokio::test]
    async fn test_page_uses_model_name() {
        let coordinator = coordinator(None, DeviceType::Tumbler).await;
        let (status, body) = get_body(router(coordinator), "/ember_mug").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>Ember Tumbler</title>"));
        assert!(body.contains("/api/ember_mug/events"));
    }

    #[tokio::test]
    async fn test_events_sends_cached_snapshot_first() {
        let coordinator = coordinator(Some(snapshot()), DeviceType::Mug).await;

        let response = router(coordinator.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/ember_mug/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(coordinator.subscriber_count(), 1);

        // Ends every stream so the body completes.
        coordinator.shutdown().await;

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.starts_with("data: {"));
        assert!(body.contains("\"current_temp_c\":18.01"));
        assert_eq!(body.matches("data: ").count(), 1);
        assert_eq!(coordinator.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_event_stream_unsubscribes() {
        let coordinator = coordinator(Some(snapshot()), DeviceType::Mug).await;

        let response = router(coordinator.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/ember_mug/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(coordinator.subscriber_count(), 1);

        drop(response);
        assert_eq!(coordinator.subscriber_count(), 0);
    }
}
