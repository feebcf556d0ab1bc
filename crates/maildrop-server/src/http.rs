//! Route dispatch for the message buffer API.
//!
//! Endpoints:
//!
//! - `POST /topics/{topic}` appends a JSON object to the topic
//! - `GET /topics/{topic}` retrieves messages from a cursor
//! - `GET /topics/{topic}/watch` streams batches until disconnect
//! - `GET /health`, `GET /metrics` for operations

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt as _, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use maildrop_core::{MessageStore, WatchSession};

use crate::watch::ChannelSink;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub push_interval: Duration,
    /// Present when the process installed the Prometheus recorder.
    pub metrics: Option<PrometheusHandle>,
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/topics/{topic}", post(append_topic).get(get_topic))
        .route("/topics/{topic}/watch", get(watch_topic))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .layer(cors)
        .with_state(state)
}

/// Cursor query parameters shared by retrieve and watch.
#[derive(Debug, Deserialize)]
struct CursorQuery {
    #[serde(rename = "generationID", default)]
    generation_id: String,
    // Kept as a string so an empty value falls back to 0 while anything
    // non-numeric is rejected with a 400.
    #[serde(rename = "fromIndex")]
    from_index: Option<String>,
}

impl CursorQuery {
    fn from_index(&self) -> Result<u64, Response> {
        match self.from_index.as_deref() {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse().map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("invalid 'fromIndex': {e}"),
                )
                    .into_response()
            }),
        }
    }
}

async fn append_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    body: Bytes,
) -> Response {
    // Only JSON objects are accepted; scalars and arrays are rejected.
    let data: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("body is not a valid JSON object: {e}"),
            )
                .into_response();
        }
    };

    match state
        .store
        .append(&topic, serde_json::Value::Object(data))
        .await
    {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn get_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let from_index = match query.from_index() {
        Ok(from_index) => from_index,
        Err(rejection) => return rejection,
    };

    match state
        .store
        .get(&topic, &query.generation_id, from_index)
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn watch_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let from_index = match query.from_index() {
        Ok(from_index) => from_index,
        Err(rejection) => return rejection,
    };

    info!(topic = %topic, "Watch connection accepted");

    let (tx, rx) = mpsc::channel(16);
    let session = WatchSession::new(
        Arc::clone(&state.store),
        topic.clone(),
        query.generation_id.clone(),
        from_index,
        state.push_interval,
        ChannelSink::new(tx),
    );

    tokio::spawn(async move {
        match session.run().await {
            Ok(()) => debug!(topic = %topic, "Watch session closed"),
            Err(e) => warn!(topic = %topic, error = %e, "Watch session ended"),
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok::<Bytes, std::convert::Infallible>);
    Response::new(Body::from_stream(stream))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are not enabled").into_response(),
    }
}
