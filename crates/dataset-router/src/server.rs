//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::ListenConfig;
use crate::correlation;
use crate::dispatch::Dispatcher;
use crate::select::{ResponseSelector, Selection};
use crate::stats::RouterStats;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub listen: ListenConfig,
    pub dispatcher: Dispatcher,
    pub selector: ResponseSelector,
    pub stats: RouterStats,
}

/// Build the axum router for the configured paths.
pub fn router(state: AppState) -> Router {
    let dataset_path = state.listen.path.clone();
    let healthcheck_path = state.listen.healthcheck_path.clone();

    Router::new()
        .route(&dataset_path, post(handle_dataset))
        .route(&healthcheck_path, get(handle_health))
        .route("/stats", get(handle_get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.listen.listen_address();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "dataset-router listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("dataset-router shut down gracefully");
    Ok(())
}

/// The fields of an inbound request the router itself needs.
struct DatasetRequest {
    body: Value,
    restricted_text: String,
    data_set: String,
}

/// Parse an inbound body. `None` if it is not a JSON object carrying string
/// `restrictedText` and `dataSet` fields.
fn parse_request(raw: &[u8]) -> Option<DatasetRequest> {
    let body: Value = serde_json::from_slice(raw).ok()?;
    let object = body.as_object()?;
    let restricted_text = object.get("restrictedText")?.as_str()?.to_string();
    let data_set = object.get("dataSet")?.as_str()?.to_string();
    Some(DatasetRequest {
        body,
        restricted_text,
        data_set,
    })
}

/// Main handler for POST on the configured dataset path.
///
/// 1. Validate the inbound JSON
/// 2. Forward it to every target and wait for all of them
/// 3. Score what came back and reply with the winner's body verbatim
async fn handle_dataset(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let correlation_id = correlation::generate_id();
    let span = router_tracing::route_request_span!(&correlation_id, state.dispatcher.targets().len());
    let start = Instant::now();

    state.stats.inc_requests();

    async {
        let Some(request) = parse_request(&body) else {
            tracing::warn!("Rejecting malformed dataset request");
            state.stats.inc_rejected();
            return invalid_json();
        };

        let results = match state.dispatcher.dispatch(&request.body).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize request for targets");
                state.stats.inc_rejected();
                return invalid_json();
            }
        };

        tracing::debug!(restricted_text = %request.restricted_text, "Processing responses");
        let selection = state
            .selector
            .select(results, &request.restricted_text, &request.data_set)
            .await;

        let span = tracing::Span::current();
        span.record("total_duration_ms", start.elapsed().as_millis() as u64);

        match selection {
            Some(Selection { result, score }) => {
                span.record("selected_target", result.target.as_str());
                span.record("score", score);
                tracing::info!(
                    target = %result.target,
                    score,
                    score_function = %state.selector.strategy(),
                    "Selected response"
                );
                state.stats.inc_selected();

                let mut response = (StatusCode::OK, result.body).into_response();
                if let Some(content_type) = result.headers.get(CONTENT_TYPE) {
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, content_type.clone());
                }
                response
            }
            None => {
                tracing::warn!("No target produced a usable response");
                state.stats.inc_no_response();
                (StatusCode::BAD_REQUEST, Json(json!({ "status": "No response" }))).into_response()
            }
        }
    }
    .instrument(span)
    .await
}

fn invalid_json() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid JSON" }))).into_response()
}

/// Health check endpoint for liveness/readiness probes.
async fn handle_health() -> impl IntoResponse {
    tracing::debug!("Healthcheck probe requested");
    (StatusCode::OK, Json(json!({ "health_status": "ok" })))
}

/// GET /stats: current router statistics.
async fn handle_get_stats(State(state): State<Arc<AppState>>) -> Response {
    Json(state.stats.snapshot()).into_response()
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
