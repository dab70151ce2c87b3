//! HTTP routes: prompt, abort, health, metrics.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use strand_core::messages::{Conversation, Turn};
use strand_runtime::errors::RuntimeError;
use strand_runtime::session::run_session;

use crate::state::AppState;
use crate::{mcp, sse};

/// Body of `POST /sessions/{id}/prompt`.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    /// The user message.
    pub text: String,
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions/{id}/prompt", post(prompt))
        .route("/sessions/{id}/abort", post(abort))
        .route("/sessions/{id}/events", get(sse::session_events))
        .route("/mcp", post(mcp::handle_mcp_request))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start a background run for a session.
///
/// Responds `202 Accepted` with the run id; the caller follows progress
/// on the session's SSE stream. Busy sessions get `409`, a full server
/// gets `503`.
async fn prompt(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<PromptRequest>,
) -> (StatusCode, Json<Value>) {
    if request.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "prompt text must not be empty"})),
        );
    }

    let settings = state.settings.current();
    let config = settings.session_config();

    let mut conversation = Conversation::new();
    conversation.push(Turn::user(request.text));

    let gateway = Arc::clone(&state.gateway);
    let registry = Arc::clone(&state.registry);
    let emitter = Arc::clone(state.emitter());
    let sid = session_id.clone();

    let spawned = state.coordinator.spawn_run(&session_id, move |cancel| {
        async move {
            // Terminal frames are emitted inside the runner on every path.
            let _ = run_session(
                &sid,
                conversation,
                gateway.as_ref(),
                &registry,
                &emitter,
                cancel,
                &config,
            )
            .await;
        }
    });

    match spawned {
        Ok(run_id) => {
            info!(%session_id, %run_id, "run accepted");
            (
                StatusCode::ACCEPTED,
                Json(json!({"sessionId": session_id, "runId": run_id})),
            )
        }
        Err(err @ RuntimeError::SessionBusy(_)) => {
            (StatusCode::CONFLICT, Json(json!({"error": err.to_string()})))
        }
        Err(err @ RuntimeError::ServerBusy { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": err.to_string()})),
        ),
        Err(err) => {
            error!(%err, "failed to start run");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
        }
    }
}

/// Cancel a session's active run.
async fn abort(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    let aborted = state.coordinator.abort(&session_id);
    Json(json!({"sessionId": session_id, "aborted": aborted}))
}

/// Liveness probe.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeRuns": state.coordinator.active_run_count(),
        "maxConcurrentRuns": state.coordinator.max_concurrent_runs(),
    }))
}

/// Prometheus text exposition.
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
