//! Prometheus metrics recorder and metric name constants.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across crates.

/// Session runs started total (counter).
pub const SESSION_RUNS_TOTAL: &str = "session_runs_total";
/// Session run duration seconds (histogram).
pub const SESSION_RUN_DURATION_SECONDS: &str = "session_run_duration_seconds";
/// Session runs that ended in an error frame (counter, labels: code).
pub const SESSION_ERRORS_TOTAL: &str = "session_errors_total";
/// Model turns within sessions (counter).
pub const SESSION_TURNS_TOTAL: &str = "session_turns_total";
/// Active session runs (gauge).
pub const SESSION_RUNS_ACTIVE: &str = "session_runs_active";
/// Tool executions total (counter, labels: tool).
pub const TOOL_EXECUTIONS_TOTAL: &str = "tool_executions_total";
/// Tool execution duration seconds (histogram, labels: tool).
pub const TOOL_EXECUTION_DURATION_SECONDS: &str = "tool_execution_duration_seconds";
/// Tool failures total (counter, labels: tool, code).
pub const TOOL_ERRORS_TOTAL: &str = "tool_errors_total";
/// Provider requests total (counter, labels: provider).
pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
/// Provider errors total (counter, labels: provider, status).
pub const PROVIDER_ERRORS_TOTAL: &str = "provider_errors_total";
/// Provider request duration seconds (histogram, labels: provider).
pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "provider_request_duration_seconds";
/// SSE connections opened total (counter).
pub const SSE_CONNECTIONS_TOTAL: &str = "sse_connections_total";
/// SSE frames skipped by lagging subscribers (counter).
pub const SSE_LAGGED_FRAMES_TOTAL: &str = "sse_lagged_frames_total";
/// JSON-RPC requests total (counter, labels: method).
pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
