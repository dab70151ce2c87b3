//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use strand_llm::gateway::ModelGateway;
use strand_runtime::{EventEmitter, SessionCoordinator};
use strand_tools::registry::ToolRegistry;

use crate::settings::SettingsHandle;

/// Everything the route handlers need, shared behind one `Arc`.
pub struct AppState {
    /// Run tracking and concurrency cap.
    pub coordinator: Arc<SessionCoordinator>,
    /// Immutable tool registry.
    pub registry: Arc<ToolRegistry>,
    /// Model provider.
    pub gateway: Arc<dyn ModelGateway>,
    /// Injected settings with TTL refresh.
    pub settings: SettingsHandle,
    /// Renders the `/metrics` endpoint.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Shared event emitter (owned by the coordinator).
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        self.coordinator.emitter()
    }
}
