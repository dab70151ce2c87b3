//! # strand-server
//!
//! Axum HTTP surface over the session runtime.
//!
//! - Prompt/abort routes spawning background runs via the coordinator
//! - Per-session SSE event streaming bridged from the broadcast emitter
//! - JSON-RPC 2.0 tool serving at `/mcp`
//! - Prometheus `/metrics` and `/health`
//! - Layered settings with a TTL-cached, injected handle

#![deny(unsafe_code)]

pub mod mcp;
pub mod metrics;
pub mod routes;
pub mod settings;
pub mod sse;
pub mod state;

pub use routes::router;
pub use settings::{Settings, SettingsHandle};
pub use state::AppState;
