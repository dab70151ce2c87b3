//! # strand-runtime
//!
//! Session runtime: the conversation state machine, concurrent tool
//! dispatch, the broadcast event emitter, and the multi-session run
//! coordinator.
//!
//! - **Runner**: [`session::run_session`] — one session's model/dispatch
//!   loop, the single emitting task for that session
//! - **Dispatch**: [`dispatch::dispatch_round`] — one round of concurrent,
//!   isolated tool execution, results order-matched to requests
//! - **Emitter**: [`emitter::EventEmitter`] — non-blocking broadcast fan-out
//! - **Coordinator**: [`coordinator::SessionCoordinator`] — one run per
//!   session, a global concurrency cap, tracked join handles
//!
//! ## Crate Position
//!
//! Depends on: strand-core, strand-llm, strand-tools. Depended on by:
//! strand-server.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod dispatch;
pub mod emitter;
pub mod errors;
pub mod session;
pub mod types;

pub use coordinator::SessionCoordinator;
pub use emitter::EventEmitter;
pub use errors::RuntimeError;
pub use session::run_session;
pub use types::{RunResult, SessionConfig};
