//! # strand-tools
//!
//! Tool trait, registry, and the fallible-tool machinery.
//!
//! - **Traits**: [`traits::Tool`] — the handler contract — and
//!   [`traits::ToolContext`] carried into every invocation
//! - **Registry**: [`registry::ToolRegistry`], immutable after startup, with
//!   a catalogue computed once and reused
//! - **Schema**: [`schema::validate_arguments`] — JSON-schema-subset
//!   validation producing typed errors instead of failures deep in handlers
//! - **Sandbox**: [`sandbox::RunCodeTool`] over a [`sandbox::SandboxProvider`]
//!   port with create → exec → destroy on every exit path;
//!   [`providers::ProcessSandbox`] is the subprocess-backed implementation
//! - **Retry**: [`retry::SelfCorrectingTool`] — the bounded self-correcting
//!   wrapper for the code-execution tool
//!
//! ## Crate Position
//!
//! Depends on: strand-core. Depended on by: strand-runtime, strand-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod sandbox;
pub mod schema;
pub mod testutil;
pub mod traits;

pub use errors::ToolError;
pub use registry::ToolRegistry;
pub use retry::SelfCorrectingTool;
pub use traits::{Tool, ToolContext};
