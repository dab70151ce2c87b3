//! # strand-llm
//!
//! The model gateway port and its HTTP provider.
//!
//! - **Port**: [`gateway::ModelGateway`] — one `call` taking the accumulated
//!   conversation plus the tool catalogue, returning text or tool calls
//! - **Provider**: [`openai::OpenAiGateway`] — OpenAI-compatible
//!   chat-completions client (non-streaming JSON)
//! - **Errors**: [`errors::GatewayError`] — provider failures escalate to the
//!   session, they are never recovered per-call
//!
//! ## Crate Position
//!
//! Depends on: strand-core. Depended on by: strand-runtime, strand-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod gateway;
pub mod openai;

pub use errors::GatewayError;
pub use gateway::{ModelGateway, ModelOutcome};
pub use openai::{OpenAiConfig, OpenAiGateway};
