//! # strand-core
//!
//! Foundation types for the Strand orchestration engine.
//!
//! This crate provides the shared vocabulary the other strand crates depend on:
//!
//! - **Turns**: [`messages::Turn`] with `User`, `Model`, `ToolResults` variants,
//!   and the append-only [`messages::Conversation`]
//! - **Tool calls**: [`messages::ToolCallRequest`] / [`messages::ToolCallResult`]
//!   with the error codes tools surface back to the model
//! - **Catalogue**: [`tools::ToolSpec`] entries sent to the model provider
//! - **Events**: [`events::StrandEvent`] streaming frames with session context
//! - **Text**: chunking and truncation utilities
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other strand crates.

#![deny(unsafe_code)]

pub mod events;
pub mod messages;
pub mod text;
pub mod tools;
