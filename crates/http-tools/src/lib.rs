//! Outbound HTTP plumbing for the ClickSend MCP server.
//!
//! This crate is the "network collaborator" of the translator: it receives a fully built
//! [`runtime::RequestDescriptor`] and returns the parsed JSON response. It knows nothing about
//! `OpenAPI`, tool schemas or argument routing.

pub mod config;
pub mod runtime;
pub mod semantics;
