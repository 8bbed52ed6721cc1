//! ClickSend `OpenAPI` -> MCP tool translation.
//!
//! Loads the ClickSend REST description, turns a configured set of operations into MCP tools
//! with JSON Schema inputs, and executes tool calls through a
//! [`clicksend_http_tools::runtime::ApiTransport`].

pub mod config;
pub mod date_range;
pub mod error;
pub mod natural_date;
pub mod operation;
pub mod params;
pub mod request;
pub mod resolver;
pub mod routing;
pub mod runtime;
pub mod schema;
pub mod spec;

pub use error::{OpenApiToolsError, Result};
pub use runtime::ToolRegistry;
pub use spec::SpecDocument;
