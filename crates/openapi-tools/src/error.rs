//! Error types for `clicksend-openapi-tools`.

use clicksend_http_tools::runtime::HttpToolsError;
use thiserror::Error;

/// Main error type for `OpenAPI` tooling.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Configuration errors (bad endpoint selector, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Structural problems in an otherwise parseable document.
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// A local `$ref` that could not be followed.
    #[error("Failed reference: {reference} ({message})")]
    Reference { reference: String, message: String },

    #[error("Could not match endpoint: {method} {path} in OpenAPI spec")]
    EndpointNotFound { method: String, path: String },

    #[error("Required path parameter '{0}' is missing")]
    MissingPathParameter(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Transport failure, non-success status, or unparseable response.
    #[error(transparent)]
    Upstream(#[from] HttpToolsError),

    #[error("Tool not found: {0}")]
    UnknownTool(String),
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
