//! MCP surface over the tool registry.

use clicksend_openapi_tools::{OpenApiToolsError, ToolRegistry};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Tools for the ClickSend SMS API. Send and price messages, browse \
templates, contact lists, delivery receipts, statistics and message history. When the user \
describes dates in words, pass their exact wording as `user_date_request` to the history tool \
instead of computing timestamps yourself.";

#[derive(Debug, Clone)]
pub struct ClickSendServer {
    registry: Arc<ToolRegistry>,
    title: Option<String>,
}

impl ClickSendServer {
    #[must_use]
    pub fn new(registry: ToolRegistry, title: Option<String>) -> Self {
        Self {
            registry: Arc::new(registry),
            title,
        }
    }

    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }
}

impl ServerHandler for ClickSendServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: self.title.clone(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.registry.list_tools(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        self.registry
            .call_tool(&request.name, arguments)
            .await
            .map_err(to_error_data)
    }
}

fn to_error_data(e: OpenApiToolsError) -> ErrorData {
    match e {
        OpenApiToolsError::UnknownTool(_) | OpenApiToolsError::InvalidArguments(_) => {
            ErrorData::invalid_params(e.to_string(), None)
        }
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn unknown_tool_is_invalid_params() {
        let err = to_error_data(OpenApiToolsError::UnknownTool("nope".to_string()));
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "Tool not found: nope");
    }

    #[test]
    fn other_failures_are_internal() {
        let err = to_error_data(OpenApiToolsError::Config("bad".to_string()));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }
}
