//! Tool registry runtime.
//!
//! Turns selected `OpenAPI` operations into MCP tools and executes `tools/call` against an
//! [`ApiTransport`]. A call runs: argument validation, routing into path/query/body, date
//! rewriting for the history listing, request assembly, execution, and formatting.

use crate::config::EndpointSelector;
use crate::date_range::DateRangeResolver;
use crate::error::{OpenApiToolsError, Result};
use crate::operation::{OperationDescriptor, OperationIndex};
use crate::params::{ParamsSchema, ParamsSchemaBuilder};
use crate::request::build_request;
use crate::routing::route;
use crate::schema::ArgumentValidator;
use crate::spec::SpecDocument;
use clicksend_http_tools::runtime::ApiTransport;
use clicksend_http_tools::semantics::annotations_for_method;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct RegisteredTool {
    name: String,
    op: OperationDescriptor,
    params: ParamsSchema,
    input_schema: Arc<JsonObject>,
    validator: ArgumentValidator,
}

/// Registered tools plus everything needed to execute them.
pub struct ToolRegistry {
    transport: Arc<dyn ApiTransport>,
    dates: DateRangeResolver,
    tools: Vec<RegisteredTool>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            dates: DateRangeResolver::new(),
            tools: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_date_resolver(mut self, dates: DateRangeResolver) -> Self {
        self.dates = dates;
        self
    }

    /// Register one tool per selector, skipping (with a warning) selectors the document does not
    /// define. Returns how many were registered.
    pub fn register_endpoints(
        &mut self,
        spec: &SpecDocument,
        endpoints: &[EndpointSelector],
    ) -> usize {
        let index = OperationIndex::new(spec);
        let builder = ParamsSchemaBuilder::new(spec);
        let mut registered = 0;

        for endpoint in endpoints {
            let Some(op) = index.lookup(endpoint.method.as_str(), &endpoint.path) else {
                let err = OpenApiToolsError::EndpointNotFound {
                    method: endpoint.method.to_string(),
                    path: endpoint.path.clone(),
                };
                warn!("{err}");
                continue;
            };
            let params = builder.build(&op);
            match self.register(op, params) {
                Ok(()) => registered += 1,
                Err(e) => warn!("skipping {endpoint}: {e}"),
            }
        }

        info!(
            registered,
            requested = endpoints.len(),
            "registered ClickSend tools"
        );
        registered
    }

    /// Register a single operation.
    ///
    /// # Errors
    ///
    /// Returns an error if a tool with the same name exists or the input schema does not compile.
    pub fn register(&mut self, op: OperationDescriptor, params: ParamsSchema) -> Result<()> {
        let name = op.tool_name();
        if self.find(&name).is_some() {
            return Err(OpenApiToolsError::Config(format!("duplicate tool name '{name}'")));
        }
        let input_schema = Arc::new(params.validators.input_schema());
        let validator = params.validators.compile()?;
        debug!(
            tool = %name,
            method = %op.method,
            path = %op.path,
            fields = params.validators.len(),
            "registered tool"
        );
        self.tools.push(RegisteredTool {
            name,
            op,
            params,
            input_schema,
            validator,
        });
        Ok(())
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// The registered tools, in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| {
                let mut tool = Tool::new(
                    t.name.clone(),
                    t.op.description(),
                    Arc::clone(&t.input_schema),
                );
                tool.annotations = Some(annotations_for_method(
                    &t.op.method,
                    t.op.summary.as_deref(),
                ));
                tool
            })
            .collect()
    }

    /// Execute a tool call.
    ///
    /// Failures while running a known tool (bad arguments, upstream errors) come back as an error
    /// result so the host can show them to the model.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::UnknownTool`] if no tool is registered under `name`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let tool = self
            .find(name)
            .ok_or_else(|| OpenApiToolsError::UnknownTool(name.to_string()))?;

        match self.execute(tool, arguments).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                warn!(tool = %name, "tool call failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))]))
            }
        }
    }

    async fn execute(&self, tool: &RegisteredTool, arguments: Value) -> Result<String> {
        let mut arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(OpenApiToolsError::InvalidArguments(format!(
                    "expected an object, got {other}"
                )));
            }
        };
        arguments.retain(|name, _| tool.params.validators.contains(name));

        let arguments = Value::Object(arguments);
        tool.validator.validate(&arguments)?;
        let Value::Object(arguments) = arguments else {
            return Err(OpenApiToolsError::InvalidArguments(
                "expected an object".to_string(),
            ));
        };

        let mut routed = route(arguments, &tool.op)?;
        self.dates.resolve(&tool.op.path, &mut routed.query_values);
        let request = build_request(&tool.op, routed, &tool.params.body_shape);

        let response = self.transport.execute(&request).await?;
        let pretty =
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string());
        Ok(format!(
            "{} {} completed successfully:\n{pretty}",
            request.method, request.path
        ))
    }
}
