//! Operation lookup and identifiers.

use crate::spec::SpecDocument;
use openapiv3::{
    Operation, Parameter, ParameterData, ParameterSchemaOrContent, PathItem, ReferenceOr,
    RequestBody, Schema,
};
use regex::Regex;
use reqwest::Method;
use std::sync::LazyLock;
use tracing::warn;

static DISALLOWED_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));
static REPEATED_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: Option<String>,
    /// `None` when the parameter is described by `content` rather than `schema`.
    pub schema: Option<ReferenceOr<Schema>>,
}

/// One method+path operation, with parameters and request body already resolved.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub method: Method,
    /// Path template, e.g. `/v3/sms/receipts/{message_id}`.
    pub path: String,
    pub summary: Option<String>,
    pub operation_id: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub request_body: Option<RequestBody>,
}

impl OperationDescriptor {
    /// Host-visible tool name.
    #[must_use]
    pub fn tool_name(&self) -> String {
        sanitize_tool_id(&self.operation_id)
    }

    /// The summary, or `METHOD PATH` when the operation has none.
    #[must_use]
    pub fn description(&self) -> String {
        match self.summary.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => format!("{} {}", self.method, self.path),
        }
    }

    pub fn parameters_in(
        &self,
        location: ParamLocation,
    ) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(move |p| p.location == location)
    }

    #[must_use]
    pub fn is_query_parameter(&self, name: &str) -> bool {
        self.parameters_in(ParamLocation::Query).any(|p| p.name == name)
    }

    /// GET requests never carry a body.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }
}

/// Looks operations up by method and exact path key.
#[derive(Debug, Clone, Copy)]
pub struct OperationIndex<'a> {
    spec: &'a SpecDocument,
}

impl<'a> OperationIndex<'a> {
    #[must_use]
    pub fn new(spec: &'a SpecDocument) -> Self {
        Self { spec }
    }

    /// Find the operation for `method` (case-insensitive) on `path`.
    ///
    /// Unresolvable parameter or body references are skipped with a warning rather than failing
    /// the lookup.
    #[must_use]
    pub fn lookup(&self, method: &str, path: &str) -> Option<OperationDescriptor> {
        let resolver = self.spec.resolver();
        let item = match self.spec.openapi().paths.paths.get(path)? {
            ReferenceOr::Item(item) => item.clone(),
            reference @ ReferenceOr::Reference { .. } => {
                match resolver.resolve_path_item(reference) {
                    Ok(item) => item,
                    Err(e) => {
                        warn!("path item {path}: {e}");
                        return None;
                    }
                }
            }
        };

        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()?;
        let operation = operation_for(&item, &method)?;

        let mut parameters: Vec<ParameterDescriptor> = Vec::new();
        for p in item.parameters.iter().chain(&operation.parameters) {
            let param = match resolver.resolve_parameter(p) {
                Ok(param) => param,
                Err(e) => {
                    warn!("{method} {path}: skipping parameter: {e}");
                    continue;
                }
            };
            let Some(desc) = describe_parameter(param) else {
                continue;
            };
            // Operation-level parameters override path-level ones with the same name+location.
            if let Some(existing) = parameters
                .iter_mut()
                .find(|e| e.name == desc.name && e.location == desc.location)
            {
                *existing = desc;
            } else {
                parameters.push(desc);
            }
        }

        let request_body = operation.request_body.as_ref().and_then(|b| {
            resolver
                .resolve_request_body(b)
                .map_err(|e| warn!("{method} {path}: ignoring request body: {e}"))
                .ok()
        });

        Some(OperationDescriptor {
            operation_id: derive_operation_id(method.as_str(), path),
            summary: operation.summary.clone(),
            method,
            path: path.to_string(),
            parameters,
            request_body,
        })
    }
}

fn operation_for<'i>(item: &'i PathItem, method: &Method) -> Option<&'i Operation> {
    match *method {
        Method::GET => item.get.as_ref(),
        Method::PUT => item.put.as_ref(),
        Method::POST => item.post.as_ref(),
        Method::DELETE => item.delete.as_ref(),
        Method::OPTIONS => item.options.as_ref(),
        Method::HEAD => item.head.as_ref(),
        Method::PATCH => item.patch.as_ref(),
        Method::TRACE => item.trace.as_ref(),
        _ => None,
    }
}

/// Path and query parameters only; header and cookie parameters are not part of a tool's input.
fn describe_parameter(param: Parameter) -> Option<ParameterDescriptor> {
    let (data, location): (ParameterData, ParamLocation) = match param {
        Parameter::Path { parameter_data, .. } => (parameter_data, ParamLocation::Path),
        Parameter::Query { parameter_data, .. } => (parameter_data, ParamLocation::Query),
        Parameter::Header { .. } | Parameter::Cookie { .. } => return None,
    };
    let schema = match data.format {
        ParameterSchemaOrContent::Schema(s) => Some(s),
        ParameterSchemaOrContent::Content(_) => None,
    };
    Some(ParameterDescriptor {
        required: data.required || location == ParamLocation::Path,
        name: data.name,
        location,
        description: data.description,
        schema,
    })
}

/// Stable identifier for an operation: `METHOD-path` restricted to word characters and `-`.
///
/// `derive_operation_id("POST", "/v3/sms/send") == "POST-v3-sms-send"`.
#[must_use]
pub fn derive_operation_id(method: &str, path: &str) -> String {
    let raw = format!("{method}-{path}");
    let restricted = DISALLOWED_ID_CHARS.replace_all(&raw, "-");
    REPEATED_DASHES.replace_all(&restricted, "-").into_owned()
}

/// Lower-cased, restricted form of an operation id, used as the tool name.
#[must_use]
pub fn sanitize_tool_id(operation_id: &str) -> String {
    DISALLOWED_ID_CHARS
        .replace_all(&operation_id.to_lowercase(), "-")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r##"
openapi: "3.0.0"
info: { title: t, version: "1" }
components:
  parameters:
    Page:
      name: page
      in: query
      schema: { type: integer }
paths:
  /v3/sms/receipts/{message_id}:
    parameters:
      - name: message_id
        in: path
        required: true
        description: Path-level description
        schema: { type: string }
      - name: verbose
        in: query
        schema: { type: boolean }
    get:
      summary: Get a specific delivery receipt
      parameters:
        - name: message_id
          in: path
          required: true
          description: Message ID
          schema: { type: string }
        - $ref: "#/components/parameters/Page"
        - $ref: "#/components/parameters/Missing"
        - name: X-Trace
          in: header
          schema: { type: string }
      responses:
        "200": { description: ok }
  /v3/sms/templates:
    get:
      responses:
        "200": { description: ok }
"##;

    fn spec() -> SpecDocument {
        SpecDocument::from_yaml_str(SPEC, "inline").unwrap()
    }

    #[test]
    fn derives_ids_and_tool_names() {
        assert_eq!(derive_operation_id("POST", "/v3/sms/send"), "POST-v3-sms-send");
        assert_eq!(
            derive_operation_id("GET", "/v3/search/contacts-lists"),
            "GET-v3-search-contacts-lists"
        );
        assert_eq!(
            derive_operation_id("GET", "/v3/sms/receipts/{message_id}"),
            "GET-v3-sms-receipts-message_id-"
        );
        assert_eq!(sanitize_tool_id("POST-v3-sms-send"), "post-v3-sms-send");
        assert_eq!(sanitize_tool_id("Get Stats!"), "get-stats-");
    }

    #[test]
    fn lookup_is_case_insensitive_on_method() {
        let spec = spec();
        let index = OperationIndex::new(&spec);
        let op = index.lookup("get", "/v3/sms/templates").unwrap();
        assert_eq!(op.method, Method::GET);
        assert_eq!(op.tool_name(), "get-v3-sms-templates");
        assert!(index.lookup("POST", "/v3/sms/templates").is_none());
        assert!(index.lookup("GET", "/v3/sms/template").is_none());
    }

    #[test]
    fn description_falls_back_to_method_and_path() {
        let spec = spec();
        let index = OperationIndex::new(&spec);
        let op = index.lookup("GET", "/v3/sms/templates").unwrap();
        assert_eq!(op.description(), "GET /v3/sms/templates");
        let op = index.lookup("GET", "/v3/sms/receipts/{message_id}").unwrap();
        assert_eq!(op.description(), "Get a specific delivery receipt");
    }

    #[test]
    fn merges_parameters_and_drops_headers_and_broken_refs() {
        let spec = spec();
        let op = OperationIndex::new(&spec)
            .lookup("GET", "/v3/sms/receipts/{message_id}")
            .unwrap();

        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["message_id", "verbose", "page"]);

        let message_id = &op.parameters[0];
        assert_eq!(message_id.location, ParamLocation::Path);
        assert_eq!(message_id.description.as_deref(), Some("Message ID"));
        assert!(message_id.required);

        assert!(op.is_query_parameter("page"));
        assert!(!op.is_query_parameter("message_id"));
        assert!(op.is_read());
    }
}
