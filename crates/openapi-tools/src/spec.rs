//! Loading the API description.

use crate::error::{OpenApiToolsError, Result};
use crate::resolver::ReferenceResolver;
use openapiv3::{OpenAPI, PathItem, ReferenceOr};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, info, warn};

/// The message-history listing; the only operation that takes a free-text date expression.
pub const HISTORY_PATH: &str = "/v3/sms/history";

/// Query parameter carrying the caller's original date wording.
pub const USER_DATE_REQUEST: &str = "user_date_request";

const USER_DATE_REQUEST_DESCRIPTION: &str = "[FOR AI AGENTS] When user requests dates in natural language (e.g., 'Aug 5 2025', 'yesterday', 'last Tuesday'), pass the EXACT original user message here. The backend will parse this to generate correct Unix timestamps for date_from/date_to, avoiding common AI errors like wrong years. This parameter overrides any date_from/date_to values if provided.";

/// Assumed when the document does not say.
const DEFAULT_OPENAPI_VERSION: &str = "3.0.0";

const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A loaded, enriched and thereafter immutable `OpenAPI` document.
///
/// Holds both the typed model and a JSON view of it; the latter is what `$ref` pointers are
/// walked against. Loading is lenient: fields the translator never reads (`responses`, `info`,
/// the `openapi` version) are optional, and a path item the typed model cannot represent is
/// skipped with a warning instead of failing the whole document.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    openapi: OpenAPI,
    document: Value,
}

impl SpecDocument {
    /// Read and parse a spec file (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading OpenAPI spec from {}", path.display());
        let content =
            std::fs::read_to_string(path).map_err(|e| OpenApiToolsError::SpecReadFile {
                path: path.display().to_string(),
                source: e,
            })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Parse a spec held in memory. `location` only labels errors.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not YAML, or is not a mapping at the top level.
    pub fn from_yaml_str(content: &str, location: &str) -> Result<Self> {
        // JSON is a valid subset of YAML, so serde_yaml alone is enough.
        let document: Value =
            serde_yaml::from_str(content).map_err(|e| OpenApiToolsError::SpecParse {
                location: location.to_string(),
                source: e,
            })?;
        Self::from_document(document)
    }

    /// Wrap an already parsed model, applying the history-parameter injection.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be converted into its JSON view.
    pub fn from_openapi(openapi: OpenAPI) -> Result<Self> {
        let document =
            serde_json::to_value(&openapi).map_err(|e| OpenApiToolsError::OpenApi(e.to_string()))?;
        Self::from_document(document)
    }

    /// Build from a raw JSON view: fill in the fields the typed model insists on, inject the
    /// history parameter, then derive the typed model.
    ///
    /// # Errors
    ///
    /// Returns an error if `document` is not a mapping.
    pub fn from_document(mut document: Value) -> Result<Self> {
        fill_required_fields(&mut document)?;
        if inject_date_request_parameter(&mut document) {
            debug!("added '{USER_DATE_REQUEST}' to GET {HISTORY_PATH}");
        }
        let openapi = typed_model(&document);
        Ok(Self { openapi, document })
    }

    #[must_use]
    pub fn openapi(&self) -> &OpenAPI {
        &self.openapi
    }

    /// JSON view of the document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    #[must_use]
    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.document)
    }

    /// `info.title`; empty when the document has none.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.openapi.info.title
    }
}

/// Default `openapi`, `info` and per-operation `responses` where absent.
fn fill_required_fields(document: &mut Value) -> Result<()> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| OpenApiToolsError::OpenApi("spec document is not a mapping".to_string()))?;
    root.entry("openapi").or_insert_with(|| json!(DEFAULT_OPENAPI_VERSION));
    if let Some(info) = root.entry("info").or_insert_with(|| json!({})).as_object_mut() {
        info.entry("title").or_insert_with(|| json!(""));
        info.entry("version").or_insert_with(|| json!(""));
    }
    let paths = root.entry("paths").or_insert_with(|| json!({}));
    for item in paths.as_object_mut().into_iter().flat_map(|p| p.values_mut()) {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        for key in OPERATION_KEYS {
            if let Some(op) = item.get_mut(key).and_then(Value::as_object_mut) {
                op.entry("responses").or_insert_with(|| json!({}));
            }
        }
    }
    Ok(())
}

/// Typed model of `document`, built path by path so one unsupported entry only costs that path.
fn typed_model(document: &Value) -> OpenAPI {
    let mut shell = document.clone();
    let paths = shell
        .as_object_mut()
        .and_then(|root| root.insert("paths".to_string(), json!({})));

    let mut openapi: OpenAPI = serde_json::from_value(shell).unwrap_or_else(|e| {
        warn!("ignoring top-level OpenAPI fields: {e}");
        OpenAPI {
            openapi: document["openapi"]
                .as_str()
                .unwrap_or(DEFAULT_OPENAPI_VERSION)
                .to_string(),
            info: serde_json::from_value(document["info"].clone()).unwrap_or_default(),
            ..OpenAPI::default()
        }
    });

    let Some(Value::Object(paths)) = paths else {
        return openapi;
    };
    for (path, item) in paths {
        if !path.starts_with('/') {
            continue;
        }
        match serde_json::from_value::<ReferenceOr<PathItem>>(item) {
            Ok(item) => {
                openapi.paths.paths.insert(path, item);
            }
            Err(e) => warn!("skipping path {path}: {e}"),
        }
    }
    openapi
}

/// Add the optional `user_date_request` query parameter to `GET /v3/sms/history`.
///
/// Idempotent: returns `false` without touching the document when a parameter of that name is
/// already declared (inline or through a `$ref`), or when the history operation is absent.
pub fn inject_date_request_parameter(document: &mut Value) -> bool {
    let pointer = format!("/paths/{}/get", HISTORY_PATH.replace('~', "~0").replace('/', "~1"));
    let Some(op) = document.pointer(&pointer) else {
        return false;
    };
    let resolver = ReferenceResolver::new(document);
    let already_declared = op
        .get("parameters")
        .and_then(Value::as_array)
        .is_some_and(|params| {
            params
                .iter()
                .any(|p| parameter_name(resolver, p) == Some(USER_DATE_REQUEST))
        });
    if already_declared {
        return false;
    }

    let Some(op) = document.pointer_mut(&pointer).and_then(Value::as_object_mut) else {
        return false;
    };
    let Some(params) = op
        .entry("parameters")
        .or_insert_with(|| json!([]))
        .as_array_mut()
    else {
        return false;
    };
    params.push(json!({
        "name": USER_DATE_REQUEST,
        "in": "query",
        "required": false,
        "description": USER_DATE_REQUEST_DESCRIPTION,
        "schema": {"type": "string"}
    }));
    true
}

fn parameter_name<'a>(resolver: ReferenceResolver<'a>, mut node: &'a Value) -> Option<&'a str> {
    // Bounded so a reference cycle cannot spin.
    for _ in 0..16 {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => node = resolver.resolve_value(reference).ok()?,
            None => return node.get("name")?.as_str(),
        }
    }
    None
}
