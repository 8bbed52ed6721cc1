//! Partitioning call arguments into path, query and body destinations.

use crate::error::{OpenApiToolsError, Result};
use crate::operation::{OperationDescriptor, ParamLocation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Disjoint partitions of one call's arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedParameters {
    /// Raw (not yet encoded) values for `{name}` placeholders.
    pub path_values: BTreeMap<String, String>,
    pub query_values: Map<String, Value>,
    pub body_values: Map<String, Value>,
}

/// Route `arguments` for `op`.
///
/// Path parameters are taken first; of what remains, declared query parameters go to the query
/// and everything else to the body. For GET the body is folded into the query.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::MissingPathParameter`] if a path parameter is absent or null.
pub fn route(
    mut arguments: Map<String, Value>,
    op: &OperationDescriptor,
) -> Result<RoutedParameters> {
    let mut routed = RoutedParameters::default();

    for param in op.parameters_in(ParamLocation::Path) {
        match arguments.remove(&param.name) {
            Some(Value::Null) | None => {
                return Err(OpenApiToolsError::MissingPathParameter(param.name.clone()));
            }
            Some(value) => {
                routed.path_values.insert(param.name.clone(), value_to_string(&value));
            }
        }
    }

    for (name, value) in arguments {
        if op.is_query_parameter(&name) {
            routed.query_values.insert(name, value);
        } else {
            routed.body_values.insert(name, value);
        }
    }

    if op.is_read() {
        routed.query_values.append(&mut routed.body_values);
    }

    Ok(routed)
}

/// Text form of a JSON value for paths and query strings.
///
/// Arrays become comma-separated lists of their elements' text forms; objects are kept as JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ParameterDescriptor;
    use reqwest::Method;
    use serde_json::json;

    fn param(name: &str, location: ParamLocation) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            location,
            required: location == ParamLocation::Path,
            description: None,
            schema: None,
        }
    }

    fn op(method: Method, path: &str, params: Vec<ParameterDescriptor>) -> OperationDescriptor {
        OperationDescriptor {
            operation_id: crate::operation::derive_operation_id(method.as_str(), path),
            method,
            path: path.to_string(),
            summary: None,
            parameters: params,
            request_body: None,
        }
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn splits_path_query_and_body() {
        let op = op(
            Method::PUT,
            "/v3/lists/{list_id}",
            vec![
                param("list_id", ParamLocation::Path),
                param("page", ParamLocation::Query),
            ],
        );
        let routed = route(
            args(json!({"list_id": 42, "page": 2, "list_name": "VIP"})),
            &op,
        )
        .unwrap();

        assert_eq!(routed.path_values.get("list_id").map(String::as_str), Some("42"));
        assert_eq!(routed.query_values, args(json!({"page": 2})));
        assert_eq!(routed.body_values, args(json!({"list_name": "VIP"})));
    }

    #[test]
    fn get_never_keeps_body_values() {
        let op = op(
            Method::GET,
            "/v3/sms/history",
            vec![param("date_from", ParamLocation::Query)],
        );
        let routed = route(args(json!({"date_from": 1, "q": "hello", "order_by": "date"})), &op)
            .unwrap();
        assert!(routed.body_values.is_empty());
        assert_eq!(
            routed.query_values,
            args(json!({"date_from": 1, "q": "hello", "order_by": "date"}))
        );
    }

    #[test]
    fn missing_or_null_path_parameter_is_an_error() {
        let op = op(
            Method::GET,
            "/v3/sms/receipts/{message_id}",
            vec![param("message_id", ParamLocation::Path)],
        );

        let err = route(Map::new(), &op).unwrap_err();
        assert_eq!(err.to_string(), "Required path parameter 'message_id' is missing");

        let err = route(args(json!({"message_id": null})), &op).unwrap_err();
        assert!(
            matches!(err, OpenApiToolsError::MissingPathParameter(name) if name == "message_id")
        );
    }

    #[test]
    fn value_text_forms() {
        assert_eq!(value_to_string(&json!("a b")), "a b");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!([1, "x", false])), "1,x,false");
        assert_eq!(value_to_string(&json!({"k": 1})), r#"{"k":1}"#);
    }
}
