//! Assembling the outbound request from routed arguments.

use crate::operation::OperationDescriptor;
use crate::params::BodyShape;
use crate::routing::{RoutedParameters, value_to_string};
use clicksend_http_tools::runtime::RequestDescriptor;
use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use url::form_urlencoded;

/// Marks records as sent through this server.
pub const PROVENANCE_FIELD: &str = "source";
pub const PROVENANCE_VALUE: &str = "mcp";

/// Substitute `{name}` placeholders in `template` with percent-encoded values.
#[must_use]
pub fn build_path(template: &str, values: &BTreeMap<String, String>) -> String {
    values
        .iter()
        .fold(template.to_string(), |path, (name, value)| {
            path.replace(&format!("{{{name}}}"), &encode_component(value))
        })
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Append `query` as a form-encoded query string. Null values are skipped.
#[must_use]
pub fn append_query(path: &str, query: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut pairs = 0usize;
    for (name, value) in query {
        if value.is_null() {
            continue;
        }
        serializer.append_pair(name, &value_to_string(value));
        pairs += 1;
    }
    if pairs == 0 {
        return path.to_string();
    }
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{}", serializer.finish())
}

/// The JSON payload for a non-GET call, stamped with the provenance marker.
///
/// For [`BodyShape::EachElement`] the marker goes on every object in the named array; if that
/// field is absent or not an array the payload itself is marked instead.
#[must_use]
pub fn build_body(
    mut body: Map<String, Value>,
    method: &Method,
    shape: &BodyShape,
) -> Option<Value> {
    if *method == Method::GET {
        return None;
    }
    let marker = || Value::String(PROVENANCE_VALUE.to_string());

    match shape {
        BodyShape::EachElement { field } => match body.get_mut(field) {
            Some(Value::Array(records)) => {
                for record in records.iter_mut().filter_map(Value::as_object_mut) {
                    record.insert(PROVENANCE_FIELD.to_string(), marker());
                }
            }
            _ => {
                body.insert(PROVENANCE_FIELD.to_string(), marker());
            }
        },
        BodyShape::Single => {
            body.insert(PROVENANCE_FIELD.to_string(), marker());
        }
    }
    Some(Value::Object(body))
}

/// Combine path, query and body into a request for `op`.
#[must_use]
pub fn build_request(
    op: &OperationDescriptor,
    routed: RoutedParameters,
    shape: &BodyShape,
) -> RequestDescriptor {
    let path = build_path(&op.path, &routed.path_values);
    RequestDescriptor {
        method: op.method.clone(),
        path: append_query(&path, &routed.query_values),
        body: build_body(routed.body_values, &op.method, shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn path_values_are_component_encoded() {
        let values = BTreeMap::from([
            ("message_id".to_string(), "42 a/b".to_string()),
            ("list_id".to_string(), "it's(ok)~".to_string()),
        ]);
        assert_eq!(
            build_path("/v3/sms/receipts/{message_id}", &values),
            "/v3/sms/receipts/42%20a%2Fb"
        );
        assert_eq!(build_path("/v3/lists/{list_id}", &values), "/v3/lists/it's(ok)~");
        assert_eq!(
            build_path("/x/{u}", &BTreeMap::from([("u".to_string(), "é".to_string())])),
            "/x/%C3%A9"
        );
    }

    #[test]
    fn query_skips_nulls_and_form_encodes() {
        let q = map(json!({"q": "a b&c", "gone": null}));
        assert_eq!(append_query("/v3/sms/history", &q), "/v3/sms/history?q=a+b%26c");
        assert_eq!(
            append_query("/v3/sms/history", &map(json!({"ids": [1, 2]}))),
            "/v3/sms/history?ids=1%2C2"
        );
        assert_eq!(
            append_query("/v3/sms/history", &map(json!({"gone": null}))),
            "/v3/sms/history"
        );
        assert_eq!(append_query("/p?x=1", &map(json!({"y": true}))), "/p?x=1&y=true");
    }

    #[test]
    fn each_message_gets_the_marker() {
        let body = map(json!({
            "messages": [
                {"to": "+61411111111", "body": "hi", "source": "caller"},
                {"to": "+61422222222", "body": "yo"}
            ]
        }));
        let shape = BodyShape::EachElement {
            field: "messages".to_string(),
        };
        let out = build_body(body, &Method::POST, &shape).unwrap();
        assert_eq!(
            out,
            json!({
                "messages": [
                    {"to": "+61411111111", "body": "hi", "source": "mcp"},
                    {"to": "+61422222222", "body": "yo", "source": "mcp"}
                ]
            })
        );
    }

    #[test]
    fn single_payload_is_marked_and_get_has_no_body() {
        let out = build_body(map(json!({"list_name": "VIP"})), &Method::PUT, &BodyShape::Single);
        assert_eq!(out, Some(json!({"list_name": "VIP", "source": "mcp"})));

        let shape = BodyShape::EachElement {
            field: "messages".to_string(),
        };
        let out = build_body(Map::new(), &Method::POST, &shape);
        assert_eq!(out, Some(json!({"source": "mcp"})));

        assert_eq!(build_body(map(json!({"a": 1})), &Method::GET, &BodyShape::Single), None);
    }
}
