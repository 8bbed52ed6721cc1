//! MCP tool annotations derived from HTTP method semantics (RFC 9110).

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// `(read_only, destructive, idempotent)` hints for a method; `None` where the method says nothing.
fn method_hints(method: &Method) -> (Option<bool>, Option<bool>, Option<bool>) {
    match *method {
        Method::GET | Method::HEAD | Method::OPTIONS => (Some(true), Some(false), Some(true)),
        // Sending a message creates something new; it does not overwrite anything.
        Method::POST => (Some(false), Some(false), Some(false)),
        Method::PUT | Method::DELETE => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent.
        Method::PATCH => (Some(false), Some(true), None),
        _ => (None, None, None),
    }
}

/// Annotations for a tool backed by `method`, optionally titled.
///
/// `openWorldHint` is always `true`: every tool here talks to a remote API.
#[must_use]
pub fn annotations_for_method(method: &Method, title: Option<&str>) -> ToolAnnotations {
    let (read_only_hint, destructive_hint, idempotent_hint) = method_hints(method);
    ToolAnnotations {
        title: title.map(str::to_string),
        read_only_hint,
        destructive_hint,
        idempotent_hint,
        open_world_hint: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::annotations_for_method;
    use reqwest::Method;

    #[test]
    fn every_method_is_open_world() {
        let custom: Method = "PROPFIND".parse().expect("valid method token");
        for m in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, custom] {
            assert_eq!(annotations_for_method(&m, None).open_world_hint, Some(true));
        }
    }

    #[test]
    fn history_listing_is_read_only() {
        let a = annotations_for_method(&Method::GET, Some("Get all history"));
        assert_eq!(a.title.as_deref(), Some("Get all history"));
        assert_eq!(a.read_only_hint, Some(true));
        assert_eq!(a.destructive_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(true));
    }

    #[test]
    fn sending_is_not_idempotent() {
        let a = annotations_for_method(&Method::POST, None);
        assert_eq!(a.read_only_hint, Some(false));
        assert_eq!(a.destructive_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(false));
    }

    #[test]
    fn patch_leaves_idempotence_unknown() {
        let a = annotations_for_method(&Method::PATCH, None);
        assert_eq!(a.destructive_hint, Some(true));
        assert_eq!(a.idempotent_hint, None);
    }
}
