use crate::error::{OpenApiToolsError, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Operations exposed as tools when no allow-list is configured.
pub const DEFAULT_ENDPOINTS: [&str; 6] = [
    "POST /v3/sms/send",
    "GET /v3/search/contacts-lists",
    "POST /v3/sms/price",
    "GET /v3/sms/templates",
    "GET /v3/statistics/sms",
    "GET /v3/sms/history",
];

/// Optional file-based configuration for the ClickSend tool source.
///
/// Every field is optional; unset fields fall back to command-line values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiServerConfig {
    /// `OpenAPI` spec file path.
    #[serde(default)]
    pub spec: Option<String>,

    /// Override the API origin.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Allow-list of `"METHOD /path"` operations to register.
    #[serde(default)]
    pub endpoints: Option<Vec<String>>,
}

impl ApiServerConfig {
    /// Load a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OpenApiToolsError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            OpenApiToolsError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// The configured allow-list, or [`DEFAULT_ENDPOINTS`].
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is not of the form `METHOD /path`.
    pub fn endpoint_selectors(&self) -> Result<Vec<EndpointSelector>> {
        match &self.endpoints {
            Some(list) => list.iter().map(|s| s.parse()).collect(),
            None => Ok(default_endpoints()),
        }
    }
}

/// One `METHOD /path` entry of the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSelector {
    pub method: Method,
    pub path: String,
}

impl FromStr for EndpointSelector {
    type Err = OpenApiToolsError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(method), Some(path), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(OpenApiToolsError::Config(format!(
                "invalid endpoint '{s}': expected 'METHOD /path'"
            )));
        };
        if !path.starts_with('/') {
            return Err(OpenApiToolsError::Config(format!(
                "invalid endpoint '{s}': path must start with '/'"
            )));
        }
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| OpenApiToolsError::Config(format!("invalid endpoint '{s}': {e}")))?;
        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for EndpointSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[must_use]
pub fn default_endpoints() -> Vec<EndpointSelector> {
    DEFAULT_ENDPOINTS
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selector_and_normalizes_method_case() {
        let sel: EndpointSelector = "get /v3/sms/history".parse().unwrap();
        assert_eq!(sel.method, Method::GET);
        assert_eq!(sel.path, "/v3/sms/history");
        assert_eq!(sel.to_string(), "GET /v3/sms/history");
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!("GET".parse::<EndpointSelector>().is_err());
        assert!("GET v3/sms".parse::<EndpointSelector>().is_err());
        assert!("GET /a /b".parse::<EndpointSelector>().is_err());
    }

    #[test]
    fn defaults_cover_all_six_operations() {
        let cfg = ApiServerConfig::default();
        let selectors = cfg.endpoint_selectors().unwrap();
        assert_eq!(selectors.len(), 6);
        assert!(selectors.contains(&EndpointSelector {
            method: Method::POST,
            path: "/v3/sms/send".to_string(),
        }));
    }

    #[test]
    fn yaml_config_overrides_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicksend.yaml");
        std::fs::write(
            &path,
            "baseUrl: http://localhost:9999\nendpoints:\n  - GET /v3/sms/templates\n",
        )
        .unwrap();

        let cfg = ApiServerConfig::load(&path).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:9999"));
        assert!(cfg.spec.is_none());
        let selectors = cfg.endpoint_selectors().unwrap();
        assert_eq!(selectors.len(), 1);
        assert_eq!(selectors[0].path, "/v3/sms/templates");
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let err = serde_yaml::from_str::<ApiServerConfig>("spec: a.yaml\nbogus: 1\n").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
