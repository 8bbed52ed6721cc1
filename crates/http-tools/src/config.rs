use serde::{Deserialize, Serialize};

/// Default ClickSend REST API origin.
pub const DEFAULT_BASE_URL: &str = "https://rest.clicksend.com";

/// `User-Agent` sent on every outbound request.
pub const DEFAULT_USER_AGENT: &str = concat!("clicksend-mcp-server/", env!("CARGO_PKG_VERSION"));

/// Settings for the outbound HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// API origin; request paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP basic credentials. Requests go out unauthenticated when unset.
    #[serde(default)]
    pub credentials: Option<Credentials>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials: None,
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    /// Config pointing at `base_url`, no credentials.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_api_key() {
        let creds = Credentials {
            username: "alice".to_string(),
            api_key: "s3cr3t".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: TransportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.credentials.is_none());
        assert!(cfg.user_agent.starts_with("clicksend-mcp-server/"));
    }
}
