//! Request execution against the remote API.
//!
//! [`ApiTransport`] is the seam between the translator and the network: the translator builds a
//! [`RequestDescriptor`], the transport performs it and hands back the parsed JSON body. The
//! production implementation is [`HttpTransport`] (reqwest); tests substitute their own.

use crate::config::TransportConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    /// Non-success status; `message` is the server-reported message or the raw body.
    #[error("API error: {message}")]
    Status { status: u16, message: String },
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("Failed to parse response: {0}")]
    ResponseParse(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path plus encoded query string, e.g. `/v3/sms/history?page=2`.
    pub path: String,
    pub body: Option<Value>,
}

/// Executes [`RequestDescriptor`]s.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Perform the request and return the parsed JSON response body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on a non-success status, or when a success body is
    /// not JSON.
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value>;
}

/// reqwest-backed [`ApiTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: TransportConfig,
    client: Client,
}

impl HttpTransport {
    /// Build a transport from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL or the client cannot be
    /// built.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            HttpToolsError::Config(format!("Invalid baseUrl '{}': {e}", config.base_url))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(HttpToolsError::Config(format!(
                "Invalid baseUrl '{}': expected an http(s) URL",
                config.base_url
            )));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HttpToolsError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        Url::parse(&url).map_err(|e| HttpToolsError::Config(format!("Invalid URL: {e}")))
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value> {
        let url = self.url_for(&request.path)?;
        debug!(
            method = %request.method,
            url = %redact_url(&url),
            has_body = request.body.is_some(),
            "sending upstream request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(creds) = &self.config.credentials {
            builder = builder.basic_auth(&creds.username, Some(&creds.api_key));
        }
        if let Some(body) = &request.body
            && request.method != Method::GET
        {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "upstream response");

        interpret_response(status, &text)
    }
}

/// Map a status + body pair onto the transport contract.
///
/// # Errors
///
/// Returns [`HttpToolsError::Status`] for non-success codes and [`HttpToolsError::ResponseParse`]
/// when a success body is not JSON.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) if status.is_success() => Ok(value),
        Ok(value) => {
            let message = value
                .get("message")
                .or_else(|| value.get("response_msg"))
                .and_then(Value::as_str)
                .map_or_else(|| body.to_string(), str::to_string);
            Err(HttpToolsError::Status {
                status: status.as_u16(),
                message,
            })
        }
        Err(e) if status.is_success() => Err(HttpToolsError::ResponseParse(e.to_string())),
        Err(_) => Err(HttpToolsError::Status {
            status: status.as_u16(),
            message: body.to_string(),
        }),
    }
}

/// Strip credentials, query and fragment from a URL before it is logged or surfaced.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
