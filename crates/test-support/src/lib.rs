use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse as _, Response};
use axum::routing::any;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::process::Child;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// One request as seen by [`MockApi`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Parsed JSON body; `None` when the request had no body.
    pub body: Option<Value>,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
}

/// A local stand-in for the ClickSend REST API.
///
/// Every request is recorded and answered with a ClickSend-shaped success envelope echoing the
/// request back under `data`. A few fixed paths simulate upstream failures.
pub struct MockApi {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockApi {
    /// Answers 403 with `{"message": "Invalid credentials"}`.
    pub const FORBIDDEN_PATH: &'static str = "/v3/errors/forbidden";
    /// Answers 500 with a plain-text body.
    pub const PLAIN_ERROR_PATH: &'static str = "/v3/errors/plain";
    /// Answers 200 with a body that is not JSON.
    pub const GARBAGE_PATH: &'static str = "/v3/errors/garbage";

    /// Bind an ephemeral localhost port and start serving in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/{*path}", any(handle))
            .with_state(requests.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock api")?;
        let addr = listener.local_addr().context("mock api local_addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move {
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            requests,
            shutdown: Some(shutdown_tx),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(requests): State<Arc<Mutex<Vec<RecordedRequest>>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let parsed_body = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<Value>(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())),
        )
    };

    let recorded = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: parsed_body,
        authorization: header_str(header::AUTHORIZATION),
        user_agent: header_str(header::USER_AGENT),
    };
    requests.lock().push(recorded.clone());

    match uri.path() {
        MockApi::FORBIDDEN_PATH => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({"http_code": 403, "message": "Invalid credentials"})),
        )
            .into_response(),
        MockApi::PLAIN_ERROR_PATH => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        MockApi::GARBAGE_PATH => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => axum::Json(json!({
            "http_code": 200,
            "response_code": "SUCCESS",
            "response_msg": "Here are your results.",
            "data": {
                "method": recorded.method,
                "path": recorded.path,
                "query": recorded.query,
                "body": recorded.body,
            }
        }))
        .into_response(),
    }
}
