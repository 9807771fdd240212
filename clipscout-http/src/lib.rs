//! Minimal JSON-over-HTTP client with safe logging and header auth.
//!
//! - Request options: headers, [`HeaderAuth`], query params, timeout
//! - Sensitive query params and auth headers are never logged
//! - Error bodies are mined for a human message (`{"error":{"message"}}`,
//!   `{"errors":[..]}`, `{"message"}`, `{"detail"}`, `{"error"}`)
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), clipscout_http::HttpError> {
//! let client = clipscout_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", clipscout_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response status and final errors, sharing one `req_id` per request. Logs
//! only say whether an auth header was attached, never its value.

use clipscout_common::snippet;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;

const BODY_SNIPPET_MAX: usize = 500;

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Api`], `None` for transport-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Credential carried in a custom header such as `x-api-key`.
///
/// ```
/// use clipscout_http::HeaderAuth;
/// use reqwest::header::{HeaderName, HeaderValue};
///
/// let auth = HeaderAuth {
///     name: HeaderName::from_static("x-api-key"),
///     value: HeaderValue::from_static("secret"),
/// };
/// assert_eq!(auth.name.as_str(), "x-api-key");
/// ```
#[derive(Clone, Debug)]
pub struct HeaderAuth {
    pub name: HeaderName,
    pub value: HeaderValue,
}

/// Per-request tuning knobs.
///
/// ```
/// use clipscout_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     query: Some(vec![("query", "cats".into())]),
///     ..Default::default()
/// };
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<HeaderAuth>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A trailing `/` is appended when missing so relative paths extend the
    /// base instead of replacing its last segment.
    ///
    /// ```
    /// use clipscout_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/base")?;
    /// assert_eq!(client.base().as_str(), "https://api.example.com/base/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut raw = base.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Override the default request timeout.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET JSON with per-request options. One attempt; failures are returned
    /// to the caller as-is.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let query: Vec<(&str, &str)> = opts
            .query
            .iter()
            .flatten()
            .map(|(k, v)| (*k, v.as_ref()))
            .collect();

        let logged_query = redact_pairs(&query);
        let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let mut rb = self.inner.get(url).timeout(timeout);
        if !query.is_empty() {
            rb = rb.query(&query);
        }
        if let Some(hdrs) = opts.headers {
            rb = rb.headers(hdrs);
        }
        let authenticated = opts.auth.is_some();
        if let Some(HeaderAuth { name, value }) = opts.auth {
            rb = rb.header(name, value);
        }

        tracing::debug!(
            req_id = %req_id,
            host_path = %host_path,
            query = ?logged_query,
            timeout_ms = timeout.as_millis() as u64,
            authenticated,
            "http.request.start"
        );

        let started = Instant::now();
        let sent = match rb.send().await {
            Ok(resp) => {
                let status = resp.status();
                let headers = resp.headers().clone();
                resp.bytes().await.map(|body| (status, headers, body))
            }
            Err(err) => Err(err),
        };

        let (status, headers, body) = match sent {
            Ok(parts) => parts,
            Err(err) => {
                let timed_out = err.is_timeout();
                let message = err.to_string();
                tracing::warn!(
                    req_id = %req_id,
                    timed_out,
                    message = %message,
                    "http.network_error"
                );
                return Err(if timed_out {
                    HttpError::Timeout(timeout)
                } else {
                    HttpError::Network(message)
                });
            }
        };

        let request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let body_snippet = snip_body(&body);

        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = body.len(),
            x_request_id = %request_id,
            "http.response"
        );
        tracing::trace!(req_id = %req_id, body_snippet = %body_snippet, "http.response.body_snippet");

        if status.is_success() {
            return serde_json::from_slice::<T>(&body).map_err(|e| {
                tracing::warn!(
                    req_id = %req_id,
                    serde_line = e.line(),
                    serde_col = e.column(),
                    serde_err = %e,
                    body_snippet = %body_snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), body_snippet)
            });
        }

        let message = extract_error_message(&body);
        tracing::warn!(
            req_id = %req_id,
            %status,
            message = %message,
            x_request_id = %request_id,
            body_snippet = %body_snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }
}

// ==============================
// Helpers
// ==============================

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "apikey"
            | "x-api-key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
            | "password"
    )
}

fn redact_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            let value = if is_secret_param(k) {
                "<redacted>".to_string()
            } else {
                snippet(v, 160)
            };
            ((*k).to_string(), value)
        })
        .collect()
}

fn extract_error_message(body: &[u8]) -> String {
    // {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }

    // {"errors":[{"message":"...", "detail":"...", "title":"..."}]}
    #[derive(Deserialize)]
    struct ErrorList {
        errors: Vec<ListItem>,
    }
    #[derive(Deserialize)]
    struct ListItem {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    // {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    fn first_non_empty(candidates: [String; 3]) -> Option<String> {
        candidates.into_iter().find(|s| !s.is_empty())
    }

    if let Ok(env) = serde_json::from_slice::<Nested>(body) {
        return env.error.message;
    }
    if let Ok(list) = serde_json::from_slice::<ErrorList>(body) {
        if let Some(found) = list
            .errors
            .into_iter()
            .next()
            .and_then(|e| first_non_empty([e.message, e.detail, e.title]))
        {
            return found;
        }
    }
    if let Ok(flat) = serde_json::from_slice::<Flat>(body) {
        if let Some(found) = first_non_empty([flat.message, flat.detail, flat.error]) {
            return found;
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    snippet(&String::from_utf8_lossy(body), BODY_SNIPPET_MAX)
}
