//! Thin wrapper around the ScrapeCreators TikTok search endpoint.
//!
//! One call = one page. The credential travels in the `x-api-key` header and
//! is never logged. Each page gets exactly one attempt; a failed page is
//! dropped by the caller.
use crate::tiktok::types::{PageResult, SearchPageResponse};
use clipscout_common::snippet;
use clipscout_http::{HeaderAuth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use std::borrow::Cow;
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "x-api-key";

/// Why a single page could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("page request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed upstream body: {0}")]
    Decode(String),
    #[error("could not build request: {0}")]
    Build(String),
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status, message, ..
            } => FetchError::Status {
                status: status.as_u16(),
                message,
            },
            HttpError::Network(msg) => FetchError::Transport(msg),
            HttpError::Timeout(after) => FetchError::Timeout(after),
            HttpError::Decode(msg, _) => FetchError::Decode(msg),
            HttpError::Url(msg) | HttpError::Build(msg) => FetchError::Build(msg),
        }
    }
}

/// Parameters of one upstream page request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub api_key: &'a str,
    pub query: &'a str,
    /// Raw publish-time filter string, forwarded verbatim.
    pub publish_time: &'a str,
    pub sort_by: &'a str,
    /// `None` requests the first page; the parameter is then omitted entirely.
    pub cursor: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct TikTokApi {
    http: HttpClient,
    region: String,
}

impl TikTokApi {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.scrapecreators.com";
    pub const SEARCH_PATH: &'static str = "v1/tiktok/search/top";

    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let http = HttpClient::new(base_url)?;
        Ok(Self {
            http,
            region: "US".to_string(),
        })
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Fetch and normalize one page of search results.
    pub async fn search_page(&self, req: &PageRequest<'_>) -> Result<PageResult, FetchError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("query", req.query.into()),
            ("publish_time", req.publish_time.into()),
            ("sort_by", req.sort_by.into()),
            ("region", self.region.as_str().into()),
        ];
        if let Some(cursor) = req.cursor {
            params.push(("cursor", cursor.to_string().into()));
        }

        let key = HeaderValue::from_str(req.api_key.trim())
            .map_err(|e| FetchError::Build(format!("invalid api key header: {e}")))?;

        let query_snippet = snippet(req.query, 160);
        let started = Instant::now();
        let resp: SearchPageResponse = match self
            .http
            .get_json(
                Self::SEARCH_PATH,
                RequestOpts {
                    auth: Some(HeaderAuth {
                        name: HeaderName::from_static(API_KEY_HEADER),
                        value: key,
                    }),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(
                    target: "social.tiktok",
                    query = %query_snippet,
                    cursor = ?req.cursor,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "tiktok.search_page.error"
                );
                return Err(e.into());
            }
        };

        let page = PageResult::from(resp);
        tracing::debug!(
            target: "social.tiktok",
            query = %query_snippet,
            cursor = ?req.cursor,
            items = page.items.len(),
            has_more = page.has_more,
            credits_remaining = page.credits_remaining,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tiktok.search_page.ok"
        );
        Ok(page)
    }
}
