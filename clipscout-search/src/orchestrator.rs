//! Concurrent page fan-out and reduction.
//!
//! Every run requests the same fixed offsets at once, waits for all of them,
//! then folds the successful pages in offset order: first occurrence of an id
//! wins, and each kept item is tested against the resolved date window.

use crate::error::SearchError;
use crate::source::PageSource;
use crate::window::{DateWindow, PublishTime};
use clipscout_common::{MAX_PAGES_LIMIT, snippet};
use clipscout_social::tiktok::{FetchError, PageRequest, PageResult, VideoItem};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_SORT_BY: &str = "most-liked";

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Upstream credential; a run without one fails before any request.
    pub api_key: Option<String>,
    /// Distance between consecutive offsets.
    pub page_size: u32,
    pub max_pages: usize,
    /// Upper bound on each page call, independent of the HTTP client's own.
    pub page_timeout: Option<Duration>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            page_size: 30,
            max_pages: 5,
            page_timeout: Some(Duration::from_secs(20)),
        }
    }
}

impl SearchSettings {
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Offsets requested by every run, in reduction order.
    ///
    /// ```
    /// use clipscout_search::SearchSettings;
    ///
    /// assert_eq!(SearchSettings::default().offsets(), vec![0, 30, 60, 90, 120]);
    /// ```
    pub fn offsets(&self) -> Vec<u32> {
        (0..self.max_pages as u32)
            .map(|i| i.saturating_mul(self.page_size))
            .collect()
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.page_size == 0 {
            return Err(SearchError::InvalidSettings(
                "page_size must be positive".into(),
            ));
        }
        if self.max_pages == 0 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(SearchError::InvalidSettings(format!(
                "max_pages must be between 1 and {MAX_PAGES_LIMIT}, got {}",
                self.max_pages
            )));
        }
        if self.page_timeout.is_some_and(|t| t.is_zero()) {
            return Err(SearchError::InvalidSettings(
                "page_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub publish_time: PublishTime,
    pub sort_by: String,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            publish_time: PublishTime::default(),
            sort_by: DEFAULT_SORT_BY.to_string(),
        }
    }

    pub fn with_publish_time(mut self, publish_time: impl Into<PublishTime>) -> Self {
        self.publish_time = publish_time.into();
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }
}

/// What became of one requested offset.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Fetched { offset: u32, page: PageResult },
    Failed { offset: u32, reason: String },
}

impl PageOutcome {
    pub fn offset(&self) -> u32 {
        match self {
            PageOutcome::Fetched { offset, .. } | PageOutcome::Failed { offset, .. } => *offset,
        }
    }
}

/// Result of one run.
///
/// `items.len() + filtered_out == total_checked` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Quota reported by the last successful page in offset order; 0 when
    /// no page succeeded.
    pub credits_remaining: u64,
    pub items: Vec<VideoItem>,
    pub pages_fetched: usize,
    /// Distinct ids seen across successful pages.
    #[serde(rename = "total_videos_checked")]
    pub total_checked: usize,
    pub filtered_out: usize,
}

pub struct SearchOrchestrator {
    source: Arc<dyn PageSource>,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(source: Arc<dyn PageSource>, settings: SearchSettings) -> Result<Self, SearchError> {
        settings.validate()?;
        Ok(Self { source, settings })
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Run a search with the window resolved from the local clock.
    pub async fn run(&self, request: &SearchRequest) -> Result<AggregatedResult, SearchError> {
        let window = DateWindow::resolve(&request.publish_time);
        self.run_within(request, window).await
    }

    /// Run a search against an already resolved window.
    ///
    /// Fails only on an empty query or a missing credential; page failures
    /// shrink the result instead. All pages failing is still `Ok`.
    pub async fn run_within(
        &self,
        request: &SearchRequest,
        window: DateWindow,
    ) -> Result<AggregatedResult, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let api_key = self
            .settings
            .credential()
            .ok_or(SearchError::MissingCredential)?;

        let query_snippet = snippet(query, 160);
        let started = Instant::now();
        let base = PageRequest {
            api_key,
            query,
            publish_time: request.publish_time.as_str(),
            sort_by: &request.sort_by,
            cursor: None,
        };
        let outcomes = self.fetch_pages(base).await;
        let requested = outcomes.len();
        let result = aggregate(outcomes, &request.publish_time, &window);

        tracing::info!(
            target: "search.orchestrator",
            query = %query_snippet,
            publish_time = %request.publish_time,
            sort_by = %request.sort_by,
            pages_requested = requested,
            pages_fetched = result.pages_fetched,
            total_checked = result.total_checked,
            filtered_out = result.filtered_out,
            returned = result.items.len(),
            credits_remaining = result.credits_remaining,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search.completed"
        );
        Ok(result)
    }

    async fn fetch_pages(&self, base: PageRequest<'_>) -> Vec<PageOutcome> {
        let fetches = self.settings.offsets().into_iter().map(|offset| {
            let request = PageRequest {
                cursor: (offset != 0).then_some(offset),
                ..base
            };
            async move { self.fetch_one(offset, request).await }
        });
        join_all(fetches).await
    }

    async fn fetch_one(&self, offset: u32, request: PageRequest<'_>) -> PageOutcome {
        let fetched = match self.settings.page_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.source.fetch_page(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(limit)),
                }
            }
            None => self.source.fetch_page(&request).await,
        };

        match fetched {
            Ok(page) => {
                tracing::debug!(
                    target: "search.orchestrator",
                    offset,
                    items = page.items.len(),
                    "search.page.ok"
                );
                PageOutcome::Fetched { offset, page }
            }
            Err(err) => {
                tracing::warn!(
                    target: "search.orchestrator",
                    offset,
                    error = %err,
                    "search.page.failed"
                );
                PageOutcome::Failed {
                    offset,
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Fold page outcomes into one result.
///
/// Outcomes are reduced in ascending offset order no matter how they were
/// collected. Within that order the first copy of an id is the one kept and
/// judged; later copies are skipped without touching any counter.
pub fn aggregate(
    mut outcomes: Vec<PageOutcome>,
    filter: &PublishTime,
    window: &DateWindow,
) -> AggregatedResult {
    outcomes.sort_by_key(PageOutcome::offset);

    let mut result = AggregatedResult::default();
    let mut seen: HashSet<String> = HashSet::new();
    for outcome in outcomes {
        let PageOutcome::Fetched { page, .. } = outcome else {
            continue;
        };
        result.pages_fetched += 1;
        result.credits_remaining = page.credits_remaining;

        for item in page.items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            result.total_checked += 1;
            if window.admits(filter, &item) {
                result.items.push(item);
            } else {
                result.filtered_out += 1;
            }
        }
    }
    result
}
