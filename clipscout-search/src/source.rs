use async_trait::async_trait;
use clipscout_social::tiktok::{FetchError, PageRequest, PageResult, TikTokApi};

/// Something that can produce one page of search results.
///
/// The orchestrator only talks to this seam, so tests and alternate
/// upstreams can stand in for the real API client.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageResult, FetchError>;
}

#[async_trait]
impl PageSource for TikTokApi {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageResult, FetchError> {
        self.search_page(request).await
    }
}
