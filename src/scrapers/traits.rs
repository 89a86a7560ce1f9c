use crate::scrapers::ScrapeError;
use async_trait::async_trait;
use std::time::Duration;

/// Retrieves one document as text.
/// Implemented over plain HTTP and over a headless browser; tests plug in fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its markup
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// Get the name of the fetch backend
    fn backend_name(&self) -> &'static str;
}

/// Fetch bounded by `timeout`, whatever the backend's own limits are
pub(crate) async fn fetch_with_timeout(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<String, ScrapeError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout { url: url.to_string(), timeout }),
    }
}
