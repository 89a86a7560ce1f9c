use crate::scrapers::traits::PageFetcher;
use crate::scrapers::ScrapeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

/// Plain HTTP fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("GET {}", url);

        let request_error = |source: reqwest::Error| ScrapeError::Request { url: url.to_string(), source };

        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { url: url.to_string(), status });
        }

        let html = response.text().await.map_err(request_error)?;
        debug!("Downloaded {} bytes from {}", html.len(), url);

        Ok(html)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Headless Chrome fetcher for pages that only render client side.
///
/// A render abandoned by a timed-out caller keeps running on the blocking pool
/// and keeps its tab slot until it finishes, so open tabs never exceed `max_tabs`.
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    tabs: Arc<Semaphore>,
}

impl BrowserFetcher {
    pub fn new(max_tabs: usize) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser: Arc::new(browser), tabs: Arc::new(Semaphore::new(max_tabs.max(1))) })
    }

    fn render(browser: &Browser, url: &str) -> Result<String> {
        let tab = browser.new_tab()?;
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;
        let html = tab.get_content()?;
        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {:#}", url, e);
        }
        Ok(html)
    }
}

/// Run `work` on the blocking pool while holding a permit from `slots`.
/// The permit is released when `work` returns, not when the caller stops waiting.
async fn run_in_slot<T, F>(slots: &Arc<Semaphore>, work: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let permit = Arc::clone(slots).acquire_owned().await.map_err(|e| e.to_string())?;

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        work()
    })
    .await
    .map_err(|e| e.to_string())
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Rendering {} in headless Chrome", url);

        let browser = Arc::clone(&self.browser);
        let target = url.to_string();
        let rendered = run_in_slot(&self.tabs, move || Self::render(&browser, &target)).await;

        match rendered {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(ScrapeError::Browser { url: url.to_string(), message: format!("{e:#}") }),
            Err(message) => Err(ScrapeError::Browser { url: url.to_string(), message }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "browser"
    }
}
