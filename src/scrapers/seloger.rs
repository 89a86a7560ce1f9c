use crate::models::ListingRecord;
use crate::scrapers::detail::DetailExtractor;
use crate::scrapers::enrich::EnrichmentOrchestrator;
use crate::scrapers::summary::SummaryExtractor;
use crate::scrapers::traits::{fetch_with_timeout, PageFetcher};
use crate::scrapers::types::SiteConfig;
use crate::scrapers::ScrapeError;
use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Search-page scraper with optional per-listing enrichment
pub struct SeLogerScraper {
    fetcher: Arc<dyn PageFetcher>,
    summaries: SummaryExtractor,
    orchestrator: EnrichmentOrchestrator,
    max_workers: usize,
    timeout: Duration,
}

impl SeLogerScraper {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        site: SiteConfig,
        max_workers: usize,
        timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let summaries = SummaryExtractor::new(site.clone())?;
        let details = Arc::new(DetailExtractor::new(site)?);
        let orchestrator = EnrichmentOrchestrator::new(Arc::clone(&fetcher), details);

        Ok(Self { fetcher, summaries, orchestrator, max_workers, timeout })
    }

    /// Fetch the search page, extract its cards and optionally deep scrape each one.
    /// Only a failure to fetch the search page itself is returned as an error.
    pub async fn scrape(
        &self,
        start_url: &str,
        deep_scrape: bool,
        limit: Option<usize>,
    ) -> Result<Vec<ListingRecord>, ScrapeError> {
        debug!("Fetching search results from {}", start_url);
        let html = fetch_with_timeout(self.fetcher.as_ref(), start_url, self.timeout).await?;

        let summaries = self.summaries.extract(&html, limit);
        info!("Parsed {} listing summaries", summaries.len());

        if !deep_scrape {
            let now = Utc::now().trunc_subsecs(0);
            return Ok(summaries
                .into_iter()
                .map(|summary| ListingRecord::from_summary(summary, now))
                .collect());
        }

        Ok(self.orchestrator.enrich(summaries, self.max_workers, self.timeout).await)
    }
}
