use crate::models::{ListingRecord, ListingSummary};
use crate::scrapers::detail::DetailExtractor;
use crate::scrapers::traits::{fetch_with_timeout, PageFetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Fetches and parses detail pages with bounded parallelism.
///
/// A failed fetch drops that one listing: no retry, no batch abort. Records
/// come back in completion order, not input order.
pub struct EnrichmentOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<DetailExtractor>,
}

impl EnrichmentOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Arc<DetailExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    pub async fn enrich(
        &self,
        summaries: Vec<ListingSummary>,
        concurrency: usize,
        fetch_timeout: Duration,
    ) -> Vec<ListingRecord> {
        let workers = concurrency.max(1);
        let total = summaries.len();
        let semaphore = Arc::new(Semaphore::new(workers));

        info!("Deep scraping {} listings with {} workers via {}", total, workers, self.fetcher.backend_name());

        let mut tasks = JoinSet::new();
        for summary in summaries {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let url = summary.url.clone();

                match fetch_with_timeout(fetcher.as_ref(), &url, fetch_timeout).await {
                    Ok(html) => Some(extractor.extract(&html, summary)),
                    Err(e) => {
                        warn!("Failed to deep-scrape {}: {}", url, e);
                        None
                    }
                }
            });
        }

        let mut records = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(record)) => {
                    debug!("Enriched {}", record.url);
                    records.push(record);
                }
                Ok(None) => {}
                Err(e) => warn!("Enrichment task aborted: {}", e),
            }
        }

        info!("Enriched {}/{} listings", records.len(), total);
        records
    }
}
