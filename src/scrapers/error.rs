use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by fetching and by static extractor setup.
///
/// Missing markup is never an error: fields resolve to `None` instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("browser failed on {url}: {message}")]
    Browser { url: String, message: String },

    #[error("card link {url:?} is not an absolute URL: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid lookup pattern {0}")]
    Selector(String),
}
