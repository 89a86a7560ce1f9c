pub mod detail;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod resolver;
pub mod seloger;
pub mod summary;
pub mod text;
pub mod traits;
pub mod types;

pub use error::ScrapeError;
pub use fetch::{BrowserFetcher, HttpFetcher};
pub use seloger::SeLogerScraper;
pub use traits::PageFetcher;
pub use types::SiteConfig;
