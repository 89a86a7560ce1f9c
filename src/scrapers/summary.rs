use crate::models::ListingSummary;
use crate::scrapers::resolver::{
    parse_selector, ByAttributePattern, BySelector, ByTextPattern, FieldResolver, Read, Scope, TextTake,
};
use crate::scrapers::text::extract_price;
use crate::scrapers::types::SiteConfig;
use crate::scrapers::ScrapeError;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Card containers, oldest layout first. Only the first selector with hits is used.
const CARD_SELECTORS: &[&str] = &[
    "div.c-pa-list",
    "div.ListingCell",
    "article[data-test='sl-card-result']",
];

pub const DEFAULT_TITLE: &str = "Property listing";

/// Money amount followed by the euro sign
pub(crate) const PRICE_PATTERN: &str = r"\d[\d\s]*€";

/// Parses a search-results page into listing summaries
pub struct SummaryExtractor {
    site: SiteConfig,
    cards: Vec<(&'static str, Selector)>,
    link: Selector,
    images: Selector,
    title: FieldResolver,
    location: FieldResolver,
    price: FieldResolver,
}

impl SummaryExtractor {
    pub fn new(site: SiteConfig) -> Result<Self, ScrapeError> {
        let cards = CARD_SELECTORS
            .iter()
            .map(|css| parse_selector(css).map(|sel| (*css, sel)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            site,
            cards,
            link: parse_selector("a[href]")?,
            images: parse_selector("img")?,
            // Heading or title link, whichever comes first in the card
            title: FieldResolver::new()
                .then(BySelector::new("h2, h3, h4, a[data-test='sl-card-title']", Read::Text)?)
                .then(BySelector::new("h2, h3, h4", Read::Text)?),
            location: FieldResolver::new()
                .then(ByAttributePattern::new(None, "data-test", ".*location.*", Read::Text)?)
                .then(ByAttributePattern::new(Some("p"), "class", "(?i)Location", Read::Text)?),
            price: FieldResolver::new().then(ByTextPattern::new(PRICE_PATTERN, TextTake::Node)?),
        })
    }

    /// Summaries in document order, truncated to `limit` when given.
    /// Returns an empty list when no card layout matches.
    pub fn extract(&self, html: &str, limit: Option<usize>) -> Vec<ListingSummary> {
        let document = Html::parse_document(html);

        let Some((css, cards)) = self
            .cards
            .iter()
            .map(|(css, selector)| (css, document.select(selector).collect::<Vec<_>>()))
            .find(|(_, cards)| !cards.is_empty())
        else {
            warn!("No listing cards found; selectors may be outdated");
            return Vec::new();
        };

        debug!("Found {} cards with selector '{}'", cards.len(), css);

        let mut summaries = Vec::new();
        for (idx, card) in cards.into_iter().enumerate() {
            match self.parse_card(card) {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => debug!("Skipping card {} without URL", idx),
                Err(e) => debug!("Failed to parse card {}: {}", idx, e),
            }
        }

        if let Some(limit) = limit {
            summaries.truncate(limit);
        }

        summaries
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Result<Option<ListingSummary>, ScrapeError> {
        let href = card
            .select(&self.link)
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .unwrap_or("");

        if href.is_empty() {
            return Ok(None);
        }

        let url = self.site.absolutize(href);
        Url::parse(&url).map_err(|source| ScrapeError::InvalidUrl { url: url.clone(), source })?;

        let scope = Scope::new(card);
        let title = self.title.resolve(&scope).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let location = self.location.resolve(&scope);
        let price = self.price.resolve(&scope).and_then(|text| extract_price(&text));

        let mut photos = Vec::new();
        collect_photos(card, &self.images, &self.site, &mut photos);

        Ok(Some(ListingSummary { title, url, location, price, photos }))
    }
}

/// Append every on-site image source under `root` not already in `photos`.
/// `data-src` wins over `src` for lazy-loaded images.
pub(crate) fn collect_photos(root: ElementRef<'_>, images: &Selector, site: &SiteConfig, photos: &mut Vec<String>) {
    for img in root.select(images) {
        let attrs = img.value();
        let src = attrs
            .attr("data-src")
            .filter(|s| !s.is_empty())
            .or_else(|| attrs.attr("src"));

        if let Some(src) = src {
            if site.owns_photo(src) && !photos.iter().any(|p| p == src) {
                photos.push(src.to_string());
            }
        }
    }
}
