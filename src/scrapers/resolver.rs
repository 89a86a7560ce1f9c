//! Ordered-fallback field resolution.
//!
//! Site markup drifts between revisions, so a logical field is described as a
//! short list of independent lookup strategies. The resolver tries them in
//! declaration order and keeps the first non-empty normalized text. New
//! strategies get appended; old ones can stay.

use crate::scrapers::text::clean_text;
use crate::scrapers::ScrapeError;
use regex::Regex;
use scraper::{ElementRef, Selector};

/// What a lookup is run against: an element subtree and, for whole-document
/// scans, the raw markup it was parsed from.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub element: ElementRef<'a>,
    pub source: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element, source: None }
    }

    pub fn with_source(element: ElementRef<'a>, source: &'a str) -> Self {
        Self { element, source: Some(source) }
    }

    fn narrowed(&self, element: ElementRef<'a>) -> Self {
        Self { element, source: self.source }
    }
}

/// One lookup rule for a field
pub trait Strategy: Send + Sync {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String>;
}

/// How a matched element is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// All descendant text
    Text,
    /// `href` with its `scheme:` prefix stripped (`mailto:`, `tel:`)
    HrefTarget,
}

impl Read {
    fn read(self, element: ElementRef<'_>) -> Option<String> {
        match self {
            Read::Text => Some(element_text(element)),
            Read::HrefTarget => element
                .value()
                .attr("href")
                .and_then(|href| href.split_once(':'))
                .map(|(_, target)| target.to_string()),
        }
    }
}

/// What to keep once a text node matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTake {
    /// The whole text node
    Node,
    /// The text of the node's parent element
    Parent,
}

/// First element matching a CSS selector
pub struct BySelector {
    selector: Selector,
    read: Read,
}

impl BySelector {
    pub fn new(css: &str, read: Read) -> Result<Self, ScrapeError> {
        Ok(Self { selector: parse_selector(css)?, read })
    }
}

impl Strategy for BySelector {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String> {
        scope.element.select(&self.selector).next().and_then(|el| self.read.read(el))
    }
}

/// First descendant element whose attribute matches a pattern
pub struct ByAttributePattern {
    tag: Option<&'static str>,
    attr: &'static str,
    pattern: Regex,
    read: Read,
}

impl ByAttributePattern {
    pub fn new(tag: Option<&'static str>, attr: &'static str, pattern: &str, read: Read) -> Result<Self, ScrapeError> {
        Ok(Self { tag, attr, pattern: parse_regex(pattern)?, read })
    }
}

impl Strategy for ByAttributePattern {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String> {
        scope
            .element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| {
                let value = el.value();
                self.tag.map_or(true, |tag| value.name() == tag)
                    && value.attr(self.attr).is_some_and(|v| self.pattern.is_match(v))
            })
            .and_then(|el| self.read.read(el))
    }
}

/// First text node matching a pattern
pub struct ByTextPattern {
    pattern: Regex,
    take: TextTake,
}

impl ByTextPattern {
    pub fn new(pattern: &str, take: TextTake) -> Result<Self, ScrapeError> {
        Ok(Self { pattern: parse_regex(pattern)?, take })
    }
}

impl Strategy for ByTextPattern {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String> {
        let (text, parent) = find_text(scope.element, &self.pattern)?;
        match self.take {
            TextTake::Node => Some(text.to_string()),
            TextTake::Parent => parent.map(element_text),
        }
    }
}

/// Narrow the scope to the first element matching `container`, then run `inner`
pub struct WithinScope {
    container: Selector,
    inner: Box<dyn Strategy>,
}

impl WithinScope {
    pub fn new(container: &str, inner: impl Strategy + 'static) -> Result<Self, ScrapeError> {
        Ok(Self { container: parse_selector(container)?, inner: Box::new(inner) })
    }
}

impl Strategy for WithinScope {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String> {
        let container = scope.element.select(&self.container).next()?;
        self.inner.attempt(&scope.narrowed(container))
    }
}

/// Unscoped scan of the raw markup; keeps the last whitespace token of the
/// first match. Falls back to the serialized subtree when no source is attached.
pub struct SourcePattern {
    pattern: Regex,
}

impl SourcePattern {
    pub fn new(pattern: &str) -> Result<Self, ScrapeError> {
        Ok(Self { pattern: parse_regex(pattern)? })
    }
}

impl Strategy for SourcePattern {
    fn attempt(&self, scope: &Scope<'_>) -> Option<String> {
        let serialized;
        let haystack = match scope.source {
            Some(source) => source,
            None => {
                serialized = scope.element.html();
                serialized.as_str()
            }
        };
        let found = self.pattern.find(haystack)?;
        found.as_str().split_whitespace().last().map(str::to_string)
    }
}

/// An ordered list of strategies for one logical field
#[derive(Default)]
pub struct FieldResolver {
    strategies: Vec<Box<dyn Strategy>>,
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// First non-empty normalized result, in declaration order
    pub fn resolve(&self, scope: &Scope<'_>) -> Option<String> {
        self.strategies
            .iter()
            .filter_map(|strategy| strategy.attempt(scope))
            .map(|raw| clean_text(&raw))
            .find(|text| !text.is_empty())
    }
}

/// Descendant text of an element, concatenated as written, then normalized
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// First text node under `root` matching `pattern`, with its parent element.
/// Script and style contents are not considered text.
pub fn find_text<'a>(root: ElementRef<'a>, pattern: &Regex) -> Option<(&'a str, Option<ElementRef<'a>>)> {
    root.descendants().find_map(|node| {
        let text = node.value().as_text()?;
        let parent = node.parent().and_then(ElementRef::wrap);
        if parent.is_some_and(|p| matches!(p.value().name(), "script" | "style")) {
            return None;
        }
        let text: &'a str = text;
        pattern.is_match(text).then_some((text, parent))
    })
}

pub fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
}

fn parse_regex(pattern: &str) -> Result<Regex, ScrapeError> {
    Regex::new(pattern).map_err(|e| ScrapeError::Selector(format!("{pattern}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
          <h1>Bel appartement</h1>
          <div class="card">
            <h2>Studio</h2>
            <p class="CardLocation">Lyon 3ème</p>
            <span data-test="sl-location">Lyon</span>
            <a href="mailto:agence@example.fr">Écrire</a>
          </div>
          <p>Prix : 250 000 €</p>
          <script>var price = "999 €";</script>
        </body></html>
    "#;

    fn resolve(resolver: &FieldResolver) -> Option<String> {
        let doc = Html::parse_document(PAGE);
        resolver.resolve(&Scope::with_source(doc.root_element(), PAGE))
    }

    #[test]
    fn first_matching_strategy_wins() {
        let resolver = FieldResolver::new()
            .then(BySelector::new("h2", Read::Text).unwrap())
            .then(BySelector::new("h1", Read::Text).unwrap());

        assert_eq!(resolve(&resolver).as_deref(), Some("Studio"));

        let reversed = FieldResolver::new()
            .then(BySelector::new("h1", Read::Text).unwrap())
            .then(BySelector::new("h2", Read::Text).unwrap());

        assert_eq!(resolve(&reversed).as_deref(), Some("Bel appartement"));
    }

    #[test]
    fn misses_fall_through_to_later_strategies() {
        let resolver = FieldResolver::new()
            .then(BySelector::new("h5.absent", Read::Text).unwrap())
            .then(ByAttributePattern::new(None, "data-test", ".*location.*", Read::Text).unwrap());

        assert_eq!(resolve(&resolver).as_deref(), Some("Lyon"));
    }

    #[test]
    fn every_strategy_missing_yields_none() {
        let resolver = FieldResolver::new()
            .then(BySelector::new("h5", Read::Text).unwrap())
            .then(ByTextPattern::new("introuvable", TextTake::Node).unwrap());

        assert_eq!(resolve(&resolver), None);
        assert_eq!(resolve(&FieldResolver::new()), None);
    }

    #[test]
    fn class_pattern_respects_tag() {
        let resolver = FieldResolver::new()
            .then(ByAttributePattern::new(Some("p"), "class", "(?i)location", Read::Text).unwrap());

        assert_eq!(resolve(&resolver).as_deref(), Some("Lyon 3ème"));
    }

    #[test]
    fn text_pattern_skips_scripts() {
        let resolver = FieldResolver::new().then(ByTextPattern::new(r"\d[\d\s]*€", TextTake::Node).unwrap());

        assert_eq!(resolve(&resolver).as_deref(), Some("Prix : 250 000 €"));
    }

    #[test]
    fn href_target_strips_scheme() {
        let resolver = FieldResolver::new()
            .then(WithinScope::new("div.card", ByAttributePattern::new(Some("a"), "href", "(?i)mailto:", Read::HrefTarget).unwrap()).unwrap());

        assert_eq!(resolve(&resolver).as_deref(), Some("agence@example.fr"));
    }

    #[test]
    fn within_scope_misses_when_container_absent() {
        let resolver = FieldResolver::new().then(WithinScope::new("div.agency", BySelector::new("h2", Read::Text).unwrap()).unwrap());

        assert_eq!(resolve(&resolver), None);
    }

    #[test]
    fn source_pattern_keeps_last_token_of_first_match() {
        let resolver = FieldResolver::new().then(SourcePattern::new(r"(Construction\s+en\s+)?(19|20)\d{2}").unwrap());
        let html = "<p>Construction en 1975</p><p>Rénové en 2019</p>";
        let doc = Html::parse_document(html);

        assert_eq!(resolver.resolve(&Scope::with_source(doc.root_element(), html)).as_deref(), Some("1975"));
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        let html = r#"<div><h2>Studio 20 m<sup>2</sup> <b>Bas</b>tille</h2></div>"#;
        let doc = Html::parse_document(html);
        let resolver = FieldResolver::new().then(BySelector::new("h2", Read::Text).unwrap());

        assert_eq!(resolver.resolve(&Scope::new(doc.root_element())).as_deref(), Some("Studio 20 m2 Bastille"));
    }

    #[test]
    fn blank_results_do_not_count_as_matches() {
        let html = r#"<div><h2>   </h2><h3>Maison</h3></div>"#;
        let doc = Html::parse_document(html);
        let resolver = FieldResolver::new()
            .then(BySelector::new("h2", Read::Text).unwrap())
            .then(BySelector::new("h3", Read::Text).unwrap());

        assert_eq!(resolver.resolve(&Scope::new(doc.root_element())).as_deref(), Some("Maison"));
    }
}
