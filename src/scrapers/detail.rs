use crate::models::{ListingRecord, ListingSummary};
use crate::scrapers::resolver::{
    find_text, parse_selector, ByAttributePattern, BySelector, ByTextPattern, FieldResolver, Read, Scope,
    SourcePattern, TextTake,
};
use crate::scrapers::summary::{collect_photos, PRICE_PATTERN};
use crate::scrapers::text::{clean_text, extract_price};
use crate::scrapers::types::SiteConfig;
use crate::scrapers::ScrapeError;
use chrono::{SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Agency/contact containers, tried in order; only the first present one is searched
const AGENCY_SELECTORS: &[&str] = &[
    "div[data-test='sl-contact-info']",
    "div.AgencyCard",
    "div[data-test='agency-card']",
];

static TRANSPORT_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Transport|Métro|Bus").unwrap());

/// Parses a listing page into a full record, falling back to the summary's values
pub struct DetailExtractor {
    site: SiteConfig,
    agencies: Vec<Selector>,
    images: Selector,
    title: FieldResolver,
    description: FieldResolver,
    price: FieldResolver,
    location: FieldResolver,
    energy: FieldResolver,
    construction: FieldResolver,
    agency_name: FieldResolver,
    agency_phone: FieldResolver,
    agency_email: FieldResolver,
    page_phone: FieldResolver,
    page_email: FieldResolver,
}

impl DetailExtractor {
    pub fn new(site: SiteConfig) -> Result<Self, ScrapeError> {
        let agencies = AGENCY_SELECTORS
            .iter()
            .map(|css| parse_selector(css))
            .collect::<Result<Vec<_>, _>>()?;

        let mailto = || ByAttributePattern::new(Some("a"), "href", "(?i)mailto:", Read::HrefTarget);

        Ok(Self {
            site,
            agencies,
            images: parse_selector("img")?,
            title: FieldResolver::new().then(BySelector::new("h1", Read::Text)?),
            description: FieldResolver::new()
                .then(BySelector::new("[data-test='sl-price-description']", Read::Text)?)
                .then(BySelector::new("div.Description", Read::Text)?)
                .then(BySelector::new("section[data-test='sl-description']", Read::Text)?)
                .then(BySelector::new("div.c-pa-list-details__text", Read::Text)?),
            price: FieldResolver::new().then(ByTextPattern::new(PRICE_PATTERN, TextTake::Node)?),
            location: FieldResolver::new()
                .then(ByAttributePattern::new(None, "data-test", ".*location.*", Read::Text)?)
                .then(ByAttributePattern::new(Some("p"), "class", "(?i)Localisation|Adresse", Read::Text)?),
            energy: FieldResolver::new()
                .then(ByTextPattern::new(r"(?i)Classe\s+[A-G]", TextTake::Node)?)
                .then(ByTextPattern::new(r"(?i)diagnostic de performance énergétique", TextTake::Parent)?),
            // Whole-document scan: any 19xx/20xx token can match
            construction: FieldResolver::new().then(SourcePattern::new(r"(Construction\s+en\s+)?(19|20)\d{2}")?),
            agency_name: FieldResolver::new().then(BySelector::new("h2, h3", Read::Text)?),
            agency_phone: FieldResolver::new().then(ByTextPattern::new(r"\+?\d[\d\s]{6,}", TextTake::Node)?),
            agency_email: FieldResolver::new().then(mailto()?),
            page_phone: FieldResolver::new()
                .then(ByAttributePattern::new(Some("a"), "href", "(?i)tel:", Read::HrefTarget)?),
            page_email: FieldResolver::new().then(mailto()?),
        })
    }

    /// Build the full record for `summary` from its detail page markup.
    /// Every field resolves independently; misses fall back or stay empty.
    pub fn extract(&self, html: &str, summary: ListingSummary) -> ListingRecord {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let page = Scope::with_source(root, html);

        let title = self.title.resolve(&page).unwrap_or(summary.title);
        let description = self.description.resolve(&page).unwrap_or_default();
        let price = self
            .price
            .resolve(&page)
            .and_then(|text| extract_price(&text))
            .or(summary.price);
        let location = self.location.resolve(&page).or(summary.location);
        let energy_info = self.energy.resolve(&page);
        let construction_date = self.construction.resolve(&page);

        let agency = self
            .agencies
            .iter()
            .find_map(|selector| root.select(selector).next())
            .map(Scope::new);
        if agency.is_none() {
            debug!("No agency card on {}", summary.url);
        }

        let publisher_name = agency.as_ref().and_then(|scope| self.agency_name.resolve(scope));
        let publisher_phone = agency
            .as_ref()
            .and_then(|scope| self.agency_phone.resolve(scope))
            .or_else(|| self.page_phone.resolve(&page));
        let publisher_email = agency
            .as_ref()
            .and_then(|scope| self.agency_email.resolve(scope))
            .or_else(|| self.page_email.resolve(&page));

        let nearby_transport = nearby_transport(root);

        let mut photos = summary.photos;
        collect_photos(root, &self.images, &self.site, &mut photos);

        ListingRecord {
            title,
            description,
            price,
            location,
            photos,
            energy_info,
            construction_date,
            publisher_name,
            publisher_email,
            publisher_phone,
            nearby_transport,
            url: summary.url,
            scraped_at: Utc::now().trunc_subsecs(0),
        }
    }
}

/// Metro and bus lines listed next to the first transport label on the page
fn nearby_transport(root: ElementRef<'_>) -> Vec<String> {
    let Some((_, Some(block))) = find_text(root, &TRANSPORT_LABEL) else {
        return Vec::new();
    };

    block
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split(['•', '\n'])
        .map(clean_text)
        .filter(|piece| {
            let lower = piece.to_lowercase();
            !piece.is_empty() && (lower.contains("métro") || lower.contains("bus"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> DetailExtractor {
        DetailExtractor::new(SiteConfig::default()).unwrap()
    }

    fn summary() -> ListingSummary {
        ListingSummary {
            title: "Appartement 3 pièces".to_string(),
            url: "https://www.seloger.com/annonces/123.htm".to_string(),
            location: Some("Paris 11ème".to_string()),
            price: Some(450_000),
            photos: vec!["https://v.seloger.com/s/1.jpg".to_string()],
        }
    }

    const DETAIL: &str = r#"
        <html><head><title>Annonce</title></head><body>
          <a href="https://www.seloger.com/annonces/canonical-999.htm">Lien</a>
          <h1>  Bel appartement   lumineux </h1>
          <p class="Summary__Price">439 000 €</p>
          <p class="AdresseBlock">12 rue Oberkampf, Paris 11ème</p>
          <section data-test="sl-description">
            Au cœur du 11ème, appartement traversant.
          </section>
          <div class="Energy"><span>Classe D</span></div>
          <p>Construction en 1932</p>
          <div class="AgencyCard">
            <h3>Agence du Marais</h3>
            <span>01 42 00 00 00</span>
            <a href="mailto:contact@marais.example">Contacter</a>
          </div>
          <div class="Transports">Transports à proximité
            • Métro Parmentier (ligne 3)
            • Bus 96 • Vélib
          </div>
          <img data-src="https://v.seloger.com/s/1.jpg">
          <img src="https://v.seloger.com/s/3.jpg">
          <img src="https://cdn.other.net/logo.png">
        </body></html>
    "#;

    #[test]
    fn resolves_every_field_from_detail_page() {
        let record = extractor().extract(DETAIL, summary());

        assert_eq!(record.title, "Bel appartement lumineux");
        assert_eq!(record.description, "Au cœur du 11ème, appartement traversant.");
        assert_eq!(record.price, Some(439_000));
        assert_eq!(record.location.as_deref(), Some("12 rue Oberkampf, Paris 11ème"));
        assert_eq!(record.energy_info.as_deref(), Some("Classe D"));
        assert_eq!(record.construction_date.as_deref(), Some("1932"));
        assert_eq!(record.publisher_name.as_deref(), Some("Agence du Marais"));
        assert_eq!(record.publisher_phone.as_deref(), Some("01 42 00 00 00"));
        assert_eq!(record.publisher_email.as_deref(), Some("contact@marais.example"));
        assert_eq!(record.nearby_transport, vec!["Métro Parmentier (ligne 3)", "Bus 96"]);
        assert_eq!(record.photos, vec!["https://v.seloger.com/s/1.jpg", "https://v.seloger.com/s/3.jpg"]);
    }

    #[test]
    fn url_comes_from_summary() {
        let record = extractor().extract(DETAIL, summary());

        assert_eq!(record.url, "https://www.seloger.com/annonces/123.htm");
    }

    #[test]
    fn missing_agency_leaves_publisher_empty() {
        let html = r#"
            <html><body>
              <h1>Maison avec jardin</h1>
              <div class="Description">Grande maison familiale.</div>
              <span>780 000 €</span>
            </body></html>
        "#;

        let record = extractor().extract(html, summary());

        assert_eq!(record.title, "Maison avec jardin");
        assert_eq!(record.price, Some(780_000));
        assert_eq!(record.description, "Grande maison familiale.");
        assert_eq!(record.publisher_name, None);
        assert_eq!(record.publisher_phone, None);
        assert_eq!(record.publisher_email, None);
        assert!(record.nearby_transport.is_empty());
    }

    #[test]
    fn empty_page_falls_back_to_summary() {
        let record = extractor().extract("<html><body></body></html>", summary());

        assert_eq!(record.title, "Appartement 3 pièces");
        assert_eq!(record.price, Some(450_000));
        assert_eq!(record.location.as_deref(), Some("Paris 11ème"));
        assert_eq!(record.description, "");
        assert_eq!(record.energy_info, None);
        assert_eq!(record.construction_date, None);
        assert_eq!(record.photos, vec!["https://v.seloger.com/s/1.jpg"]);
    }

    #[test]
    fn contact_links_are_used_outside_agency_card() {
        let html = r#"
            <html><body>
              <div data-test="agency-card"><h2>Particulier</h2></div>
              <footer>
                <a href="tel:+33612345678">Appeler</a>
                <a href="MAILTO:vendeur@example.fr">Écrire</a>
              </footer>
            </body></html>
        "#;

        let record = extractor().extract(html, summary());

        assert_eq!(record.publisher_name.as_deref(), Some("Particulier"));
        assert_eq!(record.publisher_phone.as_deref(), Some("+33612345678"));
        assert_eq!(record.publisher_email.as_deref(), Some("vendeur@example.fr"));
    }

    #[test]
    fn transport_lines_split_across_inline_tags_keep_word_breaks() {
        let html = r#"
            <html><body>
              <div>Transports<b>Métro</b><span>Saint-Ambroise</span> • <span>Bus</span><span>69</span> • Vélib</div>
            </body></html>
        "#;

        let record = extractor().extract(html, summary());

        assert_eq!(record.nearby_transport, vec!["Transports Métro Saint-Ambroise", "Bus 69"]);
    }

    #[test]
    fn energy_label_falls_back_to_parent_text() {
        let html = r#"
            <html><body>
              <div>Diagnostic de performance énergétique : <b>180</b> kWh/m².an</div>
            </body></html>
        "#;

        let record = extractor().extract(html, summary());

        assert_eq!(record.energy_info.as_deref(), Some("Diagnostic de performance énergétique : 180 kWh/m².an"));
    }
}
