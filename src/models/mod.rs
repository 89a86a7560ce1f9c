use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lightweight listing extracted straight from a search-results card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    /// Absolute URL, the listing's identity across runs
    pub url: String,
    pub location: Option<String>,
    pub price: Option<u64>,
    pub photos: Vec<String>,
}

/// Full listing record, either shallow (from a summary) or enriched from its detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub price: Option<u64>,
    pub location: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub energy_info: Option<String>,
    pub construction_date: Option<String>,
    pub publisher_name: Option<String>,
    pub publisher_email: Option<String>,
    pub publisher_phone: Option<String>,
    #[serde(default)]
    pub nearby_transport: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(with = "timestamp")]
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Shallow record: summary fields only, everything else empty
    pub fn from_summary(summary: ListingSummary, scraped_at: DateTime<Utc>) -> Self {
        Self {
            title: summary.title,
            description: String::new(),
            price: summary.price,
            location: summary.location,
            photos: summary.photos,
            energy_info: None,
            construction_date: None,
            publisher_name: None,
            publisher_email: None,
            publisher_phone: None,
            nearby_transport: Vec::new(),
            url: summary.url,
            scraped_at,
        }
    }

    /// Ordered `(key, value)` pairs used by the flat exporters
    pub fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("construction_date", FieldValue::text(&self.construction_date)),
            ("description", FieldValue::Text(Some(self.description.clone()))),
            ("energy_info", FieldValue::text(&self.energy_info)),
            ("location", FieldValue::text(&self.location)),
            ("nearby_transport", FieldValue::List(&self.nearby_transport)),
            ("photos", FieldValue::List(&self.photos)),
            ("price", FieldValue::Text(self.price.map(|p| p.to_string()))),
            ("publisher_email", FieldValue::text(&self.publisher_email)),
            ("publisher_name", FieldValue::text(&self.publisher_name)),
            ("publisher_phone", FieldValue::text(&self.publisher_phone)),
            ("scraped_at", FieldValue::Text(Some(timestamp::format(&self.scraped_at)))),
            ("title", FieldValue::Text(Some(self.title.clone()))),
            ("url", FieldValue::Text(Some(self.url.clone()))),
        ]
    }
}

/// A record field as seen by the CSV and HTML writers
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Option<String>),
    List(&'a [String]),
}

impl FieldValue<'_> {
    fn text(value: &Option<String>) -> Self {
        FieldValue::Text(value.clone())
    }
}

/// Outcome of comparing two snapshots keyed by listing URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaResult {
    pub new: Vec<ListingRecord>,
    pub removed: Vec<ListingRecord>,
    pub current: Vec<ListingRecord>,
}

/// Older snapshots write `null` for missing text
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// ISO-8601 UTC, second precision, trailing `Z`
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
