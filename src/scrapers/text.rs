//! Text and number cleanup shared by every extractor.
//!
//! All price, area and year parsing funnels through [`extract_int`] or
//! [`extract_float`]; nothing else in the crate parses numbers out of markup.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// `\s` is Unicode-aware and covers U+00A0 / U+202F.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d[\d \x{a0}\x{202f}]*").unwrap());
static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").unwrap());

/// Collapse whitespace runs to a single space and trim
pub fn clean_text(raw: &str) -> String {
    WHITESPACE.replace_all(raw, " ").trim().to_string()
}

/// First signed integer in `raw`, with space thousand separators removed
pub fn extract_int(raw: &str) -> Option<i64> {
    let found = INT.find(raw)?;
    let digits: String = found
        .as_str()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();

    match digits.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Failed to parse integer from {:?}: {}", digits, e);
            None
        }
    }
}

/// First signed decimal in `raw`, accepting `.` or `,` as the fractional separator
pub fn extract_float(raw: &str) -> Option<f64> {
    let found = FLOAT.find(raw)?;
    let normalized = found.as_str().replace(',', ".");

    match normalized.parse::<f64>() {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Failed to parse float from {:?}: {}", normalized, e);
            None
        }
    }
}

/// Non-negative price from a currency-suffixed text fragment
pub fn extract_price(raw: &str) -> Option<u64> {
    extract_int(raw).and_then(|value| u64::try_from(value).ok())
}
