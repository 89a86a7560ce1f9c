//! Snapshot comparison keyed by listing URL.

use crate::models::{DeltaResult, ListingRecord};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn};

/// Compare two snapshots by `url`.
///
/// Records with an empty `url` cannot be tracked and are left out of `new` and
/// `removed`. When a URL repeats within one list the later record wins.
/// `current` is returned unchanged.
pub fn compute_delta(previous: &[ListingRecord], current: &[ListingRecord]) -> DeltaResult {
    let prev_index = index_by_url(previous);
    let curr_index = index_by_url(current);

    let new = unmatched(current, &curr_index, &prev_index);
    let removed = unmatched(previous, &prev_index, &curr_index);

    info!("Delta mode: {} new, {} removed listings", new.len(), removed.len());

    DeltaResult { new, removed, current: current.to_vec() }
}

/// URL → position of its last occurrence
fn index_by_url(records: &[ListingRecord]) -> HashMap<&str, usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| !record.url.is_empty())
        .map(|(pos, record)| (record.url.as_str(), pos))
        .collect()
}

/// Indexed records of `records` whose URL is missing from `other`, in list order
fn unmatched(records: &[ListingRecord], own: &HashMap<&str, usize>, other: &HashMap<&str, usize>) -> Vec<ListingRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(pos, record)| own.get(record.url.as_str()) == Some(pos) && !other.contains_key(record.url.as_str()))
        .map(|(_, record)| record.clone())
        .collect()
}

/// Load the previous snapshot written by an earlier run.
/// Any problem yields an empty snapshot so every current listing counts as new.
pub async fn load_previous(path: &Path) -> Vec<ListingRecord> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No previous output file found at {}; delta mode will treat all as new", path.display());
            return Vec::new();
        }
        Err(e) => {
            error!("Failed to read previous output {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse previous output {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let serde_json::Value::Array(entries) = value else {
        warn!("Previous output file did not contain a list; ignoring");
        return Vec::new();
    };

    // One malformed entry must not hide the rest of the snapshot
    let total = entries.len();
    let records: Vec<ListingRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value::<ListingRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping previous listing {} in {}: {}", idx, path.display(), e);
                None
            }
        })
        .collect();

    info!("Loaded {}/{} previous listings from {}", records.len(), total, path.display());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use chrono::Utc;

    fn record(url: &str) -> ListingRecord {
        record_titled(url, url)
    }

    fn record_titled(url: &str, title: &str) -> ListingRecord {
        ListingRecord::from_summary(
            ListingSummary {
                title: title.to_string(),
                url: url.to_string(),
                location: None,
                price: None,
                photos: Vec::new(),
            },
            Utc::now(),
        )
    }

    fn urls(records: &[ListingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn splits_new_and_removed() {
        let previous = vec![record("a"), record("b")];
        let current = vec![record("b"), record("c")];

        let delta = compute_delta(&previous, &current);

        assert_eq!(urls(&delta.new), vec!["c"]);
        assert_eq!(urls(&delta.removed), vec!["a"]);
        assert_eq!(delta.current, current);
    }

    #[test]
    fn empty_previous_makes_everything_new() {
        let current = vec![record("a"), record("b")];

        let delta = compute_delta(&[], &current);

        assert_eq!(urls(&delta.new), vec!["a", "b"]);
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn records_without_url_are_ignored() {
        let previous = vec![record("")];
        let current = vec![record(""), record("x")];

        let delta = compute_delta(&previous, &current);

        assert_eq!(urls(&delta.new), vec!["x"]);
        assert!(delta.removed.is_empty());
        assert_eq!(delta.current.len(), 2);
    }

    #[test]
    fn duplicate_url_keeps_last_occurrence() {
        let current = vec![record_titled("d", "first"), record_titled("d", "second")];

        let delta = compute_delta(&[], &current);

        assert_eq!(delta.new.len(), 1);
        assert_eq!(delta.new[0].title, "second");
    }

    #[tokio::test]
    async fn load_previous_tolerates_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load_previous(&dir.path().join("absent.json")).await.is_empty());

        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, "{not json").await.unwrap();
        assert!(load_previous(&bad).await.is_empty());

        let object = dir.path().join("object.json");
        tokio::fs::write(&object, r#"{"url": "a"}"#).await.unwrap();
        assert!(load_previous(&object).await.is_empty());
    }

    #[tokio::test]
    async fn load_previous_skips_only_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        let mut snapshot = serde_json::to_value(vec![record("https://x/a"), record("https://x/b")]).unwrap();
        let entries = snapshot.as_array_mut().unwrap();
        entries.push(serde_json::json!({"title": "Sans date", "url": "https://x/c"}));
        entries.push(serde_json::json!({"title": "B", "url": null, "scraped_at": "2024-03-01T12:30:05Z"}));
        entries.push(serde_json::json!({"title": "Négatif", "url": "https://x/d", "price": -5, "scraped_at": "2024-03-01T12:30:05Z"}));
        tokio::fs::write(&path, snapshot.to_string()).await.unwrap();

        let loaded = load_previous(&path).await;

        assert_eq!(urls(&loaded), vec!["https://x/a", "https://x/b", ""]);

        // A listing still present is not reported again as new
        let delta = compute_delta(&loaded, &[record("https://x/a"), record("https://x/e")]);
        assert_eq!(urls(&delta.new), vec!["https://x/e"]);
        assert_eq!(urls(&delta.removed), vec!["https://x/b"]);
    }

    #[tokio::test]
    async fn load_previous_reads_exported_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        let snapshot = vec![record("https://www.seloger.com/annonces/1.htm")];
        tokio::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).await.unwrap();

        let loaded = load_previous(&path).await;

        assert_eq!(urls(&loaded), vec!["https://www.seloger.com/annonces/1.htm"]);
    }
}
