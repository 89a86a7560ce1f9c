//! JSON, CSV and HTML writers for the final record list.

use crate::models::{FieldValue, ListingRecord};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Export target format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Html,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "html" => Ok(OutputFormat::Html),
            other => bail!("Unsupported export format: {other}"),
        }
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Csv => "CSV",
            OutputFormat::Html => "HTML",
        };
        f.write_str(name)
    }
}

/// Write `records` to `path`, creating parent directories as needed
pub async fn export_listings(records: &[ListingRecord], path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let body = match format {
        OutputFormat::Json => serde_json::to_string_pretty(records).context("Failed to serialize listings")?,
        OutputFormat::Csv => render_csv(records),
        OutputFormat::Html => render_html(records),
    };

    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Exported {} listings as {} to {}", records.len(), format, path.display());
    Ok(())
}

fn render_csv(records: &[ListingRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let header: Vec<_> = first.fields().iter().map(|(key, _)| csv_cell(key)).collect();
    let mut out = header.join(",");
    out.push_str("\r\n");

    for record in records {
        let row: Vec<_> = record
            .fields()
            .into_iter()
            .map(|(_, value)| {
                let flat = match value {
                    FieldValue::Text(text) => text.unwrap_or_default(),
                    FieldValue::List(items) => items.join("; "),
                };
                csv_cell(&flat)
            })
            .collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_html(records: &[ListingRecord]) -> String {
    let Some(first) = records.first() else {
        return "<html><body><p>No listings found.</p></body></html>".to_string();
    };

    let header_cells: String = first
        .fields()
        .iter()
        .map(|(key, _)| format!("<th>{}</th>", html_escape::encode_text(key)))
        .collect();

    let rows: String = records
        .iter()
        .map(|record| {
            let cells: String = record
                .fields()
                .into_iter()
                .map(|(_, value)| {
                    let display = match value {
                        FieldValue::Text(text) => html_escape::encode_text(&text.unwrap_or_default()).into_owned(),
                        FieldValue::List(items) => items
                            .iter()
                            .map(|item| html_escape::encode_text(item).into_owned())
                            .collect::<Vec<_>>()
                            .join("<br>"),
                    };
                    format!("<td>{display}</td>")
                })
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>SeLoger Listings Export</title>
    <style>
      body {{ font-family: Arial, sans-serif; font-size: 14px; }}
      table {{ border-collapse: collapse; width: 100%; }}
      th, td {{ padding: 4px 8px; }}
      th {{ background-color: #f0f0f0; text-align: left; }}
      tbody tr:nth-child(even) {{ background-color: #fafafa; }}
    </style>
  </head>
  <body>
    <h1>SeLoger Listings Export</h1>
    <table border='1' cellspacing='0' cellpadding='4'><thead><tr>{header_cells}</tr></thead><tbody>{rows}</tbody></table>
  </body>
</html>
"#
    )
}
