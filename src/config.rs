use crate::outputs::OutputFormat;
use crate::scrapers::SiteConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How documents are retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Http,
    Browser,
}

/// Run configuration loaded from a JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub start_url: Option<String>,
    pub inputs_file: Option<PathBuf>,
    pub deep_scrape: bool,
    pub delta_mode: bool,
    pub output_format: OutputFormat,
    pub output_path: Option<PathBuf>,
    pub previous_output_path: Option<PathBuf>,
    pub max_results: Option<usize>,
    pub user_agent: Option<String>,
    /// Per-fetch timeout in seconds
    pub timeout: u64,
    pub max_workers: usize,
    pub fetch_mode: FetchMode,
    pub site_origin: String,
    pub site_domain: String,
}

impl Default for Config {
    fn default() -> Self {
        let site = SiteConfig::default();
        Self {
            start_url: None,
            inputs_file: None,
            deep_scrape: false,
            delta_mode: false,
            output_format: OutputFormat::Json,
            output_path: None,
            previous_output_path: None,
            max_results: None,
            user_agent: None,
            timeout: 20,
            max_workers: 5,
            fetch_mode: FetchMode::Http,
            site_origin: site.origin,
            site_domain: site.domain,
        }
    }
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Config file not found: {}", path.display()))?;
        let config = Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        if config.max_workers == 0 {
            bail!("max_workers must be at least 1");
        }
        if config.timeout == 0 {
            bail!("timeout must be at least 1 second");
        }
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn site(&self) -> SiteConfig {
        SiteConfig::new(self.site_origin.clone(), self.site_domain.clone())
    }

    /// `start_url`, or else the first usable line of `inputs_file`
    pub async fn resolve_start_url(&self) -> Option<String> {
        if let Some(url) = self.start_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        let path = self.inputs_file.as_deref()?;
        read_inputs_file(path).await.into_iter().next()
    }
}

/// Start URLs listed one per line; blank lines and `#` comments are skipped
pub async fn read_inputs_file(path: &Path) -> Vec<String> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => {
            warn!("Inputs file does not exist: {}", path.display());
            return Vec::new();
        }
    };

    let urls: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    info!("Loaded {} start URLs from {}", urls.len(), path.display());
    urls
}
