use serde::{Deserialize, Serialize};

/// Site identity used to absolutize links and filter photo URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host prefixed to root-relative links, e.g. `https://www.seloger.com`
    pub origin: String,
    /// Substring an image URL must contain to be kept, e.g. `seloger.com`
    pub domain: String,
}

impl SiteConfig {
    pub fn new(origin: impl Into<String>, domain: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self { origin, domain: domain.into() }
    }

    /// Rewrite a root-relative `href` to an absolute URL; other values pass through
    pub fn absolutize(&self, href: &str) -> String {
        if href.starts_with('/') && !href.starts_with("//") {
            format!("{}{}", self.origin, href)
        } else {
            href.to_string()
        }
    }

    pub fn owns_photo(&self, src: &str) -> bool {
        src.contains(&self.domain)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new("https://www.seloger.com", "seloger.com")
    }
}
