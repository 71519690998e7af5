//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::helpers::is_valid_date_format;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    /// IANA zone used for displayed timestamps; empty means UTC
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,
    pub static_dir: String,

    // Date / Time format (moment.js tokens)
    pub date_format: String,
    pub datetime_format: String,

    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,

    /// Secret required by `/preview` to turn on draft mode. Preview is
    /// disabled when unset.
    pub preview_secret: Option<String>,

    /// Upper bound on slugs enumerated for static export
    pub static_params_limit: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Everyday GPT".to_string(),
            description: "How I use ChatGPT in real life".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            content_dir: "content".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            date_format: "MMMM D, YYYY".to_string(),
            datetime_format: "YYYY-MM-DD HH:mm".to_string(),

            store: StoreConfig::default(),
            listing: ListingConfig::default(),
            comments: CommentsConfig::default(),
            highlight: HighlightConfig::default(),

            preview_secret: None,
            static_params_limit: 1000,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {:?}", path.as_ref()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail at render time
    pub fn validate(&self) -> Result<()> {
        for (key, format) in [
            ("date_format", &self.date_format),
            ("datetime_format", &self.datetime_format),
        ] {
            if !is_valid_date_format(format) {
                anyhow::bail!("Invalid {} {:?}", key, format);
            }
        }
        Ok(())
    }

    /// Load `_config.yml` from `base_dir`, falling back to defaults when the
    /// file does not exist
    pub fn load_from_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let path = base_dir.as_ref().join("_config.yml");
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir.as_ref());
            Ok(Self::default())
        }
    }
}

/// Which content store backend serves posts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Local content directory
    #[default]
    File,
    /// Payload CMS REST API
    Payload,
}

/// Content store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Base URL of the CMS, for the payload backend
    pub url: String,
    /// API key sent with draft-mode queries
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub limit: usize,
    pub sort: String,
    /// Characters of the description shown on a card
    pub excerpt_length: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            limit: 6,
            sort: "-publishedAt".to_string(),
            excerpt_length: 100,
        }
    }
}

/// Visitor comments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enabled: bool,
    pub max_name_length: usize,
    pub max_comment_length: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_name_length: 80,
            max_comment_length: 5000,
        }
    }
}

/// Code block highlighting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}
