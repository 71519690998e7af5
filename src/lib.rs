//! blog-front: a server-rendered blog front end for a headless CMS
//!
//! Posts live in a content store (a Payload CMS, a local content directory or
//! memory). Pages are rendered per request with embedded Tera templates, and
//! visitors can leave comments through a form endpoint.

pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod pages;
pub mod resolver;
pub mod server;
pub mod store;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{SiteConfig, StoreKind};
use store::{ContentStore, FileStore, PayloadStore};

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory for the file store
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets served under /static
    pub static_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = SiteConfig::load_from_dir(&base_dir)?;
        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config(base_dir: PathBuf, config: SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            content_dir,
            public_dir,
            static_dir,
        }
    }

    /// Connect to the configured content store
    pub fn store(&self) -> Result<Arc<dyn ContentStore>> {
        let store: Arc<dyn ContentStore> = match self.config.store.kind {
            StoreKind::File => Arc::new(FileStore::new(&self.content_dir)),
            StoreKind::Payload => Arc::new(PayloadStore::new(
                &self.config.store.url,
                self.config.store.api_key.clone(),
                self.config.store.timeout(),
            )?),
        };
        Ok(store)
    }

    /// Slugs of every published post, for pre-rendering
    pub async fn static_params(&self, store: &dyn ContentStore) -> Result<Vec<String>> {
        Ok(store::published_slugs(store, self.config.static_params_limit).await?)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
