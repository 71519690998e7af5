//! Generator module - pre-renders the site into static HTML files

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::helpers::{html_escape, is_url_safe_slug};
use crate::pages::{PageRenderer, Rendered};
use crate::resolver::PostResolver;
use crate::store::ContentStore;
use crate::Blog;

/// What a generate run wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateStats {
    pub posts: usize,
    pub redirects: usize,
    pub skipped: usize,
}

/// Static site generator over a content store
pub struct Generator {
    blog: Blog,
    pages: PageRenderer,
    store: Arc<dyn ContentStore>,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            pages: PageRenderer::new(blog.config.clone())?,
            store,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateStats> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.copy_static_assets()?;

        let listing = self
            .pages
            .listing_page(self.store.as_ref(), false)
            .await
            .context("Failed to render the listing page")?;
        self.write_page(Path::new("index.html"), &listing)?;

        let not_found = self.pages.not_found_page(false)?;
        self.write_page(Path::new("404.html"), &not_found)?;

        let mut stats = GenerateStats::default();
        for slug in self.blog.static_params(self.store.as_ref()).await? {
            if !is_url_safe_slug(&slug) {
                tracing::warn!("Skipping post with unsafe slug {:?}", slug);
                stats.skipped += 1;
                continue;
            }

            // Each page gets its own resolver, like a request would
            let resolver = PostResolver::new(self.store.clone());
            let output = Path::new("posts").join(&slug).join("index.html");

            match self.pages.post_page(&resolver, &slug, false).await? {
                Rendered::Page(html) => {
                    self.write_page(&output, &html)?;
                    stats.posts += 1;
                }
                Rendered::Redirect(to) => {
                    self.write_page(&output, &redirect_stub(&to))?;
                    stats.redirects += 1;
                }
                Rendered::NotFound(_) => {
                    tracing::warn!("Post {:?} disappeared during generation", slug);
                    stats.skipped += 1;
                }
            }
        }

        Ok(stats)
    }

    fn write_page(&self, relative: &Path, html: &str) -> Result<()> {
        let output_path = self.blog.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, html)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy static assets into public/static
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        let target = self.blog.public_dir.join("static");
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = target.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

/// HTML page that forwards to `to`
fn redirect_stub(to: &str) -> String {
    let to = html_escape(to);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="0; url={to}">
<link rel="canonical" href="{to}">
</head>
<body><a href="{to}">Redirecting to {to}</a></body>
</html>
"#
    )
}
