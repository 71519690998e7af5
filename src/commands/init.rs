//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::templates::STYLESHEET;

const CONFIG: &str = r#"# Site
title: Everyday GPT
description: How I use ChatGPT in real life
language: en
timezone: ''

# URL
url: http://localhost:4000
root: /

# Directory
content_dir: content
public_dir: public
static_dir: static

# Date / Time format
date_format: MMMM D, YYYY
datetime_format: YYYY-MM-DD HH:mm

# Content store: `file` reads content_dir, `payload` talks to a Payload CMS
store:
  kind: file
  url: http://localhost:3000
  # api_key: ''
  timeout_secs: 30

# Home page listing
listing:
  limit: 6
  sort: -publishedAt
  excerpt_length: 100

# Visitor comments
comments:
  enabled: true
  max_name_length: 80
  max_comment_length: 5000

highlight:
  theme: base16-ocean.dark
  line_number: false

# Secret for /preview?secret=...&path=/posts/slug
# preview_secret: ''

static_params_limit: 1000
"#;

const REDIRECTS: &str = r#"# Redirects checked before rendering a post URL
# - from: /posts/old-slug
#   to: /posts/new-slug
[]
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("content/posts"))?;
    fs::create_dir_all(target_dir.join("content/comments"))?;
    fs::create_dir_all(target_dir.join("static"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("Site already initialized: {:?}", config_path);
    }

    fs::write(&config_path, CONFIG)?;
    fs::write(target_dir.join("content/redirects.yml"), REDIRECTS)?;
    fs::write(target_dir.join("static/style.css"), STYLESHEET)?;

    let now = chrono::Utc::now();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
description: Your very first post.
---

Welcome! This post lives in `content/posts/hello-world.md`.

## Quick Start

### Create a new post

```bash
$ blog-front new "My New Post"
```

### Run server

```bash
$ blog-front serve
```

### Generate static files

```bash
$ blog-front generate
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    fs::write(target_dir.join("content/posts/hello-world.md"), sample_post)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::store::{ContentStore, FileStore, Query};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_a_working_site() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();

        let config = SiteConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.listing.limit, 6);

        let store = FileStore::new(dir.path().join(&config.content_dir));
        let posts = store.find(&Query::posts()).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "hello-world");
        assert!(store.find_redirect("/posts/x").await.unwrap().is_none());
    }

    #[test]
    fn test_init_refuses_existing_site() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();
        assert!(init_site(dir.path()).is_err());
    }
}
