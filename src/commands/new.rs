//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::Blog;

/// Create a markdown post in the content directory. Returns the new file.
pub fn create_post(blog: &Blog, title: &str, draft: bool, slug: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Utc::now();

    let slug = match slug {
        Some(s) => slug::slugify(s),
        None => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from {:?}", title);
    }

    let target_dir = blog.content_dir.join("posts");
    fs::create_dir_all(&target_dir)?;

    let file_path = target_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let content = format!(
        r#"---
title: {}
slug: {}
date: {}
draft: {}
description: ''
---
"#,
        serde_yaml::to_string(title)?.trim_end(),
        slug,
        now.format("%Y-%m-%d %H:%M:%S"),
        draft
    );

    fs::write(&file_path, content)?;

    println!("Created: {:?}", file_path);

    Ok(file_path)
}
