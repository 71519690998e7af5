//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::Blog;

/// Remove generated output
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_public_only() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::with_config(dir.path().to_path_buf(), SiteConfig::default());
        fs::create_dir_all(blog.public_dir.join("posts")).unwrap();
        fs::create_dir_all(&blog.content_dir).unwrap();

        run(&blog).unwrap();
        assert!(!blog.public_dir.exists());
        assert!(blog.content_dir.exists());

        // Nothing to clean is fine
        run(&blog).unwrap();
    }
}
