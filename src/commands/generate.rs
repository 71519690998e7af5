//! Generate static files

use anyhow::Result;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::generator::Generator;
use crate::Blog;

/// Pre-render the listing and every published post
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let store = blog.store()?;
    let generator = Generator::new(blog, store)?;
    let stats = generator.generate().await?;

    tracing::info!(
        "Generated {} posts and {} redirects in {:.2?}",
        stats.posts,
        stats.redirects,
        start.elapsed()
    );
    if stats.skipped > 0 {
        tracing::warn!("Skipped {} posts", stats.skipped);
    }

    Ok(())
}

/// Regenerate whenever the content directory or static assets change
pub async fn watch(blog: &Blog) -> Result<()> {
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for dir in [&blog.content_dir, &blog.static_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    println!("Watching for changes. Press Ctrl+C to stop.");

    loop {
        // The debouncer delivers on a std channel; wait for it off the runtime
        let received = tokio::task::block_in_place(|| rx.recv());
        match received {
            Ok(Ok(events)) => {
                for event in &events {
                    println!("File changed: {}", event.path.display());
                }
                if let Err(e) = run(blog).await {
                    println!("Generation failed: {}", e);
                }
            }
            Ok(Err(e)) => tracing::error!("Watch error: {:?}", e),
            Err(_) => break,
        }
    }

    Ok(())
}
