//! List site content

use anyhow::Result;

use crate::store::Query;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let store = blog.store()?;

    match content_type {
        "post" | "posts" => {
            let posts = store
                .find(&Query::posts().sort("-publishedAt".parse()?))
                .await?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                let date = post
                    .published_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                println!(
                    "  {} - {} [{}] ({} comments)",
                    date,
                    post.title,
                    post.slug,
                    post.comments.len()
                );
            }
        }
        "route" | "routes" => {
            let slugs = blog.static_params(store.as_ref()).await?;
            println!("Routes ({}):", slugs.len() + 1);
            println!("  /");
            for slug in slugs {
                println!("  /posts/{}", slug);
            }
        }
        _ => {
            println!("Unknown type: {}. Available types: post, route", content_type);
        }
    }

    Ok(())
}
