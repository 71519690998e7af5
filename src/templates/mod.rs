//! Built-in site templates using Tera template engine
//!
//! Templates are embedded directly in the binary. Autoescaping stays on for
//! every `.html` template; pre-rendered post bodies and meta tags are marked
//! `safe` at the point of use.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Stylesheet written by `init` into the static directory
pub const STYLESHEET: &str = include_str!("site/style.css");

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("macros.html", include_str!("site/macros.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            // Partials
            (
                "partials/comment_form.html",
                include_str!("site/partials/comment_form.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    /// Site root, always ending in `/`
    pub root: String,
    pub year: i32,
}

/// Head metadata for one page
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: Option<String>,
    /// Pre-rendered Open Graph tags
    pub open_graph: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaData {
    pub url: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A post card on the listing or in the related-posts section
#[derive(Debug, Clone, Serialize)]
pub struct CardData {
    pub title: String,
    pub path: String,
    pub description: Option<String>,
    pub hero: Option<MediaData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub name: String,
    pub comment: String,
    /// Display text; "Just now" when the store gave no timestamp
    pub timestamp: String,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub path: String,
    pub published: Option<String>,
    pub published_iso: Option<String>,
    pub hero: Option<MediaData>,
    /// Rendered body HTML
    pub body_html: String,
    pub related: Vec<CardData>,
    pub comments: Vec<CommentData>,
    pub comment_form: bool,
    pub comment_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteData {
        SiteData {
            title: "Blog".to_string(),
            description: String::new(),
            language: "en".to_string(),
            root: "/".to_string(),
            year: 2024,
        }
    }

    fn meta(title: &str) -> PageMeta {
        PageMeta {
            title: title.to_string(),
            description: None,
            open_graph: r#"<meta property="og:title" content="x">"#.to_string(),
        }
    }

    #[test]
    fn test_all_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_listing_escapes_titles() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("meta", &meta("Blog"));
        context.insert("draft_mode", &false);
        context.insert(
            "posts",
            &vec![CardData {
                title: "<script>alert(1)</script>".to_string(),
                path: "/posts/x".to_string(),
                description: None,
                hero: None,
            }],
        );

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("No description available."));
        assert!(html.contains(r#"<meta property="og:title" content="x">"#));
        assert!(!html.contains("draft-banner"));
    }

    #[test]
    fn test_draft_banner() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("meta", &meta("Not found"));
        context.insert("draft_mode", &true);

        let html = renderer.render("not_found.html", &context).unwrap();
        assert!(html.contains("draft-banner"));
        assert!(html.contains("/preview/exit"));
    }
}
