//! Page rendering
//!
//! Turns resolved posts into full HTML documents: the post page (hero, body,
//! related posts, comments and the comment form), the latest-posts listing and
//! the not-found page.

use anyhow::Context as _;
use chrono::{Datelike, Utc};
use tera::Context;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::content::{richtext, Body, Comment, Media, MarkdownRenderer, Post, RelatedPost};
use crate::helpers::{
    comment_timestamp, date_xml, encode_path_segment, excerpt, format_in_zone, full_url_for,
    open_graph, parse_timezone, url_for,
};
use crate::resolver::PostResolver;
use crate::store::{ContentStore, Query, Sort, StoreError};
use crate::templates::{
    CardData, CommentData, MediaData, PageMeta, PostData, SiteData, TemplateRenderer,
};

/// Errors from building a page
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

/// What a post URL resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Page(String),
    Redirect(String),
    NotFound(String),
}

/// Renders site pages from store documents
pub struct PageRenderer {
    config: SiteConfig,
    templates: TemplateRenderer,
    markdown: MarkdownRenderer,
    listing_sort: Sort,
}

impl PageRenderer {
    pub fn new(config: SiteConfig) -> anyhow::Result<Self> {
        let listing_sort: Sort = config
            .listing
            .sort
            .parse()
            .with_context(|| format!("Invalid listing sort {:?}", config.listing.sort))?;
        let markdown =
            MarkdownRenderer::with_options(&config.highlight.theme, config.highlight.line_number)?;

        Ok(Self {
            templates: TemplateRenderer::new()?,
            markdown,
            listing_sort,
            config,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Render the page for `/posts/{slug}`.
    ///
    /// Metadata and body resolve the post through the same resolver, so they
    /// share one store query. A redirect registered for the URL wins over
    /// both the post and the not-found page.
    pub async fn post_page(
        &self,
        resolver: &PostResolver,
        slug: &str,
        draft: bool,
    ) -> Result<Rendered, PageError> {
        let (meta, post) = tokio::try_join!(self.post_meta(resolver, slug, draft), async {
            Ok::<_, PageError>(resolver.resolve(slug, draft).await?)
        })?;

        let url = format!("/posts/{}", slug);
        if let Some(redirect) = resolver.store().find_redirect(&url).await? {
            tracing::debug!("Redirecting {} to {}", url, redirect.to);
            return Ok(Rendered::Redirect(redirect.to));
        }

        match post {
            Some(post) => Ok(Rendered::Page(self.render_post(&post, meta, draft)?)),
            None => Ok(Rendered::NotFound(self.not_found_page(draft)?)),
        }
    }

    /// Head metadata for a post page
    pub async fn post_meta(
        &self,
        resolver: &PostResolver,
        slug: &str,
        draft: bool,
    ) -> Result<PageMeta, PageError> {
        let post = resolver.resolve(slug, draft).await?;
        Ok(match post {
            Some(post) => self.meta_for(&post),
            None => self.site_meta(),
        })
    }

    fn meta_for(&self, post: &Post) -> PageMeta {
        let title = post
            .meta
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&post.title);
        let title = format!("{} | {}", title, self.config.title);
        let description = post.meta.description.clone().filter(|d| !d.is_empty());
        let open_graph = open_graph(
            &title,
            description.as_deref().unwrap_or(""),
            &full_url_for(
                &self.config,
                &format!("/posts/{}", encode_path_segment(&post.slug)),
            ),
            post.meta.image_url(),
            &self.config.title,
        );

        PageMeta {
            title,
            description,
            open_graph,
        }
    }

    fn site_meta(&self) -> PageMeta {
        let description = Some(self.config.description.clone()).filter(|d| !d.is_empty());
        PageMeta {
            title: self.config.title.clone(),
            open_graph: open_graph(
                &self.config.title,
                description.as_deref().unwrap_or(""),
                &full_url_for(&self.config, "/"),
                None,
                &self.config.title,
            ),
            description,
        }
    }

    fn site_data(&self) -> SiteData {
        SiteData {
            title: self.config.title.clone(),
            description: self.config.description.clone(),
            language: self.config.language.clone(),
            root: url_for(&self.config, "/"),
            year: Utc::now().with_timezone(&parse_timezone(&self.config.timezone)).year(),
        }
    }

    fn base_context(&self, meta: &PageMeta, draft: bool) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_data());
        context.insert("meta", meta);
        context.insert("draft_mode", &draft);
        context
    }

    /// Render a found post
    pub fn render_post(&self, post: &Post, meta: PageMeta, draft: bool) -> anyhow::Result<String> {
        let data = PostData {
            title: post.title.clone(),
            slug: post.slug.clone(),
            path: post_url(&self.config, &post.slug),
            published: post
                .published_at
                .map(|d| format_in_zone(&d, &self.config.timezone, &self.config.date_format)),
            published_iso: post.published_at.map(|d| date_xml(&d)),
            hero: post
                .hero_image
                .as_ref()
                .and_then(|m| media_data(m, &post.title)),
            body_html: self.render_body(&post.body),
            related: post
                .resolved_related()
                .map(|related| self.related_card(related))
                .collect(),
            comments: post.comments.iter().map(|c| self.comment_data(c)).collect(),
            comment_form: self.config.comments.enabled && !post.slug.is_empty(),
            comment_endpoint: url_for(
                &self.config,
                &format!("/api/posts/{}/comment", encode_path_segment(&post.slug)),
            ),
        };

        let mut context = self.base_context(&meta, draft);
        context.insert("post", &data);
        context.insert("comments", &self.config.comments);
        self.templates.render("post.html", &context)
    }

    /// HTML for a post body. Markdown and structured content never mix.
    pub fn render_body(&self, body: &Body) -> String {
        match body {
            Body::Markdown(markdown) => self.markdown.render(markdown),
            Body::Structured(tree) => richtext::render_html(tree),
            Body::Empty => String::new(),
        }
    }

    fn comment_data(&self, comment: &Comment) -> CommentData {
        CommentData {
            name: comment.name.clone(),
            comment: comment.comment.clone(),
            timestamp: comment_timestamp(
                comment.created_at.as_ref(),
                &self.config.timezone,
                &self.config.datetime_format,
            ),
            datetime: comment.created_at.map(|d| date_xml(&d)),
        }
    }

    fn card(&self, title: &str, slug: &str, description: Option<&str>, hero: Option<&Media>) -> CardData {
        CardData {
            title: title.to_string(),
            path: post_url(&self.config, slug),
            description: description.and_then(|d| excerpt(d, self.config.listing.excerpt_length)),
            hero: hero.and_then(|m| media_data(m, title)),
        }
    }

    fn post_card(&self, post: &Post) -> CardData {
        self.card(
            &post.title,
            &post.slug,
            post.meta.description.as_deref(),
            post.hero_image.as_ref(),
        )
    }

    fn related_card(&self, related: &RelatedPost) -> CardData {
        self.card(
            &related.title,
            related.slug.as_deref().unwrap_or_default(),
            related.meta.as_ref().and_then(|m| m.description.as_deref()),
            related.hero_image.as_ref().and_then(|h| h.resolved()),
        )
    }

    /// The most recent published posts for the home page
    pub async fn latest_posts(&self, store: &dyn ContentStore) -> Result<Vec<Post>, StoreError> {
        let query = Query::posts()
            .limit(self.config.listing.limit)
            .sort(self.listing_sort);
        store.find(&query).await
    }

    /// Render the listing page from already fetched posts
    pub fn render_listing(&self, posts: &[Post], draft: bool) -> anyhow::Result<String> {
        let cards: Vec<CardData> = posts.iter().map(|p| self.post_card(p)).collect();
        let mut context = self.base_context(&self.site_meta(), draft);
        context.insert("posts", &cards);
        self.templates.render("index.html", &context)
    }

    /// Fetch and render the home page
    pub async fn listing_page(
        &self,
        store: &dyn ContentStore,
        draft: bool,
    ) -> Result<String, PageError> {
        let posts = self.latest_posts(store).await?;
        Ok(self.render_listing(&posts, draft)?)
    }

    pub fn not_found_page(&self, draft: bool) -> anyhow::Result<String> {
        let meta = PageMeta {
            title: format!("Page not found | {}", self.config.title),
            description: None,
            open_graph: String::new(),
        };
        self.templates
            .render("not_found.html", &self.base_context(&meta, draft))
    }

    /// Error page for a failed request. Falls back to plain text when the
    /// template itself cannot be rendered.
    pub fn error_page(&self, status: u16, message: &str) -> String {
        let meta = PageMeta {
            title: format!("Error | {}", self.config.title),
            description: None,
            open_graph: String::new(),
        };
        let mut context = self.base_context(&meta, false);
        context.insert("status", &status);
        context.insert("message", message);

        match self.templates.render("error.html", &context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render error page: {:?}", e);
                format!("{} {}", status, message)
            }
        }
    }
}

/// Site-relative URL of a post, safe to emit unescaped
fn post_url(config: &SiteConfig, slug: &str) -> String {
    url_for(config, &format!("/posts/{}", encode_path_segment(slug)))
}

/// Template data for a populated upload. Media without a URL is not shown.
fn media_data(media: &Media, fallback_alt: &str) -> Option<MediaData> {
    let url = media.url.clone().filter(|u| !u.is_empty())?;
    Some(MediaData {
        url,
        alt: media
            .alt
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| fallback_alt.to_string()),
        width: media.width,
        height: media.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DocumentId, Meta, RichText, Relation, Status};
    use crate::store::{MemoryStore, Redirect};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn renderer() -> PageRenderer {
        PageRenderer::new(SiteConfig::default()).unwrap()
    }

    fn structured(text: &str) -> RichText {
        serde_json::from_value(serde_json::json!({
            "root": {"type": "root", "children": [
                {"type": "paragraph", "children": [{"type": "text", "text": text}]}
            ]}
        }))
        .unwrap()
    }

    fn page_html(rendered: Rendered) -> String {
        match rendered {
            Rendered::Page(html) => html,
            other => panic!("expected a page, got {:?}", other),
        }
    }

    struct CountingStore {
        inner: MemoryStore,
        queries: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ContentStore for CountingStore {
        async fn find(&self, query: &Query) -> Result<Vec<Post>, StoreError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.find(query).await
        }

        async fn add_comment(
            &self,
            slug: &str,
            comment: crate::comments::NewComment,
        ) -> Result<Comment, StoreError> {
            self.inner.add_comment(slug, comment).await
        }

        async fn find_redirect(&self, from: &str) -> Result<Option<Redirect>, StoreError> {
            self.inner.find_redirect(from).await
        }
    }

    #[test]
    fn test_markdown_wins_over_structured() {
        let body = Body::from_parts(
            Some("# From markdown".to_string()),
            Some(structured("From the editor")),
        );
        let html = renderer().render_body(&body);
        assert!(html.contains("From markdown"));
        assert!(!html.contains("From the editor"));
    }

    #[test]
    fn test_structured_body_and_empty_body() {
        let r = renderer();
        let html = r.render_body(&Body::from_parts(Some(String::new()), Some(structured("Hi"))));
        assert!(html.contains("<p>Hi</p>"));
        assert_eq!(r.render_body(&Body::Empty), "");
    }

    #[test]
    fn test_related_section_only_with_resolved_posts() {
        let r = renderer();
        let meta = r.meta_for(&Post::new("1", "a", "A"));

        let mut post = Post::new("1", "a", "A");
        let html = r.render_post(&post, meta.clone(), false).unwrap();
        assert!(!html.contains("Related Posts"));

        post.related_posts = vec![Relation::Unresolved(DocumentId::new("9"))];
        let html = r.render_post(&post, meta.clone(), false).unwrap();
        assert!(!html.contains("Related Posts"));

        post.related_posts.push(Relation::Resolved(RelatedPost {
            id: DocumentId::new("2"),
            title: "Second".to_string(),
            slug: Some("second".to_string()),
            ..RelatedPost::default()
        }));
        let html = r.render_post(&post, meta, false).unwrap();
        assert!(html.contains("Related Posts"));
        assert!(html.contains(r#"href="/posts/second""#));
        assert_eq!(html.matches("class=\"card\"").count(), 1);
    }

    #[test]
    fn test_comments_in_store_order_with_just_now() {
        let r = renderer();
        let mut post = Post::new("1", "a", "A");
        post.comments = vec![
            Comment {
                id: None,
                name: "Zed".to_string(),
                comment: "first".to_string(),
                created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            },
            Comment {
                id: None,
                name: "Ada".to_string(),
                comment: "<b>second</b>".to_string(),
                created_at: None,
            },
        ];

        let html = r.render_post(&post, r.meta_for(&post), false).unwrap();
        let zed = html.find("Zed").unwrap();
        let ada = html.find("Ada").unwrap();
        assert!(zed < ada);
        assert!(html.contains("2024-05-01 09:00"));
        assert!(html.contains("Just now"));
        assert!(html.contains("&lt;b&gt;second&lt;&#x2F;b&gt;"));
    }

    #[test]
    fn test_no_comment_sections_without_comments() {
        let r = renderer();
        let post = Post::new("1", "a", "A");
        let html = r.render_post(&post, r.meta_for(&post), false).unwrap();
        assert!(!html.contains("<h3>Comments</h3>"));
        assert!(html.contains("Leave a Comment"));
        assert!(html.contains(r#"action="/api/posts/a/comment""#));

        let mut config = SiteConfig::default();
        config.comments.enabled = false;
        let r = PageRenderer::new(config).unwrap();
        let html = r.render_post(&post, r.meta_for(&post), false).unwrap();
        assert!(!html.contains("Leave a Comment"));
    }

    #[test]
    fn test_meta_prefers_meta_title() {
        let r = renderer();
        let mut post = Post::new("1", "a", "Plain title");
        assert_eq!(r.meta_for(&post).title, "Plain title | Everyday GPT");

        post.meta = Meta {
            title: Some("SEO title".to_string()),
            description: Some("About a".to_string()),
            image: Some(Relation::Resolved(Media {
                url: Some("/media/a.png".to_string()),
                ..Media::default()
            })),
        };
        let meta = r.meta_for(&post);
        assert_eq!(meta.title, "SEO title | Everyday GPT");
        assert_eq!(meta.description.as_deref(), Some("About a"));
        assert!(meta.open_graph.contains("/media/a.png"));
    }

    #[tokio::test]
    async fn test_post_page_shares_one_query() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(vec![Post::new("1", "abc", "Alphabet")]),
            queries: AtomicUsize::new(0),
        });
        let resolver = PostResolver::new(store.clone());

        let html = page_html(renderer().post_page(&resolver, "abc", false).await.unwrap());
        assert!(html.contains("<title>Alphabet | Everyday GPT</title>"));
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_post_redirects_or_404s() {
        let store = Arc::new(MemoryStore::default().with_redirects(vec![Redirect {
            from: "/posts/old".to_string(),
            to: "/posts/new".to_string(),
        }]));
        let r = renderer();

        let resolver = PostResolver::new(store.clone());
        assert_eq!(
            r.post_page(&resolver, "old", false).await.unwrap(),
            Rendered::Redirect("/posts/new".to_string())
        );

        let resolver = PostResolver::new(store);
        match r.post_page(&resolver, "gone", false).await.unwrap() {
            Rendered::NotFound(html) => assert!(html.contains("could not be found")),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_wins_for_existing_post() {
        let store = Arc::new(
            MemoryStore::new(vec![Post::new("1", "moved", "Moved")]).with_redirects(vec![
                Redirect {
                    from: "/posts/moved".to_string(),
                    to: "/posts/elsewhere".to_string(),
                },
            ]),
        );
        let resolver = PostResolver::new(store);
        assert_eq!(
            renderer().post_page(&resolver, "moved", false).await.unwrap(),
            Rendered::Redirect("/posts/elsewhere".to_string())
        );
    }

    #[tokio::test]
    async fn test_draft_page_shows_banner() {
        let mut draft = Post::new("1", "wip", "Work in progress");
        draft.status = Status::Draft;
        let store = Arc::new(MemoryStore::new(vec![draft]));
        let r = renderer();

        let resolver = PostResolver::new(store.clone());
        assert!(matches!(
            r.post_page(&resolver, "wip", false).await.unwrap(),
            Rendered::NotFound(_)
        ));

        let resolver = PostResolver::new(store);
        let html = page_html(r.post_page(&resolver, "wip", true).await.unwrap());
        assert!(html.contains("Work in progress"));
        assert!(html.contains("draft-banner"));
    }

    #[tokio::test]
    async fn test_listing_shows_six_most_recent() {
        let mut posts: Vec<Post> = (1..=10)
            .map(|day| {
                let mut post = Post::new(day.to_string(), format!("post-{}", day), format!("Post {}", day));
                post.published_at = Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
                post
            })
            .collect();
        posts.reverse();
        posts.rotate_left(3);
        let store = MemoryStore::new(posts);
        let r = renderer();

        let latest = r.latest_posts(&store).await.unwrap();
        let slugs: Vec<_> = latest.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["post-10", "post-9", "post-8", "post-7", "post-6", "post-5"]);

        let html = r.listing_page(&store, false).await.unwrap();
        assert_eq!(html.matches("Read More →").count(), 6);
        assert!(!html.contains(r#"href="/posts/post-4""#));
    }

    #[test]
    fn test_listing_card_description() {
        let r = renderer();
        let mut long = Post::new("1", "long", "Long");
        long.meta.description = Some("x".repeat(150));
        let bare = Post::new("2", "bare", "Bare");

        let html = r.render_listing(&[long, bare], false).unwrap();
        assert!(html.contains(&"x".repeat(100)));
        assert!(!html.contains(&"x".repeat(101)));
        assert!(html.contains("No description available."));
    }
}
