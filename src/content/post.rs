//! Post and comment models
//!
//! Documents arrive from the content store in their wire shape
//! ([`PostDocument`]) and are converted once into a [`Post`], which is what the
//! rest of the crate works with. The conversion decides the body variant so
//! render sites never have to re-check which field is populated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::richtext::RichText;

/// Document identifier. Stores hand these out as numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

/// A reference to another document: either populated or just its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation<T> {
    Resolved(T),
    Unresolved(DocumentId),
}

impl<T> Relation<T> {
    /// The populated document, if the store resolved the reference
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Relation::Resolved(doc) => Some(doc),
            Relation::Unresolved(_) => None,
        }
    }

    pub fn into_resolved(self) -> Option<T> {
        match self {
            Relation::Resolved(doc) => Some(doc),
            Relation::Unresolved(_) => None,
        }
    }
}

/// Uploaded media (hero images, meta images)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub id: Option<DocumentId>,
    pub url: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// SEO metadata attached to a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<Relation<Media>>,
}

impl Meta {
    pub fn image_url(&self) -> Option<&str> {
        self.image
            .as_ref()
            .and_then(Relation::resolved)
            .and_then(|m| m.url.as_deref())
    }
}

/// A visitor comment as stored on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub name: String,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Publication status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
}

/// A populated related-post reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelatedPost {
    pub id: DocumentId,
    pub title: String,
    pub slug: Option<String>,
    pub hero_image: Option<Relation<Media>>,
    pub meta: Option<Meta>,
}

impl From<&Post> for RelatedPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            slug: Some(post.slug.clone()),
            hero_image: post.hero_image.clone().map(Relation::Resolved),
            meta: Some(post.meta.clone()),
        }
    }
}

/// Post body, resolved once when the document is loaded
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw markdown, rendered verbatim
    Markdown(String),
    /// Rich-text tree from the CMS editor
    Structured(RichText),
    Empty,
}

impl Body {
    /// Markdown wins whenever it is non-empty; the tree is only a fallback.
    pub fn from_parts(markdown: Option<String>, structured: Option<RichText>) -> Self {
        match (markdown, structured) {
            (Some(md), _) if !md.is_empty() => Body::Markdown(md),
            (_, Some(tree)) => Body::Structured(tree),
            _ => Body::Empty,
        }
    }
}

/// A post document in the shape the content store sends it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostDocument {
    pub id: DocumentId,
    pub title: String,
    pub slug: Option<String>,
    pub hero_image: Option<Relation<Media>>,
    pub content: Option<RichText>,
    pub markdown_content: Option<String>,
    pub related_posts: Option<Vec<Relation<RelatedPost>>>,
    pub comments: Option<Vec<Comment>>,
    pub meta: Option<Meta>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "_status")]
    pub status: Option<Status>,
}

/// A blog post
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: DocumentId,

    /// URL-safe identifier, unique across posts
    pub slug: String,

    pub title: String,

    /// Hero image, only when the store populated the upload
    pub hero_image: Option<Media>,

    pub body: Body,

    /// Related posts; entries may be bare ids
    pub related_posts: Vec<Relation<RelatedPost>>,

    /// Comments in store order
    pub comments: Vec<Comment>,

    pub meta: Meta,

    pub status: Status,

    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PostDocument> for Post {
    fn from(doc: PostDocument) -> Self {
        Self {
            id: doc.id,
            slug: doc.slug.unwrap_or_default(),
            title: doc.title,
            hero_image: doc.hero_image.and_then(Relation::into_resolved),
            body: Body::from_parts(doc.markdown_content, doc.content),
            related_posts: doc.related_posts.unwrap_or_default(),
            comments: doc.comments.unwrap_or_default(),
            meta: doc.meta.unwrap_or_default(),
            status: doc.status.unwrap_or_default(),
            published_at: doc.published_at,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl Post {
    /// Create a published post with an empty body
    pub fn new(id: impl Into<String>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            slug: slug.into(),
            title: title.into(),
            hero_image: None,
            body: Body::Empty,
            related_posts: Vec::new(),
            comments: Vec::new(),
            meta: Meta::default(),
            status: Status::Published,
            published_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == Status::Draft
    }

    /// Related posts the store actually populated
    pub fn resolved_related(&self) -> impl Iterator<Item = &RelatedPost> {
        self.related_posts.iter().filter_map(Relation::resolved)
    }
}
