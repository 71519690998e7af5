//! Content store access
//!
//! The content store is the system of record for posts and comments. The rest
//! of the crate only talks to it through [`ContentStore`], so the same render
//! path works against a Payload CMS, a local content directory, or memory.

mod file;
mod memory;
mod payload;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use payload::PayloadStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::comments::NewComment;
use crate::content::{Comment, Post};

/// The collection holding blog posts
pub const POSTS: &str = "posts";

/// Errors reported by a content store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    #[error("no post with slug {0:?}")]
    PostNotFound(String),

    #[error("content store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Fields posts can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    Title,
    Slug,
}

impl SortField {
    fn name(self) -> &'static str {
        match self {
            SortField::PublishedAt => "publishedAt",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::Title => "title",
            SortField::Slug => "slug",
        }
    }
}

/// Sort order in the store's `[-]field` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl FromStr for Sort {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, s),
        };
        let field = match name {
            "publishedAt" => SortField::PublishedAt,
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "slug" => SortField::Slug,
            other => return Err(StoreError::Malformed(format!("unknown sort field {:?}", other))),
        };
        Ok(Self { field, descending })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.name())
    }
}

impl Sort {
    /// Compare two posts. Missing dates sort last in either direction.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ordering = match self.field {
            SortField::PublishedAt => return cmp_dates(a.published_at, b.published_at, self.descending),
            SortField::CreatedAt => return cmp_dates(a.created_at, b.created_at, self.descending),
            SortField::UpdatedAt => return cmp_dates(a.updated_at, b.updated_at, self.descending),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Slug => a.slug.cmp(&b.slug),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn cmp_dates<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A find query against a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: &'static str,
    /// `where.slug.equals`
    pub slug: Option<String>,
    /// Read the latest draft versions
    pub draft: bool,
    pub limit: Option<usize>,
    pub sort: Option<Sort>,
    /// Skip access control; drafts are only visible with this set
    pub override_access: bool,
}

impl Query {
    /// Query the posts collection, published documents only
    pub fn posts() -> Self {
        Self {
            collection: POSTS,
            slug: None,
            draft: false,
            limit: None,
            sort: None,
            override_access: false,
        }
    }

    pub fn where_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn override_access(mut self, override_access: bool) -> Self {
        self.override_access = override_access;
        self
    }

    /// Whether the query may see `post` at all
    pub fn can_see(&self, post: &Post) -> bool {
        !post.is_draft() || (self.draft && self.override_access)
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.can_see(post) && self.slug.as_deref().map_or(true, |slug| post.slug == slug)
    }

    /// Run the query over an in-memory set of posts
    pub fn apply<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) -> Vec<Post> {
        let mut found: Vec<Post> = posts
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();

        if let Some(sort) = self.sort {
            found.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = self.limit {
            found.truncate(limit);
        }
        found
    }
}

/// A URL redirect managed in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

/// A content store backend
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Find documents matching `query`
    async fn find(&self, query: &Query) -> Result<Vec<Post>, StoreError>;

    /// Append a comment to the published post with `slug`. The store assigns
    /// the timestamp.
    async fn add_comment(&self, slug: &str, comment: NewComment) -> Result<Comment, StoreError>;

    /// Look up a redirect registered for a site path
    async fn find_redirect(&self, _from: &str) -> Result<Option<Redirect>, StoreError> {
        Ok(None)
    }
}

/// Slugs of every published post, used to enumerate pages ahead of time
pub async fn published_slugs(
    store: &dyn ContentStore,
    limit: usize,
) -> Result<Vec<String>, StoreError> {
    let posts = store.find(&Query::posts().limit(limit)).await?;
    Ok(posts
        .into_iter()
        .map(|p| p.slug)
        .filter(|slug| !slug.is_empty())
        .collect())
}
