//! In-memory content store

use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

use super::{ContentStore, Query, Redirect, StoreError};
use crate::comments::NewComment;
use crate::content::{Comment, Post};

/// Posts and redirects held in memory.
///
/// Also serves as the query engine for [`super::FileStore`], which loads a
/// snapshot of the content directory into one of these.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: RwLock<Vec<Post>>,
    redirects: RwLock<Vec<Redirect>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
            redirects: RwLock::new(Vec::new()),
        }
    }

    pub fn with_redirects(self, redirects: Vec<Redirect>) -> Self {
        Self {
            redirects: RwLock::new(redirects),
            ..self
        }
    }

    pub fn insert(&self, post: Post) -> Result<(), StoreError> {
        self.posts.write().map_err(poisoned)?.push(post);
        Ok(())
    }

    /// Copy of every stored post, drafts included
    pub fn snapshot(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.posts.read().map_err(poisoned)?.clone())
    }

    pub(super) fn find_sync(&self, query: &Query) -> Result<Vec<Post>, StoreError> {
        let posts = self.posts.read().map_err(poisoned)?;
        Ok(query.apply(posts.iter()))
    }

    pub(super) fn redirect_sync(&self, from: &str) -> Result<Option<Redirect>, StoreError> {
        let redirects = self.redirects.read().map_err(poisoned)?;
        Ok(redirects.iter().find(|r| r.from == from).cloned())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find(&self, query: &Query) -> Result<Vec<Post>, StoreError> {
        self.find_sync(query)
    }

    async fn add_comment(&self, slug: &str, comment: NewComment) -> Result<Comment, StoreError> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        let post = posts
            .iter_mut()
            .find(|p| p.slug == slug && !p.is_draft())
            .ok_or_else(|| StoreError::PostNotFound(slug.to_string()))?;

        let stored = Comment {
            id: None,
            name: comment.name().to_string(),
            comment: comment.comment().to_string(),
            created_at: Some(Utc::now()),
        };
        post.comments.push(stored.clone());
        Ok(stored)
    }

    async fn find_redirect(&self, from: &str) -> Result<Option<Redirect>, StoreError> {
        self.redirect_sync(from)
    }
}
