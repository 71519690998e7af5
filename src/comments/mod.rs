//! Visitor comments
//!
//! Server side, [`submit`] validates a posted form and hands it to the content
//! store. Client side, [`CommentForm`] tracks the form's submission state and
//! [`CommentClient`] speaks the form-encoded wire contract.

mod client;
mod form;

pub use client::{CommentClient, SubmitOutcome};
pub use form::{CommentForm, SubmissionState, Submission};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CommentsConfig;
use crate::content::Comment;
use crate::store::{ContentStore, StoreError};

/// Errors from accepting a comment
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Form fields as posted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentInput {
    pub name: String,
    pub comment: String,
}

/// A validated comment, ready for the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    name: String,
    comment: String,
}

impl NewComment {
    /// Trim and validate posted fields. Both are required.
    pub fn parse(input: CommentInput, limits: &CommentsConfig) -> Result<Self, CommentError> {
        let name = input.name.trim();
        let comment = input.comment.trim();

        if name.is_empty() {
            return Err(CommentError::Invalid("name is required".to_string()));
        }
        if comment.is_empty() {
            return Err(CommentError::Invalid("comment is required".to_string()));
        }
        if name.chars().count() > limits.max_name_length {
            return Err(CommentError::Invalid(format!(
                "name must be at most {} characters",
                limits.max_name_length
            )));
        }
        if comment.chars().count() > limits.max_comment_length {
            return Err(CommentError::Invalid(format!(
                "comment must be at most {} characters",
                limits.max_comment_length
            )));
        }

        Ok(Self {
            name: name.to_string(),
            comment: comment.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

/// Validate a posted comment and persist it on the post with `slug`
pub async fn submit(
    store: &dyn ContentStore,
    slug: &str,
    input: CommentInput,
    limits: &CommentsConfig,
) -> Result<Comment, CommentError> {
    let comment = NewComment::parse(input, limits)?;
    let stored = store.add_comment(slug, comment).await?;
    tracing::info!("Stored comment by {:?} on {}", stored.name, slug);
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Post;
    use crate::store::MemoryStore;

    fn input(name: &str, comment: &str) -> CommentInput {
        CommentInput {
            name: name.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_fields_are_trimmed() {
        let parsed = NewComment::parse(input("  Ada ", "\nGreat post!\n"), &CommentsConfig::default())
            .unwrap();
        assert_eq!(parsed.name(), "Ada");
        assert_eq!(parsed.comment(), "Great post!");
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let limits = CommentsConfig::default();
        assert!(matches!(
            NewComment::parse(input("", "text"), &limits),
            Err(CommentError::Invalid(_))
        ));
        assert!(matches!(
            NewComment::parse(input("Ada", "   "), &limits),
            Err(CommentError::Invalid(_))
        ));
    }

    #[test]
    fn test_length_limits() {
        let limits = CommentsConfig {
            max_name_length: 3,
            max_comment_length: 5,
            ..CommentsConfig::default()
        };
        assert!(NewComment::parse(input("Ada", "hello"), &limits).is_ok());
        assert!(NewComment::parse(input("Adam", "hello"), &limits).is_err());
        assert!(NewComment::parse(input("Ada", "hello!"), &limits).is_err());
    }

    #[tokio::test]
    async fn test_submit_appends_to_post() {
        let store = MemoryStore::new(vec![Post::new("1", "intro", "Intro")]);
        let stored = submit(&store, "intro", input("Ada", "Great post!"), &CommentsConfig::default())
            .await
            .unwrap();
        assert_eq!(stored.name, "Ada");
        assert!(stored.created_at.is_some());

        let posts = store.snapshot().unwrap();
        assert_eq!(posts[0].comments.len(), 1);
        assert_eq!(posts[0].comments[0].comment, "Great post!");
    }

    #[tokio::test]
    async fn test_submit_to_unknown_post() {
        let store = MemoryStore::default();
        let err = submit(&store, "missing", input("Ada", "Hi"), &CommentsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::Store(StoreError::PostNotFound(_))));
    }
}
