//! HTTP client for the comment endpoint

use anyhow::{Context, Result};
use std::time::Duration;

use super::CommentForm;
use crate::helpers::encode_path_segment;

/// Result of one submission, as the visitor sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    Failure,
}

/// Posts comments to a running blog server
pub struct CommentClient {
    http: reqwest::Client,
    base_url: String,
}

impl CommentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for comments on the post with `slug`
    pub fn endpoint(&self, slug: &str) -> String {
        format!(
            "{}/api/posts/{}/comment",
            self.base_url,
            encode_path_segment(slug)
        )
    }

    /// Send one comment. Any 2xx is a success; everything else, including
    /// transport errors, is a failure. Nothing is retried.
    pub async fn submit(&self, slug: &str, name: &str, comment: &str) -> SubmitOutcome {
        let url = self.endpoint(slug);
        let result = self
            .http
            .post(&url)
            .form(&[("name", name), ("comment", comment)])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => SubmitOutcome::Success,
            Ok(response) => {
                tracing::warn!("Comment rejected by {}: {}", url, response.status());
                SubmitOutcome::Failure
            }
            Err(e) => {
                tracing::warn!("Comment request to {} failed: {}", url, e);
                SubmitOutcome::Failure
            }
        }
    }

    /// Drive a form through one submit cycle. Returns `None` when the form
    /// refused to start (already pending or missing fields).
    pub async fn submit_form(&self, form: &mut CommentForm) -> Option<SubmitOutcome> {
        let submission = form.begin_submit()?;
        let outcome = self
            .submit(&submission.slug, &submission.name, &submission.comment)
            .await;
        form.complete(outcome);
        Some(outcome)
    }
}
