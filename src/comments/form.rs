//! Client-side comment form state

use super::SubmitOutcome;

/// Where the form is in its submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    /// A request is in flight; further submits are ignored
    Pending,
    /// The last submission was accepted
    Submitted,
    /// The last submission was rejected; fields keep their values
    Failed,
}

/// The values carried by one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub slug: String,
    pub name: String,
    pub comment: String,
}

/// A comment form bound to one post
#[derive(Debug, Clone)]
pub struct CommentForm {
    slug: String,
    name: String,
    comment: String,
    state: SubmissionState,
}

impl CommentForm {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: String::new(),
            comment: String::new(),
            state: SubmissionState::Idle,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// The "thanks for your comment" flag
    pub fn succeeded(&self) -> bool {
        self.state == SubmissionState::Submitted
    }

    /// Whether the submit button is enabled
    pub fn can_submit(&self) -> bool {
        self.state != SubmissionState::Pending
    }

    /// Start a submission. Returns `None` while one is already in flight or
    /// when a required field is blank.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        if !self.can_submit() || self.name.trim().is_empty() || self.comment.trim().is_empty() {
            return None;
        }

        self.state = SubmissionState::Pending;
        Some(Submission {
            slug: self.slug.clone(),
            name: self.name.clone(),
            comment: self.comment.clone(),
        })
    }

    /// Finish the in-flight submission. Success clears the fields.
    pub fn complete(&mut self, outcome: SubmitOutcome) {
        if self.state != SubmissionState::Pending {
            return;
        }

        match outcome {
            SubmitOutcome::Success => {
                self.name.clear();
                self.comment.clear();
                self.state = SubmissionState::Submitted;
            }
            SubmitOutcome::Failure => self.state = SubmissionState::Failed,
        }
    }
}
