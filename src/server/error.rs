//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::comments::CommentError;
use crate::pages::{PageError, PageRenderer};
use crate::store::StoreError;

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Store(e) => AppError::Store(e),
            PageError::Render(e) => AppError::Render(e),
        }
    }
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::Invalid(message) => AppError::Validation(message),
            CommentError::Store(StoreError::PostNotFound(_)) => AppError::NotFound,
            CommentError::Store(e) => AppError::Store(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::Store(StoreError::PostNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::Rejected { .. } | StoreError::Malformed(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a visitor. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::SERVICE_UNAVAILABLE => {
                "The content store is unavailable. Please try again later.".to_string()
            }
            status if status.is_server_error() => "Something went wrong.".to_string(),
            _ => self.to_string(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
    }

    /// Render as an HTML error page
    pub fn into_page(self, pages: &PageRenderer) -> Response {
        self.log();
        let status = self.status();
        let html = if status == StatusCode::NOT_FOUND {
            pages
                .not_found_page(false)
                .unwrap_or_else(|_| pages.error_page(status.as_u16(), "Not found"))
        } else {
            pages.error_page(status.as_u16(), &self.public_message())
        };
        (status, Html(html)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let body = json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(CommentError::Invalid("name is required".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CommentError::Store(StoreError::PostNotFound("x".into()))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(StoreError::Rejected {
                status: 400,
                message: "bad".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("template exploded")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(anyhow::anyhow!("template exploded"));
        assert_eq!(err.public_message(), "Something went wrong.");

        let err = AppError::Validation("name is required".into());
        assert_eq!(err.public_message(), "name is required");
    }
}
