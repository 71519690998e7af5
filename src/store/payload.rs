//! Payload CMS REST backend

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentStore, Query, Redirect, StoreError};
use crate::comments::NewComment;
use crate::content::{Comment, Post, PostDocument};
use crate::helpers::encode_path_segment;

/// Talks to a Payload CMS over its REST API
pub struct PayloadStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Envelope of a `find` response
#[derive(Debug, Deserialize)]
struct FindResponse<T> {
    #[serde(default = "Vec::new")]
    docs: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RedirectDocument {
    from: String,
    to: RedirectTarget,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RedirectTarget {
    url: Option<String>,
    reference: Option<RedirectReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedirectReference {
    #[serde(default)]
    relation_to: Option<String>,
    value: serde_json::Value,
}

impl RedirectDocument {
    /// Site path the redirect points at. Only custom URLs and populated
    /// references can be followed.
    fn location(&self) -> Option<String> {
        if let Some(url) = self.to.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }

        let reference = self.to.reference.as_ref()?;
        let slug = reference.value.get("slug")?.as_str()?;
        match reference.relation_to.as_deref() {
            Some("pages") => Some(format!("/{}", slug)),
            _ => Some(format!("/posts/{}", slug)),
        }
    }
}

impl PayloadStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder, override_access: bool) -> RequestBuilder {
        match (&self.api_key, override_access) {
            (Some(key), true) => request.header("Authorization", format!("users API-Key {}", key)),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(status_error(status, message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let url = response.url().to_string();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Malformed(format!("response from {}: {}", url, e)))
    }
}

fn status_error(status: StatusCode, message: String) -> StoreError {
    if status.is_server_error() {
        StoreError::Unavailable(format!("{}: {}", status, message))
    } else {
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// REST query parameters for a find
fn find_params(query: &Query) -> Vec<(&'static str, String)> {
    let mut params = vec![("depth", "1".to_string())];
    if let Some(slug) = &query.slug {
        params.push(("where[slug][equals]", slug.clone()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(sort) = query.sort {
        params.push(("sort", sort.to_string()));
    }
    params.push(("draft", query.draft.to_string()));
    params
}

#[async_trait]
impl ContentStore for PayloadStore {
    async fn find(&self, query: &Query) -> Result<Vec<Post>, StoreError> {
        let request = self
            .http
            .get(self.url(query.collection))
            .query(&find_params(query));
        let request = self.authorize(request, query.override_access);

        let response = self.send(request).await?;
        let found: FindResponse<PostDocument> = Self::decode(response).await?;

        // Drafts stay hidden unless the query may see them
        let posts: Vec<Post> = found.docs.into_iter().map(Post::from).collect();
        Ok(query.apply(&posts))
    }

    async fn add_comment(&self, slug: &str, comment: NewComment) -> Result<Comment, StoreError> {
        let url = self.url(&format!("posts/{}/comment", encode_path_segment(slug)));
        let request = self
            .http
            .post(&url)
            .form(&[("name", comment.name()), ("comment", comment.comment())]);

        let response = match self.send(request).await {
            Err(StoreError::Rejected { status: 404, .. }) => {
                return Err(StoreError::PostNotFound(slug.to_string()))
            }
            other => other?,
        };

        // The endpoint may echo the stored comment; otherwise keep what we sent
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Comment>(&body) {
            Ok(stored) => Ok(stored),
            Err(_) => Ok(Comment {
                id: None,
                name: comment.name().to_string(),
                comment: comment.comment().to_string(),
                created_at: None,
            }),
        }
    }

    async fn find_redirect(&self, from: &str) -> Result<Option<Redirect>, StoreError> {
        let request = self.http.get(self.url("redirects")).query(&[
            ("where[from][equals]", from),
            ("limit", "1"),
            ("depth", "1"),
        ]);

        let response = self.send(request).await?;
        let found: FindResponse<RedirectDocument> = Self::decode(response).await?;

        Ok(found.docs.into_iter().find_map(|doc| {
            let to = doc.location()?;
            Some(Redirect { from: doc.from, to })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_params() {
        let query = Query::posts()
            .where_slug("intro")
            .limit(1)
            .sort("-publishedAt".parse().unwrap())
            .draft(true);
        let params = find_params(&query);

        assert!(params.contains(&("where[slug][equals]", "intro".to_string())));
        assert!(params.contains(&("limit", "1".to_string())));
        assert!(params.contains(&("sort", "-publishedAt".to_string())));
        assert!(params.contains(&("draft", "true".to_string())));
        assert!(params.contains(&("depth", "1".to_string())));
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, String::new()),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            StoreError::Rejected { status: 403, .. }
        ));
    }

    #[test]
    fn test_redirect_location() {
        let custom: RedirectDocument =
            serde_json::from_str(r#"{"from": "/old", "to": {"type": "custom", "url": "/posts/new"}}"#)
                .unwrap();
        assert_eq!(custom.location().as_deref(), Some("/posts/new"));

        let reference: RedirectDocument = serde_json::from_str(
            r#"{"from": "/old", "to": {"type": "reference",
                "reference": {"relationTo": "posts", "value": {"id": 3, "slug": "intro"}}}}"#,
        )
        .unwrap();
        assert_eq!(reference.location().as_deref(), Some("/posts/intro"));

        let unpopulated: RedirectDocument = serde_json::from_str(
            r#"{"from": "/old", "to": {"reference": {"relationTo": "posts", "value": 3}}}"#,
        )
        .unwrap();
        assert_eq!(unpopulated.location(), None);
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = PayloadStore::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = store.find(&Query::posts()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
