//! Post lookup by slug, memoized per request

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::content::Post;
use crate::store::{ContentStore, Query, StoreError};

type Slot = Arc<OnceCell<Option<Arc<Post>>>>;

/// Lookups already made while handling one request, keyed by `(slug, draft)`.
///
/// Callers that ask for the same key share one store query, whether they run
/// one after the other or concurrently. Failed lookups leave the slot empty so
/// a later caller tries again.
#[derive(Debug, Default)]
pub struct RequestCache {
    slots: Mutex<HashMap<(String, bool), Slot>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, slug: &str, draft: bool) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry((slug.to_string(), draft))
            .or_default()
            .clone()
    }

    /// Number of keys looked up so far
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Finds posts by slug for one render pass
pub struct PostResolver {
    store: Arc<dyn ContentStore>,
    cache: RequestCache,
}

impl PostResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            cache: RequestCache::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// The post with `slug`, or `None` when there is no visible one.
    ///
    /// Drafts are only visible when `draft` is set. An empty slug never
    /// reaches the store.
    pub async fn resolve(&self, slug: &str, draft: bool) -> Result<Option<Arc<Post>>, StoreError> {
        if slug.is_empty() {
            return Ok(None);
        }

        let slot = self.cache.slot(slug, draft);
        let post = slot
            .get_or_try_init(|| async {
                let query = Query::posts()
                    .where_slug(slug)
                    .limit(1)
                    .draft(draft)
                    .override_access(draft);
                let found = self.store.find(&query).await?;
                tracing::debug!("Resolved {:?} (draft: {}): {} match", slug, draft, found.len());
                Ok::<_, StoreError>(found.into_iter().next().map(Arc::new))
            })
            .await?;

        Ok(post.clone())
    }
}
