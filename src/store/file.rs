//! Content-directory store
//!
//! Layout under the content root:
//!
//! ```text
//! posts/*.json        post documents in the CMS wire shape
//! posts/*.md          markdown posts with YAML front-matter
//! comments/<slug>.json  comments appended by visitors
//! redirects.yml       list of { from, to }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use walkdir::WalkDir;

use super::{ContentStore, MemoryStore, Query, Redirect, StoreError};
use crate::comments::NewComment;
use crate::content::{Comment, FrontMatter, Post, PostDocument, RelatedPost, Relation};
use crate::helpers::is_url_safe_slug;

/// Store backed by a local content directory. Every read scans the directory,
/// so edits show up without a restart.
pub struct FileStore {
    root: PathBuf,
    /// Serializes comment appends
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the whole directory into memory
    pub fn load(&self) -> Result<MemoryStore, StoreError> {
        load_dir(&self.root)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || f(&root))
            .await
            .map_err(|e| StoreError::Unavailable(format!("content loader panicked: {}", e)))?
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn find(&self, query: &Query) -> Result<Vec<Post>, StoreError> {
        let query = query.clone();
        self.blocking(move |root| load_dir(root)?.find_sync(&query))
            .await
    }

    async fn add_comment(&self, slug: &str, comment: NewComment) -> Result<Comment, StoreError> {
        let _guard = self.write_lock.lock().await;
        let slug = slug.to_string();
        self.blocking(move |root| append_comment(root, &slug, comment))
            .await
    }

    async fn find_redirect(&self, from: &str) -> Result<Option<Redirect>, StoreError> {
        let from = from.to_string();
        self.blocking(move |root| {
            Ok(read_redirects(root)?.into_iter().find(|r| r.from == from))
        })
        .await
    }
}

fn unavailable(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), e))
}

fn load_dir(root: &Path) -> Result<MemoryStore, StoreError> {
    let mut posts = load_posts(&root.join("posts"))?;

    for post in &mut posts {
        if !is_url_safe_slug(&post.slug) {
            continue;
        }
        match read_comments(&comments_path(root, &post.slug)) {
            Ok(comments) => post.comments.extend(comments),
            Err(StoreError::Malformed(reason)) => {
                tracing::warn!("Skipping comments for {:?}: {}", post.slug, reason);
            }
            Err(e) => return Err(e),
        }
    }
    link_related(&mut posts);

    Ok(MemoryStore::new(posts).with_redirects(read_redirects(root)?))
}

fn load_posts(dir: &Path) -> Result<Vec<Post>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut posts = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| unavailable(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let loaded = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => load_json_post(path),
            Some("md") | Some("markdown") => load_markdown_post(path),
            _ => continue,
        };

        match loaded {
            Ok(post) => posts.push(post),
            Err(StoreError::Malformed(reason)) => {
                tracing::warn!("Skipping post {:?}: {}", path, reason);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(posts)
}

fn load_json_post(path: &Path) -> Result<Post, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    let doc: PostDocument =
        serde_json::from_str(&content).map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(doc.into())
}

fn load_markdown_post(path: &Path) -> Result<Post, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    let (fm, body) =
        FrontMatter::parse(&content).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled");
    Ok(fm.into_document(stem, body).into())
}

/// Populate related-post references that point at loaded posts, by id or slug
fn link_related(posts: &mut [Post]) {
    let mut index: HashMap<String, RelatedPost> = HashMap::new();
    for post in posts.iter().filter(|p| !p.is_draft()) {
        let related = RelatedPost::from(post);
        index.insert(post.slug.clone(), related.clone());
        index.insert(post.id.to_string(), related);
    }

    for post in posts.iter_mut() {
        for relation in &mut post.related_posts {
            if let Relation::Unresolved(id) = relation {
                if let Some(found) = index.get(id.as_str()) {
                    *relation = Relation::Resolved(found.clone());
                }
            }
        }
    }
}

fn comments_path(root: &Path, slug: &str) -> PathBuf {
    root.join("comments").join(format!("{}.json", slug))
}

fn read_comments(path: &Path) -> Result<Vec<Comment>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(unavailable(path, e)),
    }
}

fn read_redirects(root: &Path) -> Result<Vec<Redirect>, StoreError> {
    let path = root.join("redirects.yml");
    match fs::read_to_string(&path) {
        Ok(content) => serde_yaml::from_str(&content)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(unavailable(&path, e)),
    }
}

fn append_comment(root: &Path, slug: &str, comment: NewComment) -> Result<Comment, StoreError> {
    if !is_url_safe_slug(slug) {
        return Err(StoreError::PostNotFound(slug.to_string()));
    }

    let exists = !load_dir(root)?
        .find_sync(&Query::posts().where_slug(slug).limit(1))?
        .is_empty();
    if !exists {
        return Err(StoreError::PostNotFound(slug.to_string()));
    }

    let path = comments_path(root, slug);
    let mut comments = read_comments(&path)?;
    let stored = Comment {
        id: None,
        name: comment.name().to_string(),
        comment: comment.comment().to_string(),
        created_at: Some(Utc::now()),
    };
    comments.push(stored.clone());

    let dir = root.join("comments");
    fs::create_dir_all(&dir).map_err(|e| unavailable(&dir, e))?;

    let json = serde_json::to_string_pretty(&comments)
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| unavailable(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| unavailable(&path, e))?;

    tracing::debug!("Appended comment to {:?}", path);
    Ok(stored)
}
