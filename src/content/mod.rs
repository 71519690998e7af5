//! Content module - post documents and body rendering

mod frontmatter;
mod markdown;
mod post;
pub mod richtext;

pub use frontmatter::FrontMatter;
pub use markdown::MarkdownRenderer;
pub use post::{
    Body, Comment, DocumentId, Media, Meta, Post, PostDocument, RelatedPost, Relation, Status,
};
pub use richtext::RichText;
