//! Helper functions shared by pages, templates and stores

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
