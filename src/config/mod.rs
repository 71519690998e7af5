//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::CommentsConfig;
pub use site::HighlightConfig;
pub use site::ListingConfig;
pub use site::StoreConfig;
pub use site::StoreKind;
