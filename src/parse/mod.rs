//! The three competing extraction strategies.
//!
//! Each parser exposes a `check` that returns either a discovered
//! [`PageConfig`](crate::PageConfig) or `None` for "not yet determined".
//! All three are safe to run repeatedly against a half-parsed document; the
//! coordinator invokes them in a fixed priority order (meta tags, then
//! linked data, then microdata).

pub(crate) mod json_ld;
pub(crate) mod meta;
pub(crate) mod microdata;

/// schema.org type name carried by article markup.
pub(crate) const NEWS_ARTICLE_TYPE: &str = "NewsArticle";
/// schema.org type name carried by the product relation.
pub(crate) const PRODUCT_TYPE: &str = "Product";
/// Namespace prefix accepted wherever a bare type name is.
pub(crate) const SCHEMA_ORG_PREFIX: &str = "http://schema.org/";
