//! RFox Page Configuration Resolver
//!
//! Discovers a page's subscription configuration (a product id and a
//! free/paid access flag) from an HTML document that may embed it in any of
//! three surfaces: document-level meta tags, embedded JSON-LD blocks, or
//! inline microdata annotations. The document may still be streaming in;
//! resolution runs repeatedly against the growing parse and never reports a
//! wrong answer from partial content.
//!
//! # Example
//!
//! ```
//! use rfpageconfig::{PageConfigResolver, StreamingDoc};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rfpageconfig::Result<()> {
//! let doc = StreamingDoc::complete(
//!     "<html><head>\
//!      <meta name=\"subscriptions-product-id\" content=\"pub1:basic\">\
//!      </head><body></body></html>",
//! );
//! let resolver = PageConfigResolver::new(&doc);
//! let config = resolver.resolve_config().await?;
//! assert_eq!(config.product_id(), "pub1:basic");
//! assert!(!config.locked());
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

pub mod error;
pub use error::{Error, Result};

pub mod doc;
pub use doc::{Doc, StreamingDoc};

mod dom;
mod parse;

pub mod resolver;
pub use resolver::{get_control_flag, PageConfigResolver};

/// A discovered page configuration.
///
/// Created exactly once by whichever extraction strategy succeeds first and
/// never mutated afterwards. The product id is non-empty by construction of
/// the parsers; `locked` means access is not free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    product_id: String,
    locked: bool,
}

impl PageConfig {
    pub fn new(product_id: impl Into<String>, locked: bool) -> Self {
        Self {
            product_id: product_id.into(),
            locked,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Publication part of the product id: the prefix before the first `:`,
    /// or the whole id when there is none.
    pub fn publication_id(&self) -> &str {
        match self.product_id.split_once(':') {
            Some((publication, _)) => publication,
            None => &self.product_id,
        }
    }

    /// Product label: the suffix after the first `:`, when present.
    pub fn label(&self) -> Option<&str> {
        self.product_id.split_once(':').map(|(_, label)| label)
    }
}
