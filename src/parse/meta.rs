//! Meta-tag extraction strategy.
//!
//! Cheapest and most authoritative surface: two document-level meta tags.
//! No scanning state is kept; both tags are re-read on every call.

use crate::doc::Doc;
use crate::dom;
use crate::PageConfig;

const PRODUCT_ID_META: &str = "subscriptions-product-id";
const ACCESSIBLE_FOR_FREE_META: &str = "subscriptions-accessible-for-free";

pub(crate) struct MetaParser;

impl MetaParser {
    pub fn new() -> Self {
        MetaParser
    }

    pub fn check(&self, doc: &impl Doc) -> Option<PageConfig> {
        if !doc.has_body() {
            // Wait until the whole head is parsed.
            return None;
        }
        doc.with_html(|html| {
            let product_id =
                dom::get_meta_tag(html, PRODUCT_ID_META).filter(|id| !id.is_empty())?;

            // Only the literal "false" (any case) locks the page.
            let locked = dom::get_meta_tag(html, ACCESSIBLE_FOR_FREE_META)
                .map(|value| value.eq_ignore_ascii_case("false"))
                .unwrap_or(false);

            Some(PageConfig::new(product_id, locked))
        })
    }
}
