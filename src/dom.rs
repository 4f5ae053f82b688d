//! Small tree-query helpers shared by the extraction strategies.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};

/// Returns the `content` attribute of the first `<meta name="...">` match.
pub(crate) fn get_meta_tag(html: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[name=\"{}\"]", name)).ok()?;
    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

/// Whether anything exists after this node in document order: a next sibling
/// of the node itself or of any of its ancestors.
///
/// While the document is still streaming, a node with a successor is one the
/// parser has provably moved past, so its content can be trusted not to be
/// truncated.
pub(crate) fn has_next_node_in_document_order(node: NodeRef<'_, Node>) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.next_sibling().is_some() {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Nearest self-or-ancestor element carrying both `itemscope` and `itemtype`.
pub(crate) fn closest_item_scope(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut node = Some(*element);
    while let Some(current) = node {
        if let Some(el) = ElementRef::wrap(current) {
            let value = el.value();
            if value.attr("itemscope").is_some() && value.attr("itemtype").is_some() {
                return Some(el);
            }
        }
        node = current.parent();
    }
    None
}
