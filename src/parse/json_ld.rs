//! Linked-data (JSON-LD) extraction strategy.
//!
//! Scans `script[type="application/ld+json"]` blocks in document order for a
//! `NewsArticle` item whose `isPartOf` relation names a `Product` with a
//! `productID`. Blocks are marked seen once evaluated so repeated trigger
//! calls never re-parse them; a block rejected once is rejected for good.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::Selector;
use serde_json::Value;

use crate::doc::Doc;
use crate::dom;
use crate::parse::{NEWS_ARTICLE_TYPE, PRODUCT_TYPE, SCHEMA_ORG_PREFIX};
use crate::PageConfig;

const LD_JSON_SELECTOR: &str = "script[type=\"application/ld+json\"]";

pub(crate) struct JsonLdParser {
    seen: HashSet<NodeId>,
    /// Number of structural parse attempts; the substring pre-filter keeps
    /// this from growing on blocks that cannot possibly match.
    parse_attempts: usize,
}

impl JsonLdParser {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            parse_attempts: 0,
        }
    }

    pub fn check(&mut self, doc: &impl Doc) -> Option<PageConfig> {
        if !doc.has_body() {
            // Wait until the whole head is parsed.
            return None;
        }
        let ready = doc.is_ready();
        doc.with_html(|html| {
            let selector = Selector::parse(LD_JSON_SELECTOR).unwrap();
            for element in html.select(&selector) {
                if self.seen.contains(&element.id()) {
                    continue;
                }
                let text: String = element.text().collect();
                if text.is_empty() {
                    continue;
                }
                // Mid-parse, a block with nothing after it may still be
                // streaming in; skip it without marking so it is retried.
                if !ready && !dom::has_next_node_in_document_order(*element) {
                    continue;
                }
                self.seen.insert(element.id());
                if !text.contains(NEWS_ARTICLE_TYPE) {
                    continue;
                }
                if let Some(config) = self.try_extract_config(&text) {
                    return Some(config);
                }
            }
            None
        })
    }

    fn try_extract_config(&mut self, text: &str) -> Option<PageConfig> {
        self.parse_attempts += 1;
        let json = try_parse_json(text)?;

        // Must be a NewsArticle.
        if !check_type(&json, NEWS_ARTICLE_TYPE) {
            return None;
        }

        // Must have an isPartOf[@type=Product] with a productID.
        let mut product_id = None;
        for part in value_array(&json, "isPartOf") {
            product_id = discover_product_id(part);
            if product_id.is_some() {
                break;
            }
        }
        let product_id = product_id?;

        // Product id found; only the access flag remains.
        let accessible_for_free =
            bool_value(single_value(&json, "isAccessibleForFree"), /* default */ true);

        Some(PageConfig::new(product_id, !accessible_for_free))
    }
}

/// Parses leniently: malformed input is a non-match, never an error.
fn try_parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Normalizes a property to a sequence: absent/null/empty-string become the
/// empty sequence, a bare value becomes a one-element sequence.
fn value_array<'a>(json: &'a Value, name: &str) -> Vec<&'a Value> {
    match json.get(name) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
    }
}

fn single_value<'a>(json: &'a Value, name: &str) -> Option<&'a Value> {
    match value_array(json, name).into_iter().next()? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        value => Some(value),
    }
}

/// Whether `@type` contains the expected type, bare or in its schema.org
/// URI form.
fn check_type(json: &Value, expected: &str) -> bool {
    let namespaced = format!("{}{}", SCHEMA_ORG_PREFIX, expected);
    value_array(json, "@type")
        .iter()
        .any(|v| v.as_str().map_or(false, |s| s == expected || s == namespaced))
}

fn discover_product_id(json: &Value) -> Option<String> {
    if !check_type(json, PRODUCT_TYPE) {
        return None;
    }
    single_value(json, "productID")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn bool_value(value: Option<&Value>, default: bool) -> bool {
    match value {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            if s.eq_ignore_ascii_case("true") {
                true
            } else if s.eq_ignore_ascii_case("false") {
                false
            } else {
                default
            }
        }
        Some(_) => default,
    }
}
