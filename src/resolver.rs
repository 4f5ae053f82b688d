//! Resolution coordinator: runs the three extraction strategies against the
//! document and delivers the first success through a single-assignment cell.

use std::cell::RefCell;

use log::debug;
use scraper::{Html, Selector};
use tokio::sync::Notify;

use crate::doc::Doc;
use crate::dom;
use crate::error::{Error, Result};
use crate::parse::json_ld::JsonLdParser;
use crate::parse::meta::MetaParser;
use crate::parse::microdata::MicrodataParser;
use crate::PageConfig;

const CONTROL_FLAG: &str = "subscriptions-control";

#[derive(Debug)]
enum CellState {
    Pending,
    Resolved(PageConfig),
    Rejected,
}

/// Single-assignment asynchronous result slot. Transitions exactly once;
/// every attempt after the first is a no-op.
struct ConfigCell {
    state: RefCell<CellState>,
    transitioned: Notify,
}

impl ConfigCell {
    fn new() -> Self {
        Self {
            state: RefCell::new(CellState::Pending),
            transitioned: Notify::new(),
        }
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), CellState::Pending)
    }

    fn resolve(&self, config: PageConfig) -> bool {
        self.transition(CellState::Resolved(config))
    }

    fn reject(&self) -> bool {
        self.transition(CellState::Rejected)
    }

    fn transition(&self, next: CellState) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, CellState::Pending) {
                return false;
            }
            *state = next;
        }
        self.transitioned.notify_waiters();
        true
    }

    fn outcome(&self) -> Option<Result<PageConfig>> {
        match &*self.state.borrow() {
            CellState::Pending => None,
            CellState::Resolved(config) => Some(Ok(config.clone())),
            CellState::Rejected => Some(Err(Error::ConfigNotFound)),
        }
    }

    async fn wait(&self) -> Result<PageConfig> {
        loop {
            // Register before checking so a transition between the check and
            // the await cannot be missed.
            let transitioned = self.transitioned.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            transitioned.await;
        }
    }
}

/// Discovers the page configuration from a possibly still-streaming document.
///
/// Three strategies compete in a fixed priority order: meta tags (cheapest
/// and most authoritative), then linked data, then microdata. [`check`] is
/// idempotent and may run any number of times; only the first success, or the
/// failure once the document has fully parsed, is observable.
///
/// [`check`]: PageConfigResolver::check
pub struct PageConfigResolver<'a, D: Doc> {
    doc: &'a D,
    cell: ConfigCell,
    meta: MetaParser,
    json_ld: RefCell<JsonLdParser>,
    microdata: RefCell<MicrodataParser>,
}

impl<'a, D: Doc> PageConfigResolver<'a, D> {
    pub fn new(doc: &'a D) -> Self {
        Self {
            doc,
            cell: ConfigCell::new(),
            meta: MetaParser::new(),
            json_ld: RefCell::new(JsonLdParser::new()),
            microdata: RefCell::new(MicrodataParser::new()),
        }
    }

    /// Resolves the page configuration.
    ///
    /// Attempts a [`check`] on the next scheduling tick and again when the
    /// document signals parse completion; completes as soon as the result
    /// cell transitions, including through an external `check` call.
    ///
    /// [`check`]: PageConfigResolver::check
    pub async fn resolve_config(&self) -> Result<PageConfig> {
        let triggers = async {
            tokio::task::yield_now().await;
            self.check();
            self.doc.when_ready().await;
            self.check();
        };
        tokio::select! {
            outcome = self.cell.wait() => outcome,
            // After the ready-trigger check the cell can no longer be
            // pending, so this wait returns immediately.
            () = triggers => self.cell.wait().await,
        }
    }

    /// Runs the strategies once, in priority order. Returns the discovered
    /// configuration, or `None` when nothing was determined on this pass or
    /// the cell has already transitioned.
    pub fn check(&self) -> Option<PageConfig> {
        if !self.cell.is_pending() {
            return None;
        }

        let config = self
            .meta
            .check(self.doc)
            .or_else(|| self.json_ld.borrow_mut().check(self.doc))
            .or_else(|| self.microdata.borrow_mut().check(self.doc));

        if let Some(config) = config {
            debug!("resolved page config for product {:?}", config.product_id());
            self.cell.resolve(config.clone());
            return Some(config);
        }
        if self.doc.is_ready() {
            debug!("document fully parsed with no discoverable page config");
            self.cell.reject();
        }
        None
    }
}

/// Reads the control flag collaborators branch behavior on: a meta tag of
/// the fixed name first, then the same-named attribute on a script element.
/// Not part of configuration resolution.
pub fn get_control_flag(html: &Html) -> Option<String> {
    if let Some(flag) = dom::get_meta_tag(html, CONTROL_FLAG) {
        if !flag.is_empty() {
            return Some(flag);
        }
    }
    let selector = Selector::parse(&format!("script[{}]", CONTROL_FLAG)).unwrap();
    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr(CONTROL_FLAG))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::StreamingDoc;

    #[test]
    fn cell_transitions_exactly_once() {
        let cell = ConfigCell::new();
        assert!(cell.is_pending());
        assert!(cell.resolve(PageConfig::new("pub:a", false)));
        assert!(!cell.resolve(PageConfig::new("pub:b", true)));
        assert!(!cell.reject());
        match cell.outcome() {
            Some(Ok(config)) => assert_eq!(config.product_id(), "pub:a"),
            other => panic!("unexpected outcome: {:?}", other.map(|r| r.is_ok())),
        }
    }

    #[test]
    fn cell_reject_is_terminal() {
        let cell = ConfigCell::new();
        assert!(cell.reject());
        assert!(!cell.resolve(PageConfig::new("pub:late", false)));
        assert!(matches!(cell.outcome(), Some(Err(Error::ConfigNotFound))));
    }

    #[test]
    fn meta_takes_priority_over_linked_data() {
        let doc = StreamingDoc::complete(
            "<html><head>\
             <meta name=\"subscriptions-product-id\" content=\"pub:meta\">\
             </head><body>\
             <script type=\"application/ld+json\">\
             {\"@type\":\"NewsArticle\",\"isPartOf\":{\"@type\":\"Product\",\"productID\":\"pub:ld\"}}\
             </script></body></html>",
        );
        let resolver = PageConfigResolver::new(&doc);
        let config = resolver.check().unwrap();
        assert_eq!(config.product_id(), "pub:meta");
    }

    #[test]
    fn check_is_noop_after_resolution() {
        let doc = StreamingDoc::complete(
            "<html><head>\
             <meta name=\"subscriptions-product-id\" content=\"pub:once\">\
             </head><body></body></html>",
        );
        let resolver = PageConfigResolver::new(&doc);
        assert!(resolver.check().is_some());
        assert!(resolver.check().is_none());
    }

    #[test]
    fn incomplete_document_stays_pending() {
        let doc = StreamingDoc::new();
        doc.append("<html><head></head><body><p>article text</p>");
        let resolver = PageConfigResolver::new(&doc);
        assert!(resolver.check().is_none());
        assert!(resolver.cell.is_pending());
    }

    #[test]
    fn complete_document_without_config_rejects() {
        let doc = StreamingDoc::complete("<html><head></head><body><p>nothing</p></body></html>");
        let resolver = PageConfigResolver::new(&doc);
        assert!(resolver.check().is_none());
        assert!(!resolver.cell.is_pending());
    }

    #[tokio::test]
    async fn resolve_config_completes_before_document_ready() {
        let doc = StreamingDoc::new();
        doc.append(
            "<html><head>\
             <meta name=\"subscriptions-product-id\" content=\"pub:early\">\
             </head><body><p>x</p>",
        );
        let resolver = PageConfigResolver::new(&doc);
        // The document never finishes; the soon-tick check alone resolves.
        let config = resolver.resolve_config().await.unwrap();
        assert_eq!(config.product_id(), "pub:early");
    }

    #[test]
    fn control_flag_prefers_meta_tag() {
        let html = Html::parse_document(
            "<html><head>\
             <meta name=\"subscriptions-control\" content=\"manual\">\
             <script subscriptions-control=\"experiments\"></script>\
             </head><body></body></html>",
        );
        assert_eq!(get_control_flag(&html).as_deref(), Some("manual"));
    }

    #[test]
    fn control_flag_falls_back_to_script_attribute() {
        let html = Html::parse_document(
            "<html><head>\
             <meta name=\"subscriptions-control\" content=\"\">\
             <script subscriptions-control=\"experiments\"></script>\
             </head><body></body></html>",
        );
        assert_eq!(get_control_flag(&html).as_deref(), Some("experiments"));
    }

    #[test]
    fn control_flag_absent() {
        let html = Html::parse_document("<html><head></head><body></body></html>");
        assert_eq!(get_control_flag(&html), None);
    }
}
