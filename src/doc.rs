//! Document abstraction: readiness gate + structural query access.
//!
//! The resolver never drives parsing itself; it only consumes a read-only
//! readiness contract (does a body exist yet, is the parse complete, notify
//! me on completion) plus query access to the current parse snapshot. `Doc`
//! is that seam; [`StreamingDoc`] is the bundled implementation for hosts
//! that receive markup progressively.

use std::cell::{Cell, RefCell};
use std::future::Future;

use log::warn;
use scraper::Html;
use tokio::sync::Notify;

/// Read-only view of a document that may still be parsing.
pub trait Doc {
    /// Whether a body node exists yet. Document-level metadata lives in the
    /// head, but only the appearance of the body proves the head is complete.
    fn has_body(&self) -> bool;

    /// Whether the structural parse is complete.
    fn is_ready(&self) -> bool;

    /// Completes when the structural parse is complete. Implementations must
    /// guarantee this eventually fires; the resolver's terminal failure is
    /// gated solely on it.
    fn when_ready(&self) -> impl Future<Output = ()> + '_;

    /// Run a closure against the current parse snapshot. The closure must not
    /// call back into the document (re-entrant mutation would alias the
    /// snapshot borrow).
    fn with_html<R>(&self, f: impl FnOnce(&Html) -> R) -> R;
}

/// A progressively loaded document.
///
/// The host appends raw markup chunks as they arrive and calls [`finish`]
/// when the source is complete. Each append re-parses the accumulated source
/// into a fresh snapshot. Appends must only extend the document: previously
/// delivered markup is never reordered, so the node ids of settled nodes are
/// stable from one snapshot to the next (the seen-marker sets in the parsers
/// rely on this).
///
/// All state is interior-mutable and single-threaded; the resolution protocol
/// is cooperative and never crosses threads.
///
/// [`finish`]: StreamingDoc::finish
pub struct StreamingDoc {
    state: RefCell<DocState>,
    ready: Cell<bool>,
    body_seen: Cell<bool>,
    ready_notify: Notify,
}

struct DocState {
    source: String,
    snapshot: Html,
}

impl StreamingDoc {
    /// An empty document, still inside the head.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(DocState {
                source: String::new(),
                snapshot: Html::parse_document(""),
            }),
            ready: Cell::new(false),
            body_seen: Cell::new(false),
            ready_notify: Notify::new(),
        }
    }

    /// A fully delivered, fully parsed document.
    pub fn complete(html: &str) -> Self {
        let doc = Self::new();
        doc.append(html);
        doc.finish();
        doc
    }

    /// Append a chunk of markup and re-parse the accumulated source.
    ///
    /// The body gate flips once the accumulated source contains a body open
    /// tag; until then document-level metadata is treated as possibly
    /// incomplete.
    pub fn append(&self, chunk: &str) {
        if self.ready.get() {
            warn!("markup appended after finish() is ignored");
            return;
        }
        let mut state = self.state.borrow_mut();
        state.source.push_str(chunk);
        if !self.body_seen.get() && state.source.to_ascii_lowercase().contains("<body") {
            self.body_seen.set(true);
        }
        state.snapshot = Html::parse_document(&state.source);
    }

    /// Mark the structural parse complete and wake `when_ready` waiters.
    pub fn finish(&self) {
        self.ready.set(true);
        self.ready_notify.notify_waiters();
    }
}

impl Default for StreamingDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl Doc for StreamingDoc {
    fn has_body(&self) -> bool {
        // A complete parse synthesizes a body even for head-only markup.
        self.ready.get() || self.body_seen.get()
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn when_ready(&self) -> impl Future<Output = ()> + '_ {
        async move {
            loop {
                // Register before checking so a finish() between the check
                // and the await cannot be missed.
                let notified = self.ready_notify.notified();
                if self.ready.get() {
                    return;
                }
                notified.await;
            }
        }
    }

    fn with_html<R>(&self, f: impl FnOnce(&Html) -> R) -> R {
        f(&self.state.borrow().snapshot)
    }
}
