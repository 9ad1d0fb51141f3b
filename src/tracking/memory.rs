//! In-memory implementations of the DOM, sink and navigator seams.
//!
//! Useful for native hosts that render markup themselves and for exercising the click flow
//! without a browser.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::tracking::dom::{AttributeSelector, ClickEvent, ClickListener, DomRoot, TrackableElement};
use crate::tracking::error::TrackingResult;
use crate::tracking::sink::{AnalyticsSink, EventPayload, Navigator};

/// A shared handle to an element of an in-memory tree. Clones refer to the same element.
#[derive(Clone)]
pub struct MemoryElement {
    inner: Rc<RefCell<ElementNode>>,
}

struct ElementNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    children: Vec<MemoryElement>,
    listeners: Vec<ClickListener>,
}

impl MemoryElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ElementNode {
                tag: tag.into(),
                attributes: BTreeMap::new(),
                children: Vec::new(),
                listeners: Vec::new(),
            })),
        }
    }

    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
        self
    }

    pub fn with_child(self, child: MemoryElement) -> Self {
        self.append_child(child);
        self
    }

    pub fn append_child(&self, child: MemoryElement) {
        self.inner.borrow_mut().children.push(child);
    }

    pub fn remove_attribute(&self, name: &str) {
        self.inner.borrow_mut().attributes.remove(name);
    }

    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    pub fn children(&self) -> Vec<MemoryElement> {
        self.inner.borrow().children.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Delivers a click to every listener attached to this element and returns the event so the
    /// caller can inspect whether the default action was prevented.
    pub fn click(&self) -> MemoryClickEvent {
        let event = MemoryClickEvent::default();
        // Listeners read this element's attributes, so the node must not stay borrowed.
        let mut listeners = std::mem::take(&mut self.inner.borrow_mut().listeners);
        for listener in listeners.iter_mut() {
            listener(&event as &dyn ClickEvent);
        }
        let mut node = self.inner.borrow_mut();
        listeners.append(&mut node.listeners);
        node.listeners = listeners;
        event
    }

    pub fn ptr_eq(&self, other: &MemoryElement) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn collect_matching(&self, selector: &AttributeSelector, found: &mut Vec<MemoryElement>) {
        for child in self.children() {
            if selector.matches(&child) {
                found.push(child.clone());
            }
            child.collect_matching(selector, found);
        }
    }
}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.inner.borrow();
        f.debug_struct("MemoryElement")
            .field("tag", &node.tag)
            .field("attributes", &node.attributes)
            .field("children", &node.children.len())
            .finish()
    }
}

impl TrackableElement for MemoryElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.inner.borrow().attributes.contains_key(name)
    }

    fn set_attribute(&self, name: &str, value: &str) -> TrackingResult<()> {
        self.inner
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn add_click_listener(&self, listener: ClickListener) -> TrackingResult<()> {
        self.inner.borrow_mut().listeners.push(listener);
        Ok(())
    }
}

impl DomRoot for MemoryElement {
    type Element = MemoryElement;

    fn query_selector_all(&self, selector: &AttributeSelector) -> TrackingResult<Vec<MemoryElement>> {
        let mut found = Vec::new();
        self.collect_matching(selector, &mut found);
        Ok(found)
    }
}

#[derive(Debug, Default)]
pub struct MemoryClickEvent {
    default_prevented: Cell<bool>,
}

impl MemoryClickEvent {
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl ClickEvent for MemoryClickEvent {
    fn prevent_default(&self) {
        self.default_prevented.set(true);
    }
}

/// A call received by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    Event(EventPayload),
    SetCurrentPage(String),
    PageView,
}

/// Sink that records every call. Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    unavailable: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the analytics library being missing from (or present on) the page.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<EventPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Event(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: SinkCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl AnalyticsSink for RecordingSink {
    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    fn send_event(&self, payload: &EventPayload) -> TrackingResult<()> {
        self.record(SinkCall::Event(payload.clone()));
        Ok(())
    }

    fn set_current_page(&self, page: &str) -> TrackingResult<()> {
        self.record(SinkCall::SetCurrentPage(page.to_string()));
        Ok(())
    }

    fn send_page_view(&self) -> TrackingResult<()> {
        self.record(SinkCall::PageView);
        Ok(())
    }
}

/// Navigator that records the URLs it was asked to open.
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn assigned(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, url: &str) {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
