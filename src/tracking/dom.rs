//! DOM capabilities the tracking manager relies on.
//!
//! The manager never talks to a concrete DOM. Browser builds implement these traits for
//! `web_sys` types (see `tracking::web`), native hosts and tests use
//! [`MemoryElement`](crate::tracking::memory::MemoryElement).

use std::fmt;

use crate::tracking::error::TrackingResult;

/// Click listener attached by the DOM binder.
pub type ClickListener = Box<dyn FnMut(&dyn ClickEvent)>;

/// The click event delivered to a bound element.
pub trait ClickEvent {
    fn prevent_default(&self);
}

/// An element that can carry tracking attributes and receive click listeners.
pub trait TrackableElement: fmt::Debug {
    fn attribute(&self, name: &str) -> Option<String>;

    fn has_attribute(&self, name: &str) -> bool;

    fn set_attribute(&self, name: &str, value: &str) -> TrackingResult<()>;

    fn add_click_listener(&self, listener: ClickListener) -> TrackingResult<()>;
}

/// A subtree that can be searched for trackable elements.
pub trait DomRoot {
    type Element: TrackableElement + Clone + 'static;

    /// Returns the descendants matching `selector`, in document order. The root itself is not
    /// part of the result.
    fn query_selector_all(&self, selector: &AttributeSelector) -> TrackingResult<Vec<Self::Element>>;
}

/// `[required]:not([excluded])`: elements flagged for tracking that are not bound yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSelector {
    required: String,
    excluded: String,
}

impl AttributeSelector {
    pub fn new(required: impl Into<String>, excluded: impl Into<String>) -> Self {
        Self {
            required: required.into(),
            excluded: excluded.into(),
        }
    }

    pub fn required(&self) -> &str {
        &self.required
    }

    pub fn excluded(&self) -> &str {
        &self.excluded
    }

    pub fn to_css(&self) -> String {
        format!("[{}]:not([{}])", self.required, self.excluded)
    }

    pub fn matches(&self, element: &dyn TrackableElement) -> bool {
        element.has_attribute(&self.required) && !element.has_attribute(&self.excluded)
    }
}
