use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::tracking::config::EventTemplate;
use crate::tracking::error::TrackingResult;

pub const PAGE_VIEW_FIELD: &str = "pageView";
pub const HIT_CALLBACK_FIELD: &str = "hitCallback";

/// Destination of finished payloads (`ga()`, a data layer, a recorder, ...).
///
/// Calls are fire-and-forget from the manager's point of view; an error only reports that the
/// sink could not accept the call.
pub trait AnalyticsSink: Send + Sync {
    /// Whether the backing analytics library is loaded. Unavailable sinks receive no calls.
    fn is_available(&self) -> bool {
        true
    }

    fn send_event(&self, payload: &EventPayload) -> TrackingResult<()>;

    fn set_current_page(&self, page: &str) -> TrackingResult<()>;

    fn send_page_view(&self) -> TrackingResult<()>;
}

/// Performs the navigation a suppressed link click would have done.
pub trait Navigator: Send + Sync {
    fn assign(&self, url: &str);
}

/// One-shot completion callback that navigates to the clicked link once the sink is done.
#[derive(Clone)]
pub struct HitCallback {
    url: String,
    navigator: Arc<dyn Navigator>,
    fired: Arc<AtomicBool>,
}

impl HitCallback {
    pub(crate) fn new(url: impl Into<String>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            url: url.into(),
            navigator,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigates to [`url`](Self::url). Only the first call across all clones has an effect.
    pub fn invoke(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.navigator.assign(&self.url);
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for HitCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitCallback")
            .field("url", &self.url)
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// The per-dispatch copy of an event template.
#[derive(Clone, Debug, Default)]
pub struct EventPayload {
    fields: EventTemplate,
    hit_callback: Option<HitCallback>,
}

impl EventPayload {
    pub fn new(fields: EventTemplate) -> Self {
        Self {
            fields,
            hit_callback: None,
        }
    }

    pub fn fields(&self) -> &EventTemplate {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn hit_callback(&self) -> Option<&HitCallback> {
        self.hit_callback.as_ref()
    }

    pub(crate) fn set_hit_callback(&mut self, callback: HitCallback) {
        self.hit_callback = Some(callback);
    }
}

impl PartialEq for EventPayload {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.hit_callback.as_ref().map(HitCallback::url)
                == other.hit_callback.as_ref().map(HitCallback::url)
    }
}

/// Returns the non-empty `pageView` string of a template, if any.
pub(crate) fn page_view_of(fields: &EventTemplate) -> Option<&str> {
    fields
        .get(PAGE_VIEW_FIELD)
        .and_then(Value::as_str)
        .filter(|page| !page.is_empty())
}
