use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::logger::log_arg;
use crate::tracking::config::{EventTemplate, TrackingConfig};
use crate::tracking::dom::{AttributeSelector, ClickEvent, DomRoot, TrackableElement};
use crate::tracking::error::{unknown_key, TrackingResult};
use crate::tracking::logger::LOGGER;
use crate::tracking::placeholder::{parse_placeholder_map, replace_placeholders, PlaceholderMap};
use crate::tracking::redirect::{need_redirect_after_event, RedirectContext};
use crate::tracking::settings::TrackingSettings;
use crate::tracking::sink::{
    page_view_of, AnalyticsSink, EventPayload, HitCallback, Navigator, PAGE_VIEW_FIELD,
};

const HREF_ATTRIBUTE: &str = "href";
const TARGET_ATTRIBUTE: &str = "target";

/// Binds tracking markup to an analytics sink and dispatches configured events.
///
/// Cloning is cheap; clones share configuration, settings, sink and navigator.
#[derive(Clone)]
pub struct TrackingManager {
    inner: Arc<TrackingManagerInner>,
}

struct TrackingManagerInner {
    config: TrackingConfig,
    settings: TrackingSettings,
    selector: AttributeSelector,
    sink: Arc<dyn AnalyticsSink>,
    navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for TrackingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingManager")
            .field("selector", &self.inner.selector.to_css())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

/// Everything [`TrackingManager::send_event`] needs for one dispatch.
#[derive(Debug)]
pub struct SendEventOptions<'a> {
    pub key: &'a str,
    pub payload: EventTemplate,
    pub callback_url: Option<&'a str>,
    pub target_attribute: Option<&'a str>,
    pub element: Option<&'a dyn TrackableElement>,
}

impl<'a> SendEventOptions<'a> {
    /// Options for an imperative dispatch: no link, no target, no source element.
    pub fn new(key: &'a str, payload: EventTemplate) -> Self {
        Self {
            key,
            payload,
            callback_url: None,
            target_attribute: None,
            element: None,
        }
    }

    pub fn with_callback_url(mut self, url: Option<&'a str>) -> Self {
        self.callback_url = url;
        self
    }

    pub fn with_target_attribute(mut self, target: Option<&'a str>) -> Self {
        self.target_attribute = target;
        self
    }

    pub fn with_element(mut self, element: &'a dyn TrackableElement) -> Self {
        self.element = Some(element);
        self
    }

    fn redirect_context(&self) -> RedirectContext<'a> {
        RedirectContext {
            callback_url: self.callback_url,
            target_attribute: self.target_attribute,
            element: self.element,
        }
    }
}

impl TrackingManager {
    pub fn new(
        config: TrackingConfig,
        sink: Arc<dyn AnalyticsSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_settings(config, sink, navigator, TrackingSettings::default())
    }

    pub fn with_settings(
        config: TrackingConfig,
        sink: Arc<dyn AnalyticsSink>,
        navigator: Arc<dyn Navigator>,
        settings: TrackingSettings,
    ) -> Self {
        let selector = AttributeSelector::new(
            settings.track_attribute(),
            settings.bound_marker_attribute(),
        );
        Self {
            inner: Arc::new(TrackingManagerInner {
                config,
                settings,
                selector,
                sink,
                navigator,
            }),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    pub fn settings(&self) -> &TrackingSettings {
        &self.inner.settings
    }

    /// Selector of trackable elements that have not been bound yet.
    pub fn selector(&self) -> &AttributeSelector {
        &self.inner.selector
    }

    pub fn is_sink_available(&self) -> bool {
        self.inner.sink.is_available()
    }

    /// Resolves a dotted key (`"header.burgerMenu_onClick"`) to its event template.
    pub fn config_event_from_key(&self, key: &str) -> Option<&EventTemplate> {
        self.inner.config.resolve(key)
    }

    /// Attaches a click listener to every unbound trackable descendant of `root` and marks it as
    /// bound. Returns the number of elements bound by this call.
    ///
    /// Nothing happens when `root` is `None` or the sink is unavailable.
    pub fn parse_dom<R>(&self, root: Option<&R>) -> TrackingResult<usize>
    where
        R: DomRoot,
    {
        let Some(root) = root else {
            return Ok(0);
        };
        if !self.is_sink_available() {
            LOGGER.debug("analytics sink unavailable, skipping DOM scan");
            return Ok(0);
        }

        let elements = root.query_selector_all(&self.inner.selector)?;
        for element in &elements {
            element.set_attribute(self.inner.settings.bound_marker_attribute(), "")?;
            let manager = self.clone();
            let target = element.clone();
            element.add_click_listener(Box::new(move |event: &dyn ClickEvent| {
                if let Err(err) = manager.track_click_event(event, &target) {
                    LOGGER.error_with([
                        log_arg("[Tracking -> trackClickEvent]:"),
                        log_arg(err.to_string()),
                    ]);
                }
            }))?;
        }
        Ok(elements.len())
    }

    /// Dispatches the page view configured under `key`, reporting `page_view` as current page.
    pub fn track_page_view(&self, key: &str, page_view: &str) -> TrackingResult<()> {
        let template = self
            .resolve_non_empty(key)
            .filter(|_| !page_view.is_empty())
            .ok_or_else(|| unknown_key("trackPageView", key))?;

        let mut fields = template.clone();
        fields.insert(PAGE_VIEW_FIELD.to_string(), Value::String(page_view.to_string()));
        self.send_page_view(key, &fields)
    }

    /// Dispatches the event configured under `key` after substituting `placeholders`.
    pub fn track_event(&self, key: &str, placeholders: Option<&PlaceholderMap>) -> TrackingResult<()> {
        let template = self
            .resolve_non_empty(key)
            .ok_or_else(|| unknown_key("trackEvent", key))?;

        let payload = replace_placeholders(template, placeholders);
        self.send_event(SendEventOptions::new(key, payload))
    }

    /// Handles a click on a bound element.
    ///
    /// An unknown key or malformed placeholder JSON is reported before the default action is
    /// touched, so the link keeps working. Otherwise the default action is prevented unless the
    /// element has a `target` attribute.
    pub fn track_click_event(
        &self,
        event: &dyn ClickEvent,
        element: &dyn TrackableElement,
    ) -> TrackingResult<()> {
        let settings = &self.inner.settings;
        let key = element.attribute(settings.key_attribute()).unwrap_or_default();
        let is_page_view = element.has_attribute(settings.page_view_attribute());
        let callback_url = element
            .attribute(HREF_ATTRIBUTE)
            .filter(|url| !url.is_empty());
        let target_attribute = element.attribute(TARGET_ATTRIBUTE);

        let template = self
            .config_event_from_key(&key)
            .ok_or_else(|| unknown_key("trackClickEvent", &key))?;
        let placeholders = match element.attribute(settings.params_attribute()) {
            Some(raw) if !is_page_view => Some(parse_placeholder_map(&raw)?),
            _ => None,
        };

        if target_attribute.is_none() {
            event.prevent_default();
        }

        if is_page_view {
            let page_view = element
                .attribute(settings.page_view_attribute())
                .unwrap_or_default();
            let mut fields = template.clone();
            fields.insert(PAGE_VIEW_FIELD.to_string(), Value::String(page_view));
            return self.send_page_view(&key, &fields);
        }

        let payload = replace_placeholders(template, placeholders.as_ref());
        self.send_event(SendEventOptions {
            key: &key,
            payload,
            callback_url: callback_url.as_deref(),
            target_attribute: target_attribute.as_deref(),
            element: Some(element),
        })
    }

    pub fn need_redirect_after_event(&self, context: &RedirectContext<'_>) -> bool {
        need_redirect_after_event(context, self.inner.settings.ignore_redirect_attribute())
    }

    /// Forwards an event to the sink, attaching a redirecting hit callback when the click's
    /// default navigation has to be replayed.
    pub fn send_event(&self, options: SendEventOptions<'_>) -> TrackingResult<()> {
        let redirect = options.redirect_context();
        if self.inner.settings.debug() {
            LOGGER.info_with([
                log_arg("[Tracking -> trackEvent]:"),
                log_arg(options.key),
                log_arg(Value::Object(options.payload.clone())),
                log_arg(json!({
                    "callbackUrl": options.callback_url,
                    "targetAttribute": options.target_attribute,
                    "element": options.element.map(|element| format!("{element:?}")),
                })),
            ]);
        }

        if !self.is_sink_available() {
            LOGGER.debug(format!(
                "analytics sink unavailable, dropping event `{}`",
                options.key
            ));
            return Ok(());
        }

        let mut payload = EventPayload::new(options.payload);
        if self.need_redirect_after_event(&redirect) {
            if let Some(url) = redirect.callback_url {
                payload.set_hit_callback(HitCallback::new(url, Arc::clone(&self.inner.navigator)));
            }
        }
        self.inner.sink.send_event(&payload)
    }

    /// Reports the page named by the payload's `pageView` field. Payloads without a non-empty
    /// `pageView` string are ignored.
    pub fn send_page_view(&self, key: &str, payload: &EventTemplate) -> TrackingResult<()> {
        if self.inner.settings.debug() {
            LOGGER.info_with([
                log_arg("[Tracking -> trackPageView]:"),
                log_arg(key),
                log_arg(Value::Object(payload.clone())),
            ]);
        }

        let Some(page) = page_view_of(payload) else {
            return Ok(());
        };
        if !self.is_sink_available() {
            LOGGER.debug(format!("analytics sink unavailable, dropping page view `{key}`"));
            return Ok(());
        }

        self.inner.sink.set_current_page(page)?;
        self.inner.sink.send_page_view()
    }

    fn resolve_non_empty(&self, key: &str) -> Option<&EventTemplate> {
        if key.is_empty() {
            return None;
        }
        self.config_event_from_key(key)
    }
}
