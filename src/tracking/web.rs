//! Browser bindings: `web_sys` elements and events, `ga()`, the GTM data layer and
//! `window.location`.

use std::sync::{Mutex, PoisonError};

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Event;

use crate::tracking::api::TrackingManager;
use crate::tracking::config::EventTemplate;
use crate::tracking::dom::{AttributeSelector, ClickEvent, ClickListener, DomRoot, TrackableElement};
use crate::tracking::error::{internal_error, TrackingError, TrackingResult};
use crate::tracking::logger::LOGGER;
use crate::tracking::settings::DEFAULT_DATA_LAYER_NAME;
use crate::tracking::sink::{AnalyticsSink, EventPayload, HitCallback, Navigator, HIT_CALLBACK_FIELD};

const EVENT_CALLBACK_FIELD: &str = "eventCallback";

impl TrackableElement for web_sys::Element {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn has_attribute(&self, name: &str) -> bool {
        web_sys::Element::has_attribute(self, name)
    }

    fn set_attribute(&self, name: &str, value: &str) -> TrackingResult<()> {
        web_sys::Element::set_attribute(self, name, value)
            .map_err(|err| map_js_error(&format!("setAttribute({name})"), err))
    }

    fn add_click_listener(&self, mut listener: ClickListener) -> TrackingResult<()> {
        let callback = Closure::wrap(Box::new(move |event: Event| {
            listener(&event as &dyn ClickEvent);
        }) as Box<dyn FnMut(Event)>);
        self.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
            .map_err(|err| map_js_error("addEventListener(click)", err))?;
        // Bound elements keep their listener for the lifetime of the page.
        callback.forget();
        Ok(())
    }
}

impl DomRoot for web_sys::Element {
    type Element = web_sys::Element;

    fn query_selector_all(&self, selector: &AttributeSelector) -> TrackingResult<Vec<web_sys::Element>> {
        let nodes = web_sys::Element::query_selector_all(self, &selector.to_css())
            .map_err(|err| map_js_error("querySelectorAll", err))?;
        let mut elements = Vec::with_capacity(nodes.length() as usize);
        for index in 0..nodes.length() {
            if let Some(element) = nodes
                .item(index)
                .and_then(|node| node.dyn_into::<web_sys::Element>().ok())
            {
                elements.push(element);
            }
        }
        Ok(elements)
    }
}

impl ClickEvent for Event {
    fn prevent_default(&self) {
        Event::prevent_default(self);
    }
}

/// Binds every trackable element under `document.body`.
pub fn parse_document(manager: &TrackingManager) -> TrackingResult<usize> {
    let body = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body());
    manager.parse_dom(body.as_deref())
}

/// Sends through the classic Google Analytics `ga()` command queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaSink;

impl GaSink {
    pub fn new() -> Self {
        Self
    }

    fn ga() -> Option<Function> {
        let value = Reflect::get(&js_sys::global(), &JsValue::from_str("ga")).ok()?;
        value.dyn_into::<Function>().ok()
    }

    fn require_ga() -> TrackingResult<Function> {
        Self::ga().ok_or_else(|| internal_error("`ga` is not available on this page"))
    }
}

impl AnalyticsSink for GaSink {
    fn is_available(&self) -> bool {
        Self::ga().is_some()
    }

    fn send_event(&self, payload: &EventPayload) -> TrackingResult<()> {
        let ga = Self::require_ga()?;
        let object = fields_to_js(payload.fields())?;
        if let Some(callback) = payload.hit_callback() {
            attach_callback(&object, HIT_CALLBACK_FIELD, callback)?;
        }
        ga.call2(&JsValue::NULL, &JsValue::from_str("send"), &object)
            .map_err(|err| map_js_error("ga(send)", err))?;
        Ok(())
    }

    fn set_current_page(&self, page: &str) -> TrackingResult<()> {
        let ga = Self::require_ga()?;
        ga.call3(
            &JsValue::NULL,
            &JsValue::from_str("set"),
            &JsValue::from_str("page"),
            &JsValue::from_str(page),
        )
        .map_err(|err| map_js_error("ga(set, page)", err))?;
        Ok(())
    }

    fn send_page_view(&self) -> TrackingResult<()> {
        let ga = Self::require_ga()?;
        ga.call2(
            &JsValue::NULL,
            &JsValue::from_str("send"),
            &JsValue::from_str("pageView"),
        )
        .map_err(|err| map_js_error("ga(send, pageView)", err))?;
        Ok(())
    }
}

/// Pushes onto a Google Tag Manager data layer (`window.dataLayer` by default).
///
/// Events are pushed as-is with the redirect callback exposed as `eventCallback`; page views
/// push `{"event": "pageView", "page": <name>}`.
#[derive(Debug)]
pub struct DataLayerSink {
    name: String,
    current_page: Mutex<Option<String>>,
}

impl Default for DataLayerSink {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_LAYER_NAME)
    }
}

impl DataLayerSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_page: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn layer(&self) -> Option<Object> {
        let value = Reflect::get(&js_sys::global(), &JsValue::from_str(&self.name)).ok()?;
        if value.is_null() || value.is_undefined() {
            return None;
        }
        Some(value.unchecked_into())
    }

    fn push(&self, value: &JsValue) -> TrackingResult<()> {
        let layer = self
            .layer()
            .ok_or_else(|| internal_error(format!("`{}` is not available on this page", self.name)))?;
        // GTM replaces `push` on the array, so look it up instead of using Array.prototype.push.
        let push = Reflect::get(&layer, &JsValue::from_str("push"))
            .map_err(|err| map_js_error("dataLayer.push", err))?
            .dyn_into::<Function>()
            .map_err(|_| internal_error(format!("`{}.push` is not a function", self.name)))?;
        push.call1(&layer, value)
            .map_err(|err| map_js_error("dataLayer.push", err))?;
        Ok(())
    }
}

impl AnalyticsSink for DataLayerSink {
    fn is_available(&self) -> bool {
        self.layer().is_some()
    }

    fn send_event(&self, payload: &EventPayload) -> TrackingResult<()> {
        let object = fields_to_js(payload.fields())?;
        if let Some(callback) = payload.hit_callback() {
            attach_callback(&object, EVENT_CALLBACK_FIELD, callback)?;
        }
        self.push(&object)
    }

    fn set_current_page(&self, page: &str) -> TrackingResult<()> {
        *self
            .current_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(page.to_string());
        Ok(())
    }

    fn send_page_view(&self) -> TrackingResult<()> {
        let page = self
            .current_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut fields = EventTemplate::new();
        fields.insert("event".to_string(), "pageView".into());
        if let Some(page) = page {
            fields.insert("page".to_string(), page.into());
        }
        self.push(&fields_to_js(&fields)?)
    }
}

/// Navigates the current window with `location.assign`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn assign(&self, url: &str) {
        let Some(window) = web_sys::window() else {
            LOGGER.warn(format!("no window to navigate to `{url}`"));
            return;
        };
        if let Err(err) = window.location().assign(url) {
            LOGGER.error(map_js_error("location.assign", err).to_string());
        }
    }
}

fn fields_to_js(fields: &EventTemplate) -> TrackingResult<JsValue> {
    let serialized = serde_json::to_string(fields)
        .map_err(|err| internal_error(format!("failed to serialize payload: {err}")))?;
    js_sys::JSON::parse(&serialized).map_err(|err| map_js_error("JSON.parse", err))
}

fn attach_callback(object: &JsValue, field: &str, callback: &HitCallback) -> TrackingResult<()> {
    let callback = callback.clone();
    let function = Closure::once_into_js(move || callback.invoke());
    Reflect::set(object, &JsValue::from_str(field), &function)
        .map_err(|err| map_js_error(field, err))?;
    Ok(())
}

fn map_js_error(context: &str, err: JsValue) -> TrackingError {
    internal_error(format!("{context} failed: {}", stringify_js_error(err)))
}

fn stringify_js_error(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        if let Some(message) = error.message().as_string() {
            return message;
        }
    }
    if let Ok(stringified) = js_sys::JSON::stringify(&err) {
        if let Some(text) = stringified.as_string() {
            return text;
        }
    }
    format!("{err:?}")
}
