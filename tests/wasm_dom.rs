#![cfg(all(target_arch = "wasm32", feature = "wasm-web"))]

use std::sync::Arc;

use js_sys::{Array, Function, Reflect};
use serde_json::{json, Value};
use tracking_manager::tracking::memory::RecordingNavigator;
use tracking_manager::tracking::web::{parse_document, DataLayerSink, GaSink};
use tracking_manager::tracking::{AnalyticsSink, TrackingConfig, TrackingManager};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::{Element, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn config() -> TrackingConfig {
    let value = js_sys::JSON::parse(
        r#"{
            "header": { "click": { "hitType": "event", "eventLabel": "hi {user}" } },
            "news": { "pageView": "{pageView}" }
        }"#,
    )
    .expect("parse config");
    TrackingConfig::from_js(&value).expect("config from js")
}

/// Installs a `ga` stub that records its arguments and completes hits immediately.
fn install_fake_ga() -> Array {
    let calls = Array::new();
    Reflect::set(&js_sys::global(), &JsValue::from_str("gaCalls"), &calls).expect("set gaCalls");
    let ga = Function::new_with_args(
        "...args",
        "globalThis.gaCalls.push(args);
         const last = args[args.length - 1];
         if (last && typeof last.hitCallback === 'function') { last.hitCallback(); }",
    );
    Reflect::set(&js_sys::global(), &JsValue::from_str("ga"), &ga).expect("set ga");
    calls
}

fn remove_global(name: &str) {
    Reflect::delete_property(&js_sys::global(), &JsValue::from_str(name))
        .expect("delete global");
}

fn as_json(value: &JsValue) -> Value {
    let text = js_sys::JSON::stringify(value)
        .expect("stringify")
        .as_string()
        .expect("string");
    serde_json::from_str(&text).expect("json")
}

fn append(tag: &str, attributes: &[(&str, &str)]) -> Element {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .expect("document");
    let element = document.create_element(tag).expect("create element");
    for (name, value) in attributes {
        element.set_attribute(name, value).expect("set attribute");
    }
    document
        .body()
        .expect("body")
        .append_child(&element)
        .expect("append");
    element
}

fn click(element: &Element) {
    element
        .dyn_ref::<HtmlElement>()
        .expect("html element")
        .click();
}

#[wasm_bindgen_test]
fn config_loads_from_js_object() {
    let config = config();
    assert_eq!(
        config.resolve("header.click").map(|template| template["eventLabel"].clone()),
        Some(json!("hi {user}"))
    );
}

#[wasm_bindgen_test]
fn ga_sink_receives_substituted_click() {
    let calls = install_fake_ga();
    let navigator = RecordingNavigator::default();
    let manager = TrackingManager::new(config(), Arc::new(GaSink::new()), Arc::new(navigator.clone()));
    let button = append(
        "button",
        &[
            ("data-track", ""),
            ("data-track-key", "header.click"),
            ("data-track-params", r#"{"{user}":"Sam"}"#),
        ],
    );

    assert_eq!(parse_document(&manager).expect("bind"), 1);
    assert_eq!(parse_document(&manager).expect("rebind"), 0);
    click(&button);

    let recorded = as_json(&calls);
    assert_eq!(recorded.as_array().map(Vec::len), Some(1));
    assert_eq!(recorded[0][0], json!("send"));
    assert_eq!(recorded[0][1]["eventLabel"], json!("hi Sam"));
    assert!(navigator.assigned().is_empty());

    button.remove();
    remove_global("ga");
}

#[wasm_bindgen_test]
fn ga_hit_callback_replays_link_navigation() {
    let _calls = install_fake_ga();
    let navigator = RecordingNavigator::default();
    let manager = TrackingManager::new(config(), Arc::new(GaSink::new()), Arc::new(navigator.clone()));
    let link = append(
        "a",
        &[
            ("href", "http://localhost/next"),
            ("data-track", ""),
            ("data-track-key", "header.click"),
        ],
    );

    parse_document(&manager).expect("bind");
    click(&link);

    assert_eq!(navigator.assigned(), vec!["http://localhost/next".to_string()]);

    link.remove();
    remove_global("ga");
}

#[wasm_bindgen_test]
fn ga_page_view_sets_page_then_sends() {
    let calls = install_fake_ga();
    let manager = TrackingManager::new(
        config(),
        Arc::new(GaSink::new()),
        Arc::new(RecordingNavigator::default()),
    );

    manager.track_page_view("news", "Home").expect("page view");

    assert_eq!(
        as_json(&calls),
        json!([["set", "page", "Home"], ["send", "pageView"]])
    );
    remove_global("ga");
}

#[wasm_bindgen_test]
fn missing_ga_skips_binding() {
    remove_global("ga");
    assert!(!GaSink::new().is_available());
    let manager = TrackingManager::new(
        config(),
        Arc::new(GaSink::new()),
        Arc::new(RecordingNavigator::default()),
    );
    let button = append("button", &[("data-track", ""), ("data-track-key", "header.click")]);

    assert_eq!(parse_document(&manager).expect("bind"), 0);
    assert!(!button.has_attribute("tracking-parsed"));

    button.remove();
}

#[wasm_bindgen_test]
fn data_layer_sink_pushes_events_and_page_views() {
    let layer = Array::new();
    Reflect::set(&js_sys::global(), &JsValue::from_str("dataLayer"), &layer).expect("set dataLayer");
    let manager = TrackingManager::new(
        config(),
        Arc::new(DataLayerSink::default()),
        Arc::new(RecordingNavigator::default()),
    );

    manager.track_event("header.click", None).expect("event");
    manager.track_page_view("news", "Home").expect("page view");

    assert_eq!(
        as_json(&layer),
        json!([
            {"hitType": "event", "eventLabel": "hi {user}"},
            {"event": "pageView", "page": "Home"}
        ])
    );
    remove_global("dataLayer");
}
