use std::sync::Arc;

use serde_json::{json, Value};
use tracking_manager::tracking::memory::{
    MemoryElement, RecordingNavigator, RecordingSink, SinkCall,
};
use tracking_manager::tracking::{
    replace_placeholders, PlaceholderMap, TrackableElement, TrackingConfig, TrackingErrorCode,
    TrackingManager, TrackingSettings,
};

struct Page {
    manager: TrackingManager,
    sink: RecordingSink,
    navigator: RecordingNavigator,
    body: MemoryElement,
}

fn page(config: Value, settings: TrackingSettings) -> Page {
    let sink = RecordingSink::new();
    let navigator = RecordingNavigator::default();
    let manager = TrackingManager::with_settings(
        TrackingConfig::from_value(config).unwrap(),
        Arc::new(sink.clone()),
        Arc::new(navigator.clone()),
        settings,
    );
    Page {
        manager,
        sink,
        navigator,
        body: MemoryElement::new("body"),
    }
}

fn site_config() -> Value {
    json!({
        "header": {
            "click": { "hitType": "event", "eventLabel": "hi {user}" },
            "logo_onClick": { "hitType": "event", "eventCategory": "header", "eventLabel": "logo" }
        },
        "news": { "pageView": "{pageView}" }
    })
}

#[test]
fn click_with_params_sends_substituted_label() {
    let page = page(site_config(), TrackingSettings::default());
    let button = MemoryElement::new("button")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.click")
        .with_attribute("data-track-params", r#"{"{user}":"Sam"}"#);
    page.body.append_child(button.clone());

    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 1);
    let event = button.click();

    assert!(event.default_prevented());
    let events = page.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("eventLabel"), Some(&json!("hi Sam")));
    assert_eq!(events[0].field("hitType"), Some(&json!("event")));
    assert!(events[0].hit_callback().is_none());
    assert_eq!(
        page.manager.config_event_from_key("header.click").unwrap()["eventLabel"],
        json!("hi {user}")
    );
}

#[test]
fn page_view_with_unknown_key_is_rejected() {
    let page = page(site_config(), TrackingSettings::default());
    let err = page.manager.track_page_view("missingKey", "Home").unwrap_err();
    assert_eq!(err.code, TrackingErrorCode::UnknownKey);
    assert_eq!(err.code_str(), "tracking/unknown-key");
    assert!(page.sink.calls().is_empty());
}

#[test]
fn page_view_element_reports_current_page() {
    let page = page(site_config(), TrackingSettings::default());
    let link = MemoryElement::new("a")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "news")
        .with_attribute("data-track-page-view", "Home");
    page.body.append_child(link.clone());
    page.manager.parse_dom(Some(&page.body)).unwrap();

    link.click();
    link.click();

    assert_eq!(
        page.sink.calls(),
        vec![
            SinkCall::SetCurrentPage("Home".into()),
            SinkCall::PageView,
            SinkCall::SetCurrentPage("Home".into()),
            SinkCall::PageView,
        ]
    );
    assert_eq!(
        page.manager.config_event_from_key("news").unwrap()["pageView"],
        json!("{pageView}")
    );
}

#[test]
fn rescanning_only_binds_new_elements() {
    let page = page(site_config(), TrackingSettings::default());
    let first = MemoryElement::new("button")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.logo_onClick");
    page.body.append_child(first.clone());
    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 1);

    let second = MemoryElement::new("button")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.logo_onClick");
    page.body
        .append_child(MemoryElement::new("section").with_child(second.clone()));
    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 1);
    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 0);

    first.click();
    second.click();

    assert_eq!(first.listener_count(), 1);
    assert_eq!(second.listener_count(), 1);
    assert_eq!(page.sink.events().len(), 2);
}

#[test]
fn followed_link_navigates_once_after_hit() {
    let page = page(site_config(), TrackingSettings::default());
    let link = MemoryElement::new("a")
        .with_attribute("href", "http://localhost/next")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.logo_onClick");
    page.body.append_child(link.clone());
    page.manager.parse_dom(Some(&page.body)).unwrap();

    let event = link.click();

    assert!(event.default_prevented());
    assert!(page.navigator.assigned().is_empty());
    let events = page.sink.events();
    let callback = events[0].hit_callback().unwrap();
    callback.invoke();
    callback.invoke();
    assert_eq!(page.navigator.assigned(), vec!["http://localhost/next".to_string()]);
}

#[test]
fn anchor_links_and_new_tabs_never_redirect() {
    let page = page(site_config(), TrackingSettings::default());
    let anchor = MemoryElement::new("a")
        .with_attribute("href", "#")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.logo_onClick");
    let new_tab = MemoryElement::new("a")
        .with_attribute("href", "http://example.com")
        .with_attribute("target", "_blank")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.logo_onClick");
    page.body.append_child(anchor.clone());
    page.body.append_child(new_tab.clone());
    page.manager.parse_dom(Some(&page.body)).unwrap();

    assert!(anchor.click().default_prevented());
    assert!(!new_tab.click().default_prevented());

    let events = page.sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|payload| payload.hit_callback().is_none()));
}

#[test]
fn custom_markup_contract_is_honoured() {
    let settings = TrackingSettings::new()
        .with_track_attribute("data-ga")
        .with_key_attribute("data-ga-key")
        .with_params_attribute("data-ga-params")
        .with_bound_marker_attribute("data-ga-bound")
        .with_ignore_redirect_attribute("data-ga-stay");
    let page = page(site_config(), settings);
    let link = MemoryElement::new("a")
        .with_attribute("href", "/next")
        .with_attribute("data-ga", "")
        .with_attribute("data-ga-stay", "")
        .with_attribute("data-ga-key", "header.click")
        .with_attribute("data-ga-params", r#"{"{USER}":"Ana"}"#);
    let ignored = MemoryElement::new("a").with_attribute("data-track", "");
    page.body.append_child(link.clone());
    page.body.append_child(ignored.clone());

    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 1);
    assert!(link.has_attribute("data-ga-bound"));
    assert_eq!(ignored.listener_count(), 0);

    link.click();
    let events = page.sink.events();
    assert_eq!(events[0].field("eventLabel"), Some(&json!("hi Ana")));
    assert!(events[0].hit_callback().is_none());
}

#[test]
fn imperative_event_matches_substitutor_output() {
    let page = page(site_config(), TrackingSettings::default());
    let placeholders: PlaceholderMap = serde_json::from_value(json!({"{user}": "Lou"})).unwrap();

    page.manager
        .track_event("header.click", Some(&placeholders))
        .unwrap();

    let template = page.manager.config_event_from_key("header.click").unwrap();
    assert_eq!(
        page.sink.events()[0].fields(),
        &replace_placeholders(template, Some(&placeholders))
    );
}

#[test]
fn missing_library_binds_and_sends_nothing() {
    let page = page(site_config(), TrackingSettings::default());
    page.sink.set_available(false);
    let button = MemoryElement::new("button")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "header.click");
    page.body.append_child(button.clone());

    assert_eq!(page.manager.parse_dom(Some(&page.body)).unwrap(), 0);
    page.manager.track_event("header.click", None).unwrap();
    page.manager.track_page_view("news", "Home").unwrap();

    assert!(!button.has_attribute("tracking-parsed"));
    assert!(page.sink.calls().is_empty());
}
