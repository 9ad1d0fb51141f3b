//! Dispatches configured events and a page view imperatively and prints what the sink received.

use std::sync::Arc;

use serde_json::json;
use tracking_manager::tracking::memory::{RecordingNavigator, RecordingSink, SinkCall};
use tracking_manager::tracking::{PlaceholderMap, TrackingConfig, TrackingManager, TrackingSettings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackingConfig::from_json_str(
        r#"{
            "header": {
                "burgerMenu_onClick": {
                    "hitType": "event",
                    "eventCategory": "header",
                    "eventAction": "display",
                    "eventLabel": "burger menu - {user} {isConnected}"
                }
            },
            "home": { "pageView": "{pageView}" }
        }"#,
    )?;
    let sink = RecordingSink::new();
    let manager = TrackingManager::with_settings(
        config,
        Arc::new(sink.clone()),
        Arc::new(RecordingNavigator::default()),
        TrackingSettings::new().with_debug(true),
    );

    let mut placeholders = PlaceholderMap::new();
    placeholders.insert("{user}".to_string(), json!("Sam"));
    placeholders.insert("{isConnected}".to_string(), json!(true));
    manager.track_event("header.burgerMenu_onClick", Some(&placeholders))?;
    manager.track_page_view("home", "Home")?;

    if let Err(err) = manager.track_event("header.unknown", None) {
        println!("Rejected: {err}");
    }

    for call in sink.calls() {
        match call {
            SinkCall::Event(payload) => println!("send {}", serde_json::Value::Object(payload.fields().clone())),
            SinkCall::SetCurrentPage(page) => println!("set page {page}"),
            SinkCall::PageView => println!("send pageView"),
        }
    }

    Ok(())
}
