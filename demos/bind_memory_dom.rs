//! Binds an in-memory page, clicks a tracked link and replays the redirect from the hit callback.

use std::sync::Arc;

use serde_json::json;
use tracking_manager::tracking::memory::{MemoryElement, RecordingNavigator, RecordingSink};
use tracking_manager::tracking::{TrackingConfig, TrackingManager};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackingConfig::from_value(json!({
        "nav": { "pricing_onClick": { "hitType": "event", "eventLabel": "pricing - {plan}" } }
    }))?;
    let sink = RecordingSink::new();
    let navigator = RecordingNavigator::default();
    let manager = TrackingManager::new(config, Arc::new(sink.clone()), Arc::new(navigator.clone()));

    let link = MemoryElement::new("a")
        .with_attribute("href", "/pricing")
        .with_attribute("data-track", "")
        .with_attribute("data-track-key", "nav.pricing_onClick")
        .with_attribute("data-track-params", r#"{"{plan}": "pro"}"#);
    let body = MemoryElement::new("body").with_child(link.clone());

    println!("bound {} element(s)", manager.parse_dom(Some(&body))?);
    println!("bound {} element(s) on rescan", manager.parse_dom(Some(&body))?);

    let event = link.click();
    println!("default prevented: {}", event.default_prevented());

    for payload in sink.events() {
        println!("sent {:?}", payload.field("eventLabel"));
        if let Some(callback) = payload.hit_callback() {
            // A real sink fires this once the hit has been delivered.
            callback.invoke();
        }
    }
    println!("navigated to {:?}", navigator.assigned());

    Ok(())
}
