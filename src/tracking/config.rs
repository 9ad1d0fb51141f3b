use serde_json::{Map, Value};

use crate::tracking::error::{invalid_config, TrackingResult};

/// Field values of one analytics event or page view, possibly holding placeholder tokens.
pub type EventTemplate = Map<String, Value>;

/// Nested tree of event templates addressed by dotted keys.
///
/// The tree is supplied once and never written afterwards; every dispatch works on a copy of
/// the template it resolves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingConfig {
    root: Map<String, Value>,
}

impl TrackingConfig {
    pub fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Builds a configuration from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> TrackingResult<Self> {
        match value {
            Value::Object(root) => Ok(Self::new(root)),
            other => Err(invalid_config(format!(
                "tracking configuration must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(raw: &str) -> TrackingResult<Self> {
        let value = serde_json::from_str::<Value>(raw)
            .map_err(|err| invalid_config(format!("failed to parse tracking configuration: {err}")))?;
        Self::from_value(value)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> TrackingResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            invalid_config(format!(
                "failed to read tracking configuration `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Converts a JS object (typically the literal passed by the host page) into a configuration.
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    pub fn from_js(value: &wasm_bindgen::JsValue) -> TrackingResult<Self> {
        if value.is_null() || value.is_undefined() {
            return Err(invalid_config("tracking configuration is null or undefined"));
        }
        let serialized = js_sys::JSON::stringify(value)
            .ok()
            .and_then(|text| text.as_string())
            .ok_or_else(|| invalid_config("tracking configuration is not JSON serializable"))?;
        Self::from_json_str(&serialized)
    }

    /// Follows each dot-separated segment of `key` into the tree.
    ///
    /// Returns `None` when a segment is missing, when an intermediate value is not an object, or
    /// when the value reached is not an object.
    pub fn resolve(&self, key: &str) -> Option<&EventTemplate> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        current.as_object()
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::error::TrackingErrorCode;
    use serde_json::json;

    fn sample() -> TrackingConfig {
        TrackingConfig::from_value(json!({
            "header": {
                "burgerMenu_onClick": {
                    "hitType": "event",
                    "eventCategory": "header",
                    "eventAction": "display",
                    "eventLabel": "burger menu - {user} {isConnected}",
                    "nonInteraction": true
                }
            },
            "newsInfiniteScroll": { "pageView": "{pageView}" },
            "label": "not a template"
        }))
        .unwrap()
    }

    #[test]
    fn resolves_nested_leaf() {
        let config = sample();
        let template = config.resolve("header.burgerMenu_onClick").unwrap();
        assert_eq!(template.get("eventAction"), Some(&json!("display")));
        assert!(std::ptr::eq(
            template,
            config.root()["header"]["burgerMenu_onClick"].as_object().unwrap()
        ));
    }

    #[test]
    fn resolves_top_level_leaf() {
        let config = sample();
        let template = config.resolve("newsInfiniteScroll").unwrap();
        assert_eq!(template.get("pageView"), Some(&json!("{pageView}")));
    }

    #[test]
    fn absent_segments_resolve_to_none() {
        let config = sample();
        assert!(config.resolve("test").is_none());
        assert!(config.resolve("header.missing").is_none());
        assert!(config.resolve("header.burgerMenu_onClick.eventAction.deeper").is_none());
        assert!(config.resolve("").is_none());
    }

    #[test]
    fn non_object_leaves_are_not_templates() {
        let config = sample();
        assert!(config.resolve("label").is_none());
        assert!(config.resolve("header.burgerMenu_onClick.eventAction").is_none());
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = TrackingConfig::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err.code, TrackingErrorCode::InvalidConfig);
        assert!(err.message().contains("an array"));

        let err = TrackingConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code, TrackingErrorCode::InvalidConfig);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "tracking-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"footer": {"click": {"eventLabel": "bye"}}}"#).unwrap();
        let config = TrackingConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            config.resolve("footer.click").unwrap().get("eventLabel"),
            Some(&json!("bye"))
        );
    }
}
