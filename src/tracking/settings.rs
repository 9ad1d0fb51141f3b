use serde::{Deserialize, Serialize};

use crate::tracking::error::{invalid_config, TrackingResult};

pub const DEFAULT_TRACK_ATTRIBUTE: &str = "data-track";
pub const DEFAULT_KEY_ATTRIBUTE: &str = "data-track-key";
pub const DEFAULT_PARAMS_ATTRIBUTE: &str = "data-track-params";
pub const DEFAULT_PAGE_VIEW_ATTRIBUTE: &str = "data-track-page-view";
pub const DEFAULT_IGNORE_REDIRECT_ATTRIBUTE: &str = "data-no-tracking-redirect";
pub const DEFAULT_BOUND_MARKER_ATTRIBUTE: &str = "tracking-parsed";
pub const DEFAULT_DATA_LAYER_NAME: &str = "dataLayer";

/// Markup contract and diagnostics switches of a [`TrackingManager`](crate::tracking::TrackingManager).
///
/// Deserializes from camelCase JSON; missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingSettings {
    debug: bool,
    track_attribute: String,
    key_attribute: String,
    params_attribute: String,
    page_view_attribute: String,
    ignore_redirect_attribute: String,
    bound_marker_attribute: String,
    data_layer_name: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            debug: false,
            track_attribute: DEFAULT_TRACK_ATTRIBUTE.to_string(),
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            params_attribute: DEFAULT_PARAMS_ATTRIBUTE.to_string(),
            page_view_attribute: DEFAULT_PAGE_VIEW_ATTRIBUTE.to_string(),
            ignore_redirect_attribute: DEFAULT_IGNORE_REDIRECT_ATTRIBUTE.to_string(),
            bound_marker_attribute: DEFAULT_BOUND_MARKER_ATTRIBUTE.to_string(),
            data_layer_name: DEFAULT_DATA_LAYER_NAME.to_string(),
        }
    }
}

impl TrackingSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings such as `{"debug": true, "trackAttribute": "data-ga"}`.
    pub fn from_json_str(raw: &str) -> TrackingResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| invalid_config(format!("invalid tracking settings: {err}")))
    }

    /// Logs every dispatched event and page view with its key and payload.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_track_attribute(mut self, name: impl Into<String>) -> Self {
        self.track_attribute = name.into();
        self
    }

    pub fn with_key_attribute(mut self, name: impl Into<String>) -> Self {
        self.key_attribute = name.into();
        self
    }

    pub fn with_params_attribute(mut self, name: impl Into<String>) -> Self {
        self.params_attribute = name.into();
        self
    }

    pub fn with_page_view_attribute(mut self, name: impl Into<String>) -> Self {
        self.page_view_attribute = name.into();
        self
    }

    pub fn with_ignore_redirect_attribute(mut self, name: impl Into<String>) -> Self {
        self.ignore_redirect_attribute = name.into();
        self
    }

    pub fn with_bound_marker_attribute(mut self, name: impl Into<String>) -> Self {
        self.bound_marker_attribute = name.into();
        self
    }

    /// Name of the global array the data layer sink pushes onto.
    pub fn with_data_layer_name(mut self, name: impl Into<String>) -> Self {
        self.data_layer_name = name.into();
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn track_attribute(&self) -> &str {
        &self.track_attribute
    }

    pub fn key_attribute(&self) -> &str {
        &self.key_attribute
    }

    pub fn params_attribute(&self) -> &str {
        &self.params_attribute
    }

    pub fn page_view_attribute(&self) -> &str {
        &self.page_view_attribute
    }

    pub fn ignore_redirect_attribute(&self) -> &str {
        &self.ignore_redirect_attribute
    }

    pub fn bound_marker_attribute(&self) -> &str {
        &self.bound_marker_attribute
    }

    pub fn data_layer_name(&self) -> &str {
        &self.data_layer_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_markup_contract() {
        let settings = TrackingSettings::default();
        assert!(!settings.debug());
        assert_eq!(settings.track_attribute(), "data-track");
        assert_eq!(settings.key_attribute(), "data-track-key");
        assert_eq!(settings.params_attribute(), "data-track-params");
        assert_eq!(settings.page_view_attribute(), "data-track-page-view");
        assert_eq!(settings.ignore_redirect_attribute(), "data-no-tracking-redirect");
        assert_eq!(settings.bound_marker_attribute(), "tracking-parsed");
        assert_eq!(settings.data_layer_name(), "dataLayer");
    }

    #[test]
    fn builders_override_fields() {
        let settings = TrackingSettings::new()
            .with_debug(true)
            .with_track_attribute("data-ga")
            .with_bound_marker_attribute("data-ga-bound")
            .with_data_layer_name("gtmLayer");
        assert!(settings.debug());
        assert_eq!(settings.track_attribute(), "data-ga");
        assert_eq!(settings.bound_marker_attribute(), "data-ga-bound");
        assert_eq!(settings.data_layer_name(), "gtmLayer");
        assert_eq!(settings.key_attribute(), DEFAULT_KEY_ATTRIBUTE);
    }

    #[test]
    fn parses_partial_json() {
        let settings =
            TrackingSettings::from_json_str(r#"{"debug": true, "ignoreRedirectAttribute": "data-stay"}"#)
                .unwrap();
        assert!(settings.debug());
        assert_eq!(settings.ignore_redirect_attribute(), "data-stay");
        assert_eq!(settings.track_attribute(), DEFAULT_TRACK_ATTRIBUTE);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = TrackingSettings::from_json_str(r#"{"debug": "yes"}"#).unwrap_err();
        assert_eq!(err.code_str(), "tracking/invalid-config");
    }
}
