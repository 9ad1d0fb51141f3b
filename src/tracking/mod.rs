mod api;
mod config;
pub mod dom;
pub mod error;
mod logger;
pub mod memory;
mod placeholder;
mod redirect;
mod settings;
mod sink;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub mod web;

pub use api::{SendEventOptions, TrackingManager};
pub use config::{EventTemplate, TrackingConfig};
pub use dom::{AttributeSelector, ClickEvent, ClickListener, DomRoot, TrackableElement};
pub use error::{TrackingError, TrackingErrorCode, TrackingResult};
pub use placeholder::{parse_placeholder_map, replace_placeholders, PlaceholderMap};
pub use redirect::{need_redirect_after_event, RedirectContext};
pub use settings::TrackingSettings;
pub use sink::{AnalyticsSink, EventPayload, HitCallback, Navigator, HIT_CALLBACK_FIELD, PAGE_VIEW_FIELD};
