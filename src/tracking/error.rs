use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingErrorCode {
    UnknownKey,
    InvalidArgument,
    InvalidConfig,
    Internal,
}

impl TrackingErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingErrorCode::UnknownKey => "tracking/unknown-key",
            TrackingErrorCode::InvalidArgument => "tracking/invalid-argument",
            TrackingErrorCode::InvalidConfig => "tracking/invalid-config",
            TrackingErrorCode::Internal => "tracking/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackingError {
    pub code: TrackingErrorCode,
    message: String,
}

impl TrackingError {
    pub fn new(code: TrackingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TrackingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for TrackingError {}

pub type TrackingResult<T> = Result<T, TrackingError>;

/// Error raised when a tracking key does not resolve to an event template.
///
/// `operation` names the public entry point (`trackEvent`, `trackPageView`, `trackClickEvent`)
/// so the message points at the call site that supplied the key.
pub fn unknown_key(operation: &str, key: &str) -> TrackingError {
    TrackingError::new(
        TrackingErrorCode::UnknownKey,
        format!("{operation}: key `{key}` undefined or unknown"),
    )
}

pub fn invalid_argument(message: impl Into<String>) -> TrackingError {
    TrackingError::new(TrackingErrorCode::InvalidArgument, message)
}

pub fn invalid_config(message: impl Into<String>) -> TrackingError {
    TrackingError::new(TrackingErrorCode::InvalidConfig, message)
}

pub fn internal_error(message: impl Into<String>) -> TrackingError {
    TrackingError::new(TrackingErrorCode::Internal, message)
}
