//! Error types for specpulse

use std::fmt;
use thiserror::Error;

/// Main error type for specpulse
///
/// Every variant renders with its category first so the message can be shown
/// to the user as-is.
#[derive(Error, Debug)]
pub enum SpecPulseError {
    #[error("Spec load error: {0}")]
    SpecLoad(String),

    #[error("Spec parse error: {0}")]
    SpecParse(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Body parse error: {0}")]
    BodyParse(#[source] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpecPulseError {
    /// Build a network error from a reqwest failure, keeping the cause chain
    pub fn network(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        SpecPulseError::Network(format!("{}: {}", kind, error_chain(&err)))
    }
}

/// Render an error and all of its sources on one line
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Non-fatal degraded `$ref` resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefResolutionWarning {
    /// Where in the document the reference was met (JSON pointer)
    pub location: String,
    /// The reference string itself
    pub reference: String,
    pub reason: String,
}

impl RefResolutionWarning {
    pub fn new(location: impl Into<String>, reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RefResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unresolved $ref '{}' at {}: {}", self.reference, self.location, self.reason)
    }
}

pub type Result<T> = std::result::Result<T, SpecPulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_category() {
        let err = SpecPulseError::Auth("token endpoint returned 401".to_string());
        assert_eq!(err.to_string(), "Auth error: token endpoint returned 401");

        let body_err = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        assert!(SpecPulseError::BodyParse(body_err).to_string().starts_with("Body parse error: "));
    }

    #[test]
    fn test_warning_display() {
        let w = RefResolutionWarning::new("/paths/~1pets/get/parameters/0", "#/components/parameters/Limit", "minimal parser");
        assert_eq!(
            w.to_string(),
            "unresolved $ref '#/components/parameters/Limit' at /paths/~1pets/get/parameters/0: minimal parser"
        );
    }
}
