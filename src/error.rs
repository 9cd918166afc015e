//! Error types for the QR widget
//!
//! Configuration errors are fatal at construction. Everything else is a
//! per-cycle failure that the controller catches and renders as plain text.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Missing or invalid configuration (fatal, aborts startup)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required selector was not provided
    #[error("Missing required selector: {0}")]
    MissingSelector(&'static str),

    /// A selector did not match any element in the document
    #[error("Required DOM element not found: {0}")]
    ElementNotFound(String),

    /// A value was present but unusable
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The browser environment itself is unavailable (no window/document)
    #[error("Browser environment unavailable: {0}")]
    NoBrowser(String),
}

/// Failures of the XML-level SVG sanitizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("Invalid SVG markup: {0}")]
    Malformed(String),

    #[error("Expected <svg> root element, found <{0}>")]
    NotSvg(String),

    #[error("Markup contains no <svg> element")]
    Empty,
}

/// Failures while turning text into an artifact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The QR encoder rejected the input
    #[error("Failed to generate QR code: {0}")]
    Encode(String),

    /// Sanitization of the generated markup failed
    #[error("Failed to generate QR code: {0}")]
    Sanitize(#[from] SanitizeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to update URL fragment: {0}")]
pub struct HashStoreError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to download file: {0}")]
pub struct DownloadError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to render QR code: {0}")]
pub struct RenderError(pub String);

/// Top-level error type crossing the JS boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    HashStore(#[from] HashStoreError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// An operation was called in a phase that does not allow it
    #[error("Invalid controller state: {0}")]
    InvalidState(String),
}

impl From<SanitizeError> for AppError {
    fn from(err: SanitizeError) -> Self {
        AppError::Generation(err.into())
    }
}

impl From<AppError> for JsValue {
    fn from(err: AppError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Describe a JS exception value for logging and error messages
pub fn describe_js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_message_is_descriptive() {
        let err = GenerationError::Encode("data too long".to_string());
        assert_eq!(err.to_string(), "Failed to generate QR code: data too long");
    }

    #[test]
    fn test_sanitize_error_surfaces_as_generation_error() {
        let err: AppError = SanitizeError::NotSvg("html".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Failed to generate QR code: Expected <svg> root element, found <html>"
        );
    }
}
