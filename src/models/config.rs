//! Application configuration
//!
//! Deserialized from the object passed to `startApp()` (or from JSON in tests).
//! All fields except the two selectors have defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::presentation::PresentationMode;
use crate::sanitize::filename::FilenameOptions;

pub const DEFAULT_DEBOUNCE_MS: u32 = 300;
pub const DEFAULT_FORM_SELECTOR: &str = "form";

/// Top-level configuration for the widget
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Selector of the element the QR code is rendered into
    pub container_selector: Option<String>,

    /// Selector of the text input mirrored into the URL fragment
    pub input_selector: Option<String>,

    /// Form whose submit navigation is suppressed (optional element)
    pub form_selector: String,

    pub presentation_mode: PresentationMode,

    /// Trailing-edge debounce for input events; 0 disables debouncing
    pub debounce_ms: u32,

    pub filename: FilenameConfig,
    pub qr: QrConfig,

    /// One of `error`, `warn`, `info`, `debug`, `trace`
    pub log_level: String,

    /// Publish the running app on `window.__qrController`
    pub expose_debug_hook: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            container_selector: None,
            input_selector: None,
            form_selector: DEFAULT_FORM_SELECTOR.to_string(),
            presentation_mode: PresentationMode::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            filename: FilenameConfig::default(),
            qr: QrConfig::default(),
            log_level: "info".to_string(),
            expose_debug_hook: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    /// Config with the two required selectors and defaults for the rest
    pub fn with_selectors(container: &str, input: &str) -> Self {
        Self {
            container_selector: Some(container.to_string()),
            input_selector: Some(input.to_string()),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
            field: "config",
            reason: e.to_string(),
        })
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.container_selector()?;
        self.input_selector()?;
        if self.filename.max_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "filename.maxLength",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.qr.validate()?;
        self.log_level()?;
        Ok(())
    }

    pub fn container_selector(&self) -> Result<&str, ConfigError> {
        required(&self.container_selector, "containerSelector")
    }

    pub fn input_selector(&self) -> Result<&str, ConfigError> {
        required(&self.input_selector, "inputSelector")
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.debounce_ms))
    }

    pub fn log_level(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logLevel",
                reason: format!("unknown level '{}'", self.log_level),
            })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(selector) if !selector.is_empty() => Ok(selector),
        _ => Err(ConfigError::MissingSelector(name)),
    }
}

/// Download filename policy
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilenameConfig {
    pub max_length: usize,
    pub default_name: String,
}

impl Default for FilenameConfig {
    fn default() -> Self {
        let defaults = FilenameOptions::default();
        Self {
            max_length: defaults.max_length,
            default_name: defaults.default_name,
        }
    }
}

impl From<&FilenameConfig> for FilenameOptions {
    fn from(config: &FilenameConfig) -> Self {
        FilenameOptions {
            max_length: config.max_length,
            default_name: config.default_name.clone(),
            ..FilenameOptions::default()
        }
    }
}

/// QR encoder options
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct QrConfig {
    /// Error correction level: L, M, Q or H
    pub error_correction: String,
    pub min_size: u32,
    pub dark_color: String,
    pub light_color: String,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            error_correction: "M".to_string(),
            min_size: 256,
            dark_color: "#000000".to_string(),
            light_color: "#ffffff".to_string(),
        }
    }
}

impl QrConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.error_correction.to_ascii_uppercase().as_str(), "L" | "M" | "Q" | "H") {
            return Err(ConfigError::InvalidValue {
                field: "qr.errorCorrection",
                reason: format!("expected L, M, Q or H, got '{}'", self.error_correction),
            });
        }
        for (field, color) in [("qr.darkColor", &self.dark_color), ("qr.lightColor", &self.light_color)] {
            if color.is_empty() || color.contains(['"', '<', '>', '&']) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("unusable color '{}'", color),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = AppConfig::from_json(
            r##"{"containerSelector": "#qr-code", "inputSelector": "#input-text"}"##,
        )
        .unwrap();

        assert_eq!(config.container_selector().unwrap(), "#qr-code");
        assert_eq!(config.input_selector().unwrap(), "#input-text");
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.presentation_mode, PresentationMode::InlineSvg);
        assert_eq!(config.filename.max_length, 50);
        assert_eq!(config.filename.default_name, "download");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_selector_is_config_error() {
        let config = AppConfig::from_json(r##"{"containerSelector": "#qr-code"}"##).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingSelector("inputSelector"))
        );

        let blank = AppConfig::with_selectors("  ", "#input-text");
        assert_eq!(
            blank.validate(),
            Err(ConfigError::MissingSelector("containerSelector"))
        );
    }

    #[test]
    fn test_strict_mode_and_nested_options() {
        let config = AppConfig::from_json(
            r##"{
                "containerSelector": "#qr",
                "inputSelector": "#text",
                "presentationMode": "strict-anchor",
                "debounceMs": 0,
                "filename": {"maxLength": 20},
                "qr": {"errorCorrection": "h"}
            }"##,
        )
        .unwrap();

        assert_eq!(config.presentation_mode, PresentationMode::StrictAnchor);
        assert_eq!(config.debounce(), Duration::ZERO);
        assert_eq!(config.filename.max_length, 20);
        assert_eq!(config.filename.default_name, "download");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::with_selectors("#qr", "#text");
        config.qr.error_correction = "X".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "qr.errorCorrection", .. })
        ));

        let mut config = AppConfig::with_selectors("#qr", "#text");
        config.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "logLevel", .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(AppConfig::from_json("{").is_err());
    }
}
