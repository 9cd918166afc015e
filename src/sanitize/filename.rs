//! Filename policy for downloaded QR codes
//!
//! Every character outside the allowed set becomes `_`, the result is cut to
//! `max_length` characters, and names that end up empty (or all `_`) fall back
//! to `default_name`.

use once_cell::sync::Lazy;
use regex::Regex;

pub const FILENAME_PREFIX: &str = "qr_code_";
pub const FILENAME_SUFFIX: &str = ".svg";
pub const DEFAULT_MAX_LENGTH: usize = 50;
pub const DEFAULT_NAME: &str = "download";

/// Characters that get replaced: anything outside `[A-Za-z0-9.-]`
static DEFAULT_DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9.\-]").expect("default filename pattern is valid")
});

const REPLACEMENT: &str = "_";

#[derive(Clone, Debug)]
pub struct FilenameOptions {
    /// Maximum length in characters
    pub max_length: usize,
    /// Used when nothing meaningful survives sanitization
    pub default_name: String,
    /// Single-character pattern of what to replace with `_`
    pub disallowed: Regex,
}

impl Default for FilenameOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            default_name: DEFAULT_NAME.to_string(),
            disallowed: DEFAULT_DISALLOWED.clone(),
        }
    }
}

impl FilenameOptions {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_default_name(mut self, default_name: impl Into<String>) -> Self {
        self.default_name = default_name.into();
        self
    }

    pub fn with_disallowed(mut self, disallowed: Regex) -> Self {
        self.disallowed = disallowed;
        self
    }
}

/// Normalize arbitrary text into a filename-safe string
pub fn sanitize_for_filename(text: &str, options: &FilenameOptions) -> String {
    let truncated = replace_and_truncate(text, options);

    if truncated.chars().all(|c| c == '_') {
        // The fallback obeys the same policy so the result is a fixed point
        replace_and_truncate(&options.default_name, options)
    } else {
        truncated
    }
}

fn replace_and_truncate(text: &str, options: &FilenameOptions) -> String {
    options
        .disallowed
        .replace_all(text, REPLACEMENT)
        .chars()
        .take(options.max_length)
        .collect()
}

/// `qr_code_<sanitized>.svg` with the default policy
pub fn build_artifact_filename(text: &str) -> String {
    build_artifact_filename_with(text, &FilenameOptions::default())
}

pub fn build_artifact_filename_with(text: &str, options: &FilenameOptions) -> String {
    format!("{}{}{}", FILENAME_PREFIX, sanitize_for_filename(text, options), FILENAME_SUFFIX)
}
