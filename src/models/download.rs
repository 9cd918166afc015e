//! Download descriptor

use serde::{Deserialize, Serialize};

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// One file to hand to the browser: built at download time, never stored
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub filename: String,
    pub content: String,
    pub mime_type: String,
}

impl DownloadRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }

    /// An SVG download
    pub fn svg(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(filename, content, SVG_MIME_TYPE)
    }
}
