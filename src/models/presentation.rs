//! Presentation of the rendered artifact

use serde::{Deserialize, Serialize};

use crate::sanitize::svg::SanitizeProfile;

/// How the QR code is placed into the page
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    /// SVG element inserted inline, inline styles kept, click to download
    #[default]
    InlineSvg,
    /// SVG stripped of inline styles and wrapped in a download anchor,
    /// for pages whose CSP forbids inline style
    StrictAnchor,
}

impl PresentationMode {
    /// Sanitizer profile the artifact must pass through for this mode
    pub fn sanitize_profile(self) -> SanitizeProfile {
        match self {
            PresentationMode::InlineSvg => SanitizeProfile::Styled,
            PresentationMode::StrictAnchor => SanitizeProfile::Strict,
        }
    }
}

/// Everything a surface needs to put one artifact on screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Sanitized SVG markup
    pub markup: String,
    /// Accessible label describing what the code encodes
    pub label: String,
    /// Filename offered when the artifact is downloaded
    pub filename: String,
    pub mode: PresentationMode,
}

impl RenderedArtifact {
    pub fn label_for(text: &str) -> String {
        format!("QR code for {}", text)
    }
}

/// Hover hint attached to the rendered artifact
pub const DOWNLOAD_HINT: &str = "Click to download";
