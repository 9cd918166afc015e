//! Standalone helpers exported to JavaScript

use wasm_bindgen::prelude::*;

use crate::error::AppError;
use crate::sanitize::filename::{build_artifact_filename, sanitize_for_filename, FilenameOptions};
use crate::sanitize::svg::{sanitize_svg, SanitizeProfile};

/// Sanitize text into a filename
///
/// # Parameters
/// - `text`: arbitrary text
/// - `max_length`: maximum length in characters (default 50)
/// - `default_name`: used when nothing survives (default "download")
#[wasm_bindgen(js_name = sanitizeFilename)]
pub fn sanitize_filename(text: &str, max_length: Option<usize>, default_name: Option<String>) -> String {
    let mut options = FilenameOptions::default();
    if let Some(max_length) = max_length {
        options = options.with_max_length(max_length);
    }
    if let Some(default_name) = default_name {
        options = options.with_default_name(default_name);
    }
    sanitize_for_filename(text, &options)
}

/// `qr_code_<sanitized text>.svg`
#[wasm_bindgen(js_name = buildQrFilename)]
pub fn build_qr_filename(text: &str) -> String {
    build_artifact_filename(text)
}

/// Sanitize SVG markup; `strict` also strips inline style
#[wasm_bindgen(js_name = sanitizeSvg)]
pub fn sanitize_svg_markup(raw: &str, strict: bool) -> Result<String, JsValue> {
    let profile = if strict {
        SanitizeProfile::Strict
    } else {
        SanitizeProfile::Styled
    };
    sanitize_svg(raw, profile).map_err(|e| {
        wasm_warn!("sanitizeSvg rejected markup: {}", e);
        AppError::from(e).into()
    })
}
