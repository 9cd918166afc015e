//! Sanitizers for user text and generated markup
//!
//! - `filename`: turns arbitrary text into a safe download filename
//! - `svg`: strips executable content from SVG markup before it reaches the DOM

pub mod filename;
pub mod svg;

pub use filename::{build_artifact_filename, build_artifact_filename_with, sanitize_for_filename, FilenameOptions};
pub use svg::{sanitize, sanitize_svg, strip_presentation_attributes, SanitizeProfile};
