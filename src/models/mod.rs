//! Models module for the QR app
//!
//! Configuration, presentation and download descriptions shared by the
//! controller and the browser services.

pub mod config;
pub mod download;
pub mod presentation;

// Re-export commonly used types
pub use config::{AppConfig, FilenameConfig, QrConfig};
pub use download::{DownloadRequest, SVG_MIME_TYPE};
pub use presentation::{PresentationMode, RenderedArtifact, DOWNLOAD_HINT};
