//! JavaScript-facing API
//!
//! `startApp(config)` wires the browser services into a `QrController`;
//! the remaining exports are pure helpers usable without a page.

#[macro_use]
pub mod helpers;

pub mod app;
pub mod exports;

pub use app::{start_app, QrApp, DEBUG_HOOK_NAME};
pub use exports::{build_qr_filename, sanitize_filename, sanitize_svg_markup};
