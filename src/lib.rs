//! Hash QR WASM Module
//!
//! Shows a QR code of the page address. The text lives in the URL fragment,
//! is mirrored into an input field, and every change produces a fresh,
//! sanitized SVG that can be downloaded as `qr_code_<text>.svg`.

pub mod api;
pub mod controller;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod services;

// Re-export commonly used types
pub use controller::{ControllerOptions, Phase, QrController, Services};
pub use error::AppError;
pub use models::config::AppConfig;
pub use models::presentation::PresentationMode;

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    init_logger();

    log::info!("Hash QR WASM module initialized");
}

#[cfg(feature = "console_log")]
fn init_logger() {
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("failed to initialize logger: {}", err).into());
    }
}
