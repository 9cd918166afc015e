//! Page bootstrap and the `QrApp` handle returned to JavaScript

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

use crate::controller::{ControllerOptions, DomSurface, QrController, Services, INIT_FAILURE_MESSAGE};
use crate::error::{describe_js_error, AppError, ConfigError};
use crate::models::config::AppConfig;
use crate::services::{BrowserEventLoop, BrowserFileDownloader, BrowserHashStore, ListenerScope, QrSvgGenerator};

/// Global property the running controller is published under
pub const DEBUG_HOOK_NAME: &str = "__qrController";

/// A running QR app bound to the page
#[wasm_bindgen]
#[derive(Clone)]
pub struct QrApp {
    controller: QrController,
    /// Form submit and beforeunload listeners
    page_scope: ListenerScope,
}

#[wasm_bindgen]
impl QrApp {
    /// Detach every listener; later events are ignored
    pub fn destroy(&self) {
        self.controller.destroy();
        self.page_scope.cancel();
    }

    /// Text currently encoded in the fragment
    #[wasm_bindgen(js_name = sourceText)]
    pub fn source_text(&self) -> String {
        self.controller.source_text()
    }

    /// Lifecycle phase: uninitialized, ready, regenerating, failed or destroyed
    pub fn phase(&self) -> String {
        self.controller.phase().to_string()
    }

    /// Sanitized SVG currently on screen
    #[wasm_bindgen(js_name = currentSvg)]
    pub fn current_svg(&self) -> Option<String> {
        self.controller.artifact()
    }

    /// Download the displayed QR code
    pub fn download(&self) {
        self.controller.download();
    }
}

/// Start the app on the current page
///
/// # Parameters
/// - `config`: `{ containerSelector, inputSelector, ... }`
///
/// # Returns
/// A `QrApp` once the first QR code is on screen
#[wasm_bindgen(js_name = startApp)]
pub async fn start_app(config: JsValue) -> Result<QrApp, JsValue> {
    let config: AppConfig = if config.is_undefined() || config.is_null() {
        AppConfig::default()
    } else {
        super::helpers::deserialize(config, "Invalid QR app config")?
    };

    match bootstrap(&config).await {
        Ok(app) => {
            wasm_info!("QR app started");
            Ok(app)
        }
        Err(err) => {
            wasm_error!("QR app failed to start: {}", err);
            if matches!(err, AppError::Config(_)) {
                show_init_failure(&config);
            }
            Err(err.into())
        }
    }
}

async fn bootstrap(config: &AppConfig) -> Result<QrApp, AppError> {
    config.validate()?;
    log::set_max_level(config.log_level()?);

    let surface = DomSurface::from_selectors(config.container_selector()?, config.input_selector()?)?;
    let services = Services {
        hash_store: Rc::new(BrowserHashStore::new()?),
        generator: Rc::new(QrSvgGenerator::from_config(&config.qr)?),
        downloader: Rc::new(BrowserFileDownloader::new()?),
        event_loop: Rc::new(BrowserEventLoop::new()?),
    };
    let options = ControllerOptions {
        mode: config.presentation_mode,
        debounce: config.debounce(),
        filename: (&config.filename).into(),
    };

    let app = QrApp {
        controller: QrController::new(Rc::new(surface), services, options),
        page_scope: ListenerScope::new(),
    };
    app.controller.initialize().await?;

    if let Err(err) = bind_page(&app, config) {
        app.destroy();
        return Err(err);
    }
    if config.expose_debug_hook {
        expose_debug_hook(&app);
    }
    Ok(app)
}

fn browser() -> Result<(Window, Document), ConfigError> {
    let window = web_sys::window().ok_or_else(|| ConfigError::NoBrowser("no window".to_string()))?;
    let document = window
        .document()
        .ok_or_else(|| ConfigError::NoBrowser("no document".to_string()))?;
    Ok((window, document))
}

/// Keep the form from reloading the page and tear down on unload
fn bind_page(app: &QrApp, config: &AppConfig) -> Result<(), AppError> {
    let (window, document) = browser()?;

    match document.query_selector(&config.form_selector) {
        Ok(Some(form)) => {
            app.page_scope
                .listen(&form, "submit", |event| event.prevent_default())?;
        }
        Ok(None) => log::debug!("No form matches '{}'", config.form_selector),
        Err(err) => log::warn!(
            "Invalid form selector '{}': {}",
            config.form_selector,
            describe_js_error(&err)
        ),
    }

    let handle = app.clone();
    app.page_scope
        .listen(&window, "beforeunload", move |_event| handle.destroy())?;
    Ok(())
}

fn expose_debug_hook(app: &QrApp) {
    let Some(window) = web_sys::window() else {
        return;
    };
    match js_sys::Reflect::set(&window, &JsValue::from_str(DEBUG_HOOK_NAME), &JsValue::from(app.clone())) {
        Ok(_) => log::debug!("Controller exposed as window.{}", DEBUG_HOOK_NAME),
        Err(err) => log::warn!("Failed to expose debug hook: {}", describe_js_error(&err)),
    }
}

/// Best effort: the container may be the thing that is missing
fn show_init_failure(config: &AppConfig) {
    let Ok((_, document)) = browser() else {
        return;
    };
    let Ok(selector) = config.container_selector() else {
        return;
    };
    let Ok(Some(container)) = document.query_selector(selector) else {
        return;
    };

    container.set_text_content(None);
    let result = document.create_element("div").and_then(|message| {
        message.set_class_name("error-message");
        message.set_text_content(Some(INIT_FAILURE_MESSAGE));
        container.append_child(&message)
    });
    if let Err(err) = result {
        log::error!("Failed to show init failure: {}", describe_js_error(&err));
    }
}
