//! WASM browser test
//!
//! Runs the browser services against a real document:
//! `wasm-pack test --headless --firefox`

#![cfg(target_arch = "wasm32")]

use std::rc::Rc;

use hash_qr::controller::{ControllerOptions, DomSurface, Phase, QrController, Services};
use hash_qr::services::{
    BrowserEventLoop, BrowserFileDownloader, BrowserHashStore, HashStore, ListenerScope, QrSvgGenerator,
    RecordingDownloader,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlInputElement, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Fresh `<div id=...>` and `<input id=...>` appended to the body
fn mount_fixture(id: &str) -> (String, String) {
    let document = document();
    let body = document.body().unwrap();

    let container = document.create_element("div").unwrap();
    container.set_id(&format!("{}-qr", id));
    body.append_child(&container).unwrap();

    let input = document.create_element("input").unwrap();
    input.set_id(&format!("{}-input", id));
    body.append_child(&input).unwrap();

    (format!("#{}-qr", id), format!("#{}-input", id))
}

#[wasm_bindgen_test]
fn test_hash_store_round_trip() {
    let store = BrowserHashStore::new().unwrap();

    store.set_value("hello world#1").unwrap();
    assert_eq!(store.value(), "hello world#1");

    store.remove_value().unwrap();
    assert_eq!(store.value(), "");
    assert!(!store.current_address().contains('#'));
}

#[wasm_bindgen_test]
fn test_missing_container_is_reported() {
    assert!(DomSurface::from_selectors("#does-not-exist", "#nor-this").is_err());
}

#[wasm_bindgen_test]
fn test_listener_scope_detaches() {
    let document = document();
    let target = document.create_element("button").unwrap();
    let clicks = Rc::new(std::cell::Cell::new(0));

    let scope = ListenerScope::new();
    let counter = clicks.clone();
    scope
        .listen(&target, "click", move |_| counter.set(counter.get() + 1))
        .unwrap();

    let html: web_sys::HtmlElement = target.clone().dyn_into().unwrap();
    html.click();
    scope.cancel();
    html.click();

    assert_eq!(clicks.get(), 1);
}

#[wasm_bindgen_test]
async fn test_controller_renders_into_page() {
    let (container, input) = mount_fixture("render");
    let surface = DomSurface::from_selectors(&container, &input).unwrap();

    let services = Services {
        hash_store: Rc::new(BrowserHashStore::new().unwrap()),
        generator: Rc::new(QrSvgGenerator::new()),
        downloader: Rc::new(BrowserFileDownloader::new().unwrap()),
        event_loop: Rc::new(BrowserEventLoop::new().unwrap()),
    };
    let controller = QrController::new(Rc::new(surface), services, ControllerOptions::default());
    controller.initialize().await.unwrap();

    assert_eq!(controller.phase(), Phase::Ready);

    let document = document();
    let svg = document
        .query_selector(&format!("{} svg", container))
        .unwrap()
        .expect("svg mounted");
    assert_eq!(svg.get_attribute("role").as_deref(), Some("img"));
    assert!(svg
        .get_attribute("aria-label")
        .unwrap()
        .starts_with("QR code for "));

    let field: HtmlInputElement = document.query_selector(&input).unwrap().unwrap().dyn_into().unwrap();
    assert_eq!(field.value(), controller.source_text());

    controller.destroy();
    assert_eq!(controller.phase(), Phase::Destroyed);
}

#[wasm_bindgen_test]
async fn test_enter_on_focused_code_downloads() {
    let (container, input) = mount_fixture("keyboard");
    let surface = DomSurface::from_selectors(&container, &input).unwrap();
    let downloader = Rc::new(RecordingDownloader::new());

    let services = Services {
        hash_store: Rc::new(BrowserHashStore::new().unwrap()),
        generator: Rc::new(QrSvgGenerator::new()),
        downloader: downloader.clone(),
        event_loop: Rc::new(BrowserEventLoop::new().unwrap()),
    };
    let controller = QrController::new(Rc::new(surface), services, ControllerOptions::default());
    controller.initialize().await.unwrap();

    let svg = document()
        .query_selector(&format!("{} svg", container))
        .unwrap()
        .expect("svg mounted");
    assert_eq!(svg.get_attribute("tabindex").as_deref(), Some("0"));

    let press = |key: &str| {
        let init = KeyboardEventInit::new();
        init.set_key(key);
        init.set_cancelable(true);
        let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
        svg.dispatch_event(&event).unwrap();
    };

    press("Tab");
    assert!(downloader.downloads().is_empty());

    press("Enter");
    assert_eq!(downloader.downloads().len(), 1);

    controller.destroy();
    press(" ");
    assert_eq!(downloader.downloads().len(), 1);
}
