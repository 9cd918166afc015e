//! End-to-end controller behaviour against the in-memory services

use std::rc::Rc;
use std::time::Duration;

use futures_lite::future::block_on;

use hash_qr::controller::{
    ControllerOptions, MemorySurface, Phase, Presented, QrController, Services, Surface, INIT_FAILURE_MESSAGE,
};
use hash_qr::models::{PresentationMode, SVG_MIME_TYPE};
use hash_qr::services::{HashStore, ManualEventLoop, MemoryHashStore, RecordingDownloader, ScriptedGenerator};

const BASE: &str = "https://x/";

/// Controller wired to in-memory services, with handles kept for inspection
struct Harness {
    controller: QrController,
    surface: Rc<MemorySurface>,
    hash_store: Rc<MemoryHashStore>,
    generator: Rc<ScriptedGenerator>,
    downloader: Rc<RecordingDownloader>,
    event_loop: Rc<ManualEventLoop>,
}

impl Harness {
    fn new() -> Self {
        Self::with_options(ControllerOptions::default())
    }

    fn with_options(options: ControllerOptions) -> Self {
        let surface = Rc::new(MemorySurface::new());
        let hash_store = Rc::new(MemoryHashStore::with_base_address(BASE));
        let generator = Rc::new(ScriptedGenerator::new());
        let downloader = Rc::new(RecordingDownloader::new());
        let event_loop = Rc::new(ManualEventLoop::new());

        let services = Services {
            hash_store: hash_store.clone(),
            generator: generator.clone(),
            downloader: downloader.clone(),
            event_loop: event_loop.clone(),
        };
        let controller = QrController::new(surface.clone(), services, options);

        Self {
            controller,
            surface,
            hash_store,
            generator,
            downloader,
            event_loop,
        }
    }

    fn started() -> Self {
        let harness = Self::new();
        block_on(harness.controller.initialize()).expect("initialize");
        harness
    }

    /// Type into the input and let the resulting cycle finish
    fn edit(&self, text: &str) {
        self.surface.type_text(text);
        self.event_loop.run_until_stalled();
    }

    fn shown_label(&self) -> Option<String> {
        self.surface.artifact().map(|artifact| artifact.label)
    }
}

#[test]
fn test_initialize_seeds_empty_fragment_with_base_address() {
    let harness = Harness::started();

    assert_eq!(harness.controller.phase(), Phase::Ready);
    assert_eq!(harness.hash_store.value(), BASE);
    assert_eq!(harness.surface.input_value(), BASE);
    assert_eq!(harness.controller.source_text(), BASE);
    assert_eq!(harness.generator.calls(), vec![BASE.to_string()]);
    assert!(harness.surface.has_listeners());

    let artifact = harness.surface.artifact().expect("artifact shown");
    assert_eq!(artifact.label, "QR code for https://x/");
    assert_eq!(artifact.filename, "qr_code_https___x_.svg");
    assert!(artifact.markup.starts_with("<svg"));
}

#[test]
fn test_initialize_keeps_existing_fragment() {
    let harness = Harness::new();
    harness.hash_store.set_raw_fragment("#hello%20world");

    block_on(harness.controller.initialize()).expect("initialize");

    assert_eq!(harness.surface.input_value(), "hello world");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for hello world"));
    assert_eq!(harness.hash_store.raw_fragment(), "hello%20world");
}

#[test]
fn test_initialize_twice_is_rejected() {
    let harness = Harness::started();
    assert!(block_on(harness.controller.initialize()).is_err());
    assert_eq!(harness.controller.phase(), Phase::Ready);
}

#[test]
fn test_initialize_failure_shows_message() {
    let harness = Harness::new();
    harness.generator.fail_on(BASE);

    assert!(block_on(harness.controller.initialize()).is_err());
    assert_eq!(harness.controller.phase(), Phase::Failed);
    assert_eq!(harness.surface.message().as_deref(), Some(INIT_FAILURE_MESSAGE));
    assert!(!harness.surface.has_listeners());
}

#[test]
fn test_typing_updates_fragment_and_code() {
    let harness = Harness::started();
    harness.edit("hello world");

    assert_eq!(harness.hash_store.value(), "hello world");
    assert_eq!(harness.hash_store.raw_fragment(), "hello%20world");
    assert_eq!(harness.controller.source_text(), "hello world");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for hello world"));
    assert_eq!(harness.controller.phase(), Phase::Ready);
}

#[test]
fn test_input_is_trimmed() {
    let harness = Harness::started();
    harness.edit("  padded  ");

    assert_eq!(harness.hash_store.value(), "padded");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for padded"));
}

#[test]
fn test_fragment_special_characters_round_trip() {
    let harness = Harness::started();
    harness.edit("a#b?c=100%");

    assert_eq!(harness.hash_store.value(), "a#b?c=100%");
    assert!(!harness.hash_store.raw_fragment().contains(['#', '?', ' ']));
    assert_eq!(harness.controller.source_text(), "a#b?c=100%");
}

#[test]
fn test_clearing_input_falls_back_to_base_address() {
    let harness = Harness::started();
    harness.edit("hello");
    harness.edit("   ");

    assert_eq!(harness.hash_store.raw_fragment(), "");
    assert_eq!(harness.hash_store.current_address(), BASE);
    assert_eq!(harness.controller.source_text(), BASE);
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for https://x/"));
}

#[test]
fn test_click_downloads_displayed_code() {
    let harness = Harness::started();
    harness.surface.click_artifact();

    let download = harness.downloader.last_download().expect("download triggered");
    assert_eq!(download.filename, "qr_code_https___x_.svg");
    assert_eq!(download.mime_type, SVG_MIME_TYPE);
    assert_eq!(Some(download.content), harness.controller.artifact());

    harness.edit("hello");
    harness.surface.click_artifact();
    let download = harness.downloader.last_download().expect("second download");
    assert_eq!(download.filename, "qr_code_hello.svg");
    assert_eq!(harness.downloader.downloads().len(), 2);
}

#[test]
fn test_generation_error_then_recovery() {
    let harness = Harness::started();
    harness.generator.fail_on("error");

    harness.edit("error");
    assert_eq!(
        harness.surface.message().as_deref(),
        Some("Error: Failed to generate QR code: QR generation failed")
    );
    assert_eq!(harness.controller.artifact(), None);
    assert_eq!(harness.controller.phase(), Phase::Ready);

    // Nothing to download while the error is shown
    harness.surface.click_artifact();
    harness.controller.download();
    assert!(harness.downloader.downloads().is_empty());

    harness.edit("ok");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for ok"));
    harness.surface.click_artifact();
    assert_eq!(
        harness.downloader.last_download().map(|d| d.filename).as_deref(),
        Some("qr_code_ok.svg")
    );
}

#[test]
fn test_stale_result_is_discarded() {
    let harness = Harness::started();
    let gate = harness.generator.hold("slow");

    harness.edit("slow");
    assert_eq!(harness.controller.phase(), Phase::Regenerating);
    assert_eq!(harness.event_loop.pending_tasks(), 1);

    harness.edit("fast");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for fast"));
    let renders = harness.surface.render_count();

    gate.open();
    harness.event_loop.run_until_stalled();

    assert_eq!(harness.event_loop.pending_tasks(), 0);
    assert_eq!(harness.surface.render_count(), renders);
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for fast"));
    assert_eq!(harness.controller.source_text(), "fast");
}

#[test]
fn test_debounce_regenerates_once_with_last_value() {
    let harness = Harness::with_options(ControllerOptions {
        debounce: Duration::from_millis(300),
        ..ControllerOptions::default()
    });
    block_on(harness.controller.initialize()).expect("initialize");

    for text in ["a", "ab", "abc"] {
        harness.surface.type_text(text);
        harness.event_loop.advance(Duration::from_millis(100));
    }
    assert_eq!(harness.generator.call_count(), 1);
    assert_eq!(harness.hash_store.value(), BASE);

    harness.event_loop.advance(Duration::from_millis(200));
    assert_eq!(harness.generator.calls(), vec![BASE.to_string(), "abc".to_string()]);
    assert_eq!(harness.hash_store.value(), "abc");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for abc"));
}

#[test]
fn test_own_fragment_write_is_not_regenerated_twice() {
    let harness = Harness::started();
    harness.edit("hello");
    let calls = harness.generator.call_count();

    // The browser echoes our write back as a hashchange
    harness.surface.fire_hash_change();
    harness.event_loop.run_until_stalled();

    assert_eq!(harness.generator.call_count(), calls);
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for hello"));
}

#[test]
fn test_external_fragment_change_updates_input() {
    let harness = Harness::started();
    harness.edit("first");

    // Back button restores an earlier fragment
    harness.hash_store.set_raw_fragment("#elsewhere%3F");
    harness.surface.fire_hash_change();
    harness.event_loop.run_until_stalled();

    assert_eq!(harness.surface.input_value(), "elsewhere?");
    assert_eq!(harness.controller.source_text(), "elsewhere?");
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for elsewhere?"));
}

#[test]
fn test_navigating_back_to_current_text_restores_cleared_input() {
    let harness = Harness::started();
    harness.edit("");
    assert_eq!(harness.surface.input_value(), "");
    assert_eq!(harness.hash_store.raw_fragment(), "");
    let calls = harness.generator.call_count();

    // Back button returns to the seeded `#<base>` entry
    harness.hash_store.set_value(BASE).unwrap();
    harness.surface.fire_hash_change();
    harness.event_loop.run_until_stalled();

    assert_eq!(harness.surface.input_value(), BASE);
    assert_eq!(harness.generator.call_count(), calls);
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for https://x/"));
}

#[test]
fn test_destroy_ignores_later_events_and_results() {
    let harness = Harness::started();
    let gate = harness.generator.hold("late");
    harness.edit("late");

    harness.controller.destroy();
    assert_eq!(harness.controller.phase(), Phase::Destroyed);
    assert!(!harness.surface.has_listeners());

    gate.open();
    harness.event_loop.run_until_stalled();
    assert_eq!(harness.shown_label().as_deref(), Some("QR code for https://x/"));

    harness.edit("ignored");
    harness.controller.handle_event(hash_qr::controller::UiEvent::HashChange);
    harness.surface.click_artifact();

    assert_eq!(harness.hash_store.value(), "late");
    assert!(harness.downloader.downloads().is_empty());
    assert_eq!(harness.controller.artifact(), None);

    // Destroy is idempotent
    harness.controller.destroy();
}

#[test]
fn test_destroy_cancels_pending_debounce() {
    let harness = Harness::with_options(ControllerOptions {
        debounce: Duration::from_millis(300),
        ..ControllerOptions::default()
    });
    block_on(harness.controller.initialize()).expect("initialize");

    harness.surface.type_text("never");
    assert_eq!(harness.event_loop.pending_timers(), 1);

    harness.controller.destroy();
    assert_eq!(harness.event_loop.pending_timers(), 0);
    harness.event_loop.advance(Duration::from_secs(1));
    assert_eq!(harness.hash_store.value(), BASE);
}

#[test]
fn test_strict_anchor_mode_renders_downloadable_artifact() {
    let harness = Harness::with_options(ControllerOptions {
        mode: PresentationMode::StrictAnchor,
        ..ControllerOptions::default()
    });
    block_on(harness.controller.initialize()).expect("initialize");

    match harness.surface.presented() {
        Presented::Artifact(artifact) => {
            assert_eq!(artifact.mode, PresentationMode::StrictAnchor);
            assert!(!artifact.markup.contains("style"));
            assert!(!artifact.markup.contains("<?xml"));
        }
        other => panic!("expected artifact, got {:?}", other),
    }
}
