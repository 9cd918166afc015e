//! QR code controller
//!
//! Keeps the URL fragment, the generated SVG and the page in sync:
//!
//! ```text
//! input / hashchange → HashStore → ArtifactGenerator → sanitizer → Surface
//! ```
//!
//! Every regeneration takes a request token when it starts. A result whose
//! token is no longer the latest is dropped, so the last edit always wins no
//! matter in which order the async cycles complete.

pub mod dom;
pub mod memory;
pub mod surface;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures_lite::FutureExt;
use serde::Serialize;

use crate::error::{AppError, GenerationError, RenderError};
use crate::models::download::DownloadRequest;
use crate::models::presentation::{PresentationMode, RenderedArtifact};
use crate::sanitize::filename::{build_artifact_filename_with, FilenameOptions};
use crate::sanitize::svg::{sanitize_svg, SanitizeProfile};
use crate::services::{ArtifactGenerator, EventLoop, FileDownloader, HashStore, ListenerScope, TimerHandle};

pub use dom::DomSurface;
pub use memory::{MemorySurface, Presented};
pub use surface::{Dispatch, Surface, UiEvent};

pub const INIT_FAILURE_MESSAGE: &str =
    "Failed to initialize the application. Please refresh the page and try again.";

/// Lifecycle of a controller
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Uninitialized,
    Ready,
    /// A generation cycle is in flight
    Regenerating,
    /// Initialization failed; the page shows the init failure message
    Failed,
    Destroyed,
}

impl Phase {
    /// Whether UI events are still handled
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Ready | Phase::Regenerating)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Ready => "ready",
            Phase::Regenerating => "regenerating",
            Phase::Failed => "failed",
            Phase::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct ControllerOptions {
    pub mode: PresentationMode,
    /// Zero reacts to every input event immediately
    pub debounce: Duration,
    pub filename: FilenameOptions,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            mode: PresentationMode::default(),
            debounce: Duration::ZERO,
            filename: FilenameOptions::default(),
        }
    }
}

/// Everything the controller talks to besides the surface
#[derive(Clone)]
pub struct Services {
    pub hash_store: Rc<dyn HashStore>,
    pub generator: Rc<dyn ArtifactGenerator>,
    pub downloader: Rc<dyn FileDownloader>,
    pub event_loop: Rc<dyn EventLoop>,
}

/// The artifact currently on screen and the text it encodes
#[derive(Clone, Debug)]
struct CurrentArtifact {
    text: String,
    markup: String,
}

struct State {
    phase: Phase,
    source_text: String,
    artifact: Option<CurrentArtifact>,
    latest_request: u64,
    /// Page-level listeners (input, hashchange)
    scope: Option<ListenerScope>,
    /// Listeners of the rendered artifact, replaced on every render
    render_scope: Option<ListenerScope>,
    pending_edit: Option<TimerHandle>,
}

struct Inner {
    options: ControllerOptions,
    services: Services,
    surface: Rc<dyn Surface>,
    state: RefCell<State>,
}

/// Cheap handle; clones drive the same controller
#[derive(Clone)]
pub struct QrController {
    inner: Rc<Inner>,
}

impl QrController {
    pub fn new(surface: Rc<dyn Surface>, services: Services, options: ControllerOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                options,
                services,
                surface,
                state: RefCell::new(State {
                    phase: Phase::Uninitialized,
                    source_text: String::new(),
                    artifact: None,
                    latest_request: 0,
                    scope: None,
                    render_scope: None,
                    pending_edit: None,
                }),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase
    }

    /// Text currently mirrored between the input field and the fragment
    pub fn source_text(&self) -> String {
        self.inner.state.borrow().source_text.clone()
    }

    /// Sanitized SVG currently displayed
    pub fn artifact(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .artifact
            .as_ref()
            .map(|artifact| artifact.markup.clone())
    }

    /// Seed the fragment, render the first code, then start listening.
    /// On failure the page shows the init failure message and the
    /// controller ends up in `Phase::Failed`.
    pub async fn initialize(&self) -> Result<(), AppError> {
        let scope = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase != Phase::Uninitialized {
                return Err(AppError::InvalidState(format!(
                    "initialize called while {}",
                    state.phase
                )));
            }
            let scope = ListenerScope::new();
            state.scope = Some(scope.clone());
            scope
        };

        match self.run_initialization(&scope).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if self.phase() == Phase::Destroyed {
                    return Ok(());
                }
                log::error!("QR controller initialization failed: {}", err);
                self.cancel_listeners();
                self.inner.state.borrow_mut().phase = Phase::Failed;
                self.inner.surface.show_message(INIT_FAILURE_MESSAGE);
                Err(err)
            }
        }
    }

    async fn run_initialization(&self, scope: &ListenerScope) -> Result<(), AppError> {
        let hash_store = &self.inner.services.hash_store;
        if hash_store.value().is_empty() {
            let base = hash_store.base_address();
            log::debug!("Seeding empty fragment with {}", base);
            hash_store.set_value(&base)?;
        }

        let text = hash_store.effective_text();
        self.inner.surface.set_input_value(&text);
        let token = self.begin_cycle(&text);

        let markup = produce_artifact(
            self.inner.services.generator.clone(),
            &text,
            self.inner.options.mode.sanitize_profile(),
        )
        .await?;

        if !self.is_current(token) {
            return Ok(());
        }
        self.present(&text, markup)?;

        self.inner.surface.attach(scope, self.dispatcher(scope))?;
        self.inner.state.borrow_mut().phase = Phase::Ready;
        log::info!("QR controller ready ({:?} mode)", self.inner.options.mode);
        Ok(())
    }

    /// Detach every listener and stop reacting. Later events and late
    /// generation results are ignored.
    pub fn destroy(&self) {
        let (scope, render_scope, pending_edit) = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == Phase::Destroyed {
                return;
            }
            state.phase = Phase::Destroyed;
            state.artifact = None;
            (state.scope.take(), state.render_scope.take(), state.pending_edit.take())
        };

        if let Some(pending_edit) = pending_edit {
            pending_edit.cancel();
        }
        for scope in [render_scope, scope].into_iter().flatten() {
            scope.cancel();
        }
        log::info!("QR controller destroyed");
    }

    /// React to a UI event. Ignored unless the controller is live.
    pub fn handle_event(&self, event: UiEvent) {
        let phase = self.phase();
        if !phase.is_live() {
            log::debug!("Ignoring {:?} while {}", event, phase);
            return;
        }

        match event {
            UiEvent::Input(value) => self.on_input(value),
            UiEvent::HashChange => self.on_hash_change(),
            UiEvent::DownloadRequested => self.download(),
        }
    }

    fn dispatcher(&self, scope: &ListenerScope) -> Dispatch {
        let inner = Rc::downgrade(&self.inner);
        let scope = scope.clone();
        Rc::new(move |event| {
            if scope.is_cancelled() {
                return;
            }
            if let Some(inner) = inner.upgrade() {
                QrController { inner }.handle_event(event);
            }
        })
    }

    fn on_input(&self, raw: String) {
        let value = raw.trim().to_string();
        let debounce = self.inner.options.debounce;

        if debounce.is_zero() {
            self.apply_edit(&value);
            return;
        }

        let inner = Rc::downgrade(&self.inner);
        let timer = self.inner.services.event_loop.set_timeout(
            debounce,
            Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    QrController { inner }.apply_edit(&value);
                }
            }),
        );

        // The fired handle stays here until the next edit replaces it
        let previous = self.inner.state.borrow_mut().pending_edit.replace(timer);
        drop(previous);
    }

    fn apply_edit(&self, value: &str) {
        if !self.phase().is_live() {
            return;
        }

        let hash_store = &self.inner.services.hash_store;
        let stored = if value.is_empty() {
            hash_store.remove_value()
        } else {
            hash_store.set_value(value)
        };
        if let Err(err) = stored {
            self.show_cycle_error(&err.into());
            return;
        }

        let text = hash_store.effective_text();
        self.regenerate(text);
    }

    fn on_hash_change(&self) {
        let text = self.inner.services.hash_store.effective_text();
        let echo = text == self.inner.state.borrow().source_text;

        if echo && self.inner.surface.input_value().trim() == text {
            // Echo of our own fragment write
            return;
        }

        let pending_edit = self.inner.state.borrow_mut().pending_edit.take();
        drop(pending_edit);
        self.inner.surface.set_input_value(&text);

        if echo {
            // Navigated back to the text already on screen; only the field was stale
            log::debug!("Restored input field from fragment");
            return;
        }

        log::debug!("Fragment changed externally");
        self.regenerate(text);
    }

    /// Record `text` as the source text and hand out a new request token
    fn begin_cycle(&self, text: &str) -> u64 {
        let mut state = self.inner.state.borrow_mut();
        state.source_text = text.to_string();
        state.phase = Phase::Regenerating;
        state.latest_request += 1;
        state.latest_request
    }

    fn is_current(&self, token: u64) -> bool {
        let state = self.inner.state.borrow();
        state.phase != Phase::Destroyed && state.latest_request == token
    }

    fn regenerate(&self, text: String) {
        let token = self.begin_cycle(&text);
        let inner = Rc::downgrade(&self.inner);
        let generator = self.inner.services.generator.clone();
        let profile = self.inner.options.mode.sanitize_profile();

        let task = async move {
            let result = produce_artifact(generator, &text, profile).await;
            if let Some(inner) = inner.upgrade() {
                QrController { inner }.finish_cycle(token, &text, result);
            }
        };
        self.inner.services.event_loop.spawn(task.boxed_local());
    }

    fn finish_cycle(&self, token: u64, text: &str, result: Result<String, GenerationError>) {
        if !self.is_current(token) {
            log::debug!("Discarding superseded QR code for request #{}", token);
            return;
        }

        match result {
            Ok(markup) => {
                if let Err(err) = self.present(text, markup) {
                    self.show_cycle_error(&err.into());
                }
            }
            Err(err) => self.show_cycle_error(&err.into()),
        }

        let mut state = self.inner.state.borrow_mut();
        if state.phase == Phase::Regenerating {
            state.phase = Phase::Ready;
        }
    }

    /// Put a freshly generated artifact on screen
    fn present(&self, text: &str, markup: String) -> Result<(), RenderError> {
        let artifact = RenderedArtifact {
            markup: markup.clone(),
            label: RenderedArtifact::label_for(text),
            filename: build_artifact_filename_with(text, &self.inner.options.filename),
            mode: self.inner.options.mode,
        };

        let render_scope = ListenerScope::new();
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.artifact = Some(CurrentArtifact {
                text: text.to_string(),
                markup,
            });
            state.render_scope.replace(render_scope.clone())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        let dispatch = self.dispatcher(&render_scope);
        self.inner
            .surface
            .render_artifact(&artifact, &render_scope, dispatch)
    }

    fn show_cycle_error(&self, err: &AppError) {
        log::error!("QR code update failed: {}", err);

        let render_scope = {
            let mut state = self.inner.state.borrow_mut();
            state.artifact = None;
            state.render_scope.take()
        };
        if let Some(render_scope) = render_scope {
            render_scope.cancel();
        }
        self.inner.surface.show_message(&format!("Error: {}", err));
    }

    /// Hand the displayed artifact to the download trigger
    pub fn download(&self) {
        let request = {
            let state = self.inner.state.borrow();
            match &state.artifact {
                Some(artifact) => DownloadRequest::svg(
                    build_artifact_filename_with(&artifact.text, &self.inner.options.filename),
                    artifact.markup.clone(),
                ),
                None => {
                    log::warn!("Download requested with no QR code on screen");
                    return;
                }
            }
        };

        if let Err(err) = self.inner.services.downloader.download(&request) {
            log::error!("{}", err);
        }
    }

    fn cancel_listeners(&self) {
        let scopes = {
            let mut state = self.inner.state.borrow_mut();
            [state.render_scope.take(), state.scope.take()]
        };
        for scope in scopes.into_iter().flatten() {
            scope.cancel();
        }
    }
}

/// Generate and sanitize; sanitizer failures count as generation failures
async fn produce_artifact(
    generator: Rc<dyn ArtifactGenerator>,
    text: &str,
    profile: SanitizeProfile,
) -> Result<String, GenerationError> {
    let raw = generator.generate(text).await?;
    Ok(sanitize_svg(&raw, profile)?)
}
