//! In-memory surface for driving the controller from tests

use std::cell::{Cell, RefCell};

use crate::controller::surface::{Dispatch, Surface, UiEvent};
use crate::error::RenderError;
use crate::models::presentation::RenderedArtifact;
use crate::services::listeners::ListenerScope;

/// What the presentation area currently shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presented {
    Nothing,
    Artifact(RenderedArtifact),
    Message(String),
}

pub struct MemorySurface {
    input: RefCell<String>,
    presented: RefCell<Presented>,
    renders: Cell<usize>,
    page_listeners: RefCell<Option<(ListenerScope, Dispatch)>>,
    artifact_listener: RefCell<Option<(ListenerScope, Dispatch)>>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            input: RefCell::new(String::new()),
            presented: RefCell::new(Presented::Nothing),
            renders: Cell::new(0),
            page_listeners: RefCell::new(None),
            artifact_listener: RefCell::new(None),
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Presented {
        self.presented.borrow().clone()
    }

    /// The rendered artifact, if one is shown
    pub fn artifact(&self) -> Option<RenderedArtifact> {
        match &*self.presented.borrow() {
            Presented::Artifact(artifact) => Some(artifact.clone()),
            _ => None,
        }
    }

    /// The displayed message, if one is shown
    pub fn message(&self) -> Option<String> {
        match &*self.presented.borrow() {
            Presented::Message(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Number of artifacts rendered so far
    pub fn render_count(&self) -> usize {
        self.renders.get()
    }

    pub fn has_listeners(&self) -> bool {
        live(&self.page_listeners).is_some()
    }

    /// User replaces the input text
    pub fn type_text(&self, text: &str) {
        *self.input.borrow_mut() = text.to_string();
        if let Some(dispatch) = live(&self.page_listeners) {
            dispatch(UiEvent::Input(text.to_string()));
        }
    }

    /// Browser reports a fragment change
    pub fn fire_hash_change(&self) {
        if let Some(dispatch) = live(&self.page_listeners) {
            dispatch(UiEvent::HashChange);
        }
    }

    /// User activates the rendered artifact
    pub fn click_artifact(&self) {
        if let Some(dispatch) = live(&self.artifact_listener) {
            dispatch(UiEvent::DownloadRequested);
        }
    }
}

/// Dispatch of a registration whose scope is still active
fn live(slot: &RefCell<Option<(ListenerScope, Dispatch)>>) -> Option<Dispatch> {
    slot.borrow()
        .as_ref()
        .filter(|(scope, _)| !scope.is_cancelled())
        .map(|(_, dispatch)| dispatch.clone())
}

impl Surface for MemorySurface {
    fn input_value(&self) -> String {
        self.input.borrow().clone()
    }

    fn set_input_value(&self, text: &str) {
        *self.input.borrow_mut() = text.to_string();
    }

    fn attach(&self, scope: &ListenerScope, dispatch: Dispatch) -> Result<(), RenderError> {
        *self.page_listeners.borrow_mut() = Some((scope.clone(), dispatch));
        Ok(())
    }

    fn render_artifact(
        &self,
        artifact: &RenderedArtifact,
        scope: &ListenerScope,
        dispatch: Dispatch,
    ) -> Result<(), RenderError> {
        *self.presented.borrow_mut() = Presented::Artifact(artifact.clone());
        *self.artifact_listener.borrow_mut() = Some((scope.clone(), dispatch));
        self.renders.set(self.renders.get() + 1);
        Ok(())
    }

    fn show_message(&self, message: &str) {
        *self.presented.borrow_mut() = Presented::Message(message.to_string());
        *self.artifact_listener.borrow_mut() = None;
    }
}
