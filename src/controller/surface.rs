//! The presented page, seen from the controller

use std::rc::Rc;

use crate::error::RenderError;
use crate::models::presentation::RenderedArtifact;
use crate::services::listeners::ListenerScope;

/// Something the user did, reported by the surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// The input field changed; carries its full current value
    Input(String),
    /// The URL fragment changed outside the controller (navigation, address bar)
    HashChange,
    /// The rendered artifact was activated for download
    DownloadRequested,
}

/// Callback a surface uses to report events back to the controller
pub type Dispatch = Rc<dyn Fn(UiEvent)>;

pub trait Surface {
    fn input_value(&self) -> String;

    fn set_input_value(&self, text: &str);

    /// Attach the input and fragment-change listeners under `scope`
    fn attach(&self, scope: &ListenerScope, dispatch: Dispatch) -> Result<(), RenderError>;

    /// Replace the presentation area with `artifact`. Download activation is
    /// reported through `dispatch` until `scope` is cancelled.
    fn render_artifact(
        &self,
        artifact: &RenderedArtifact,
        scope: &ListenerScope,
        dispatch: Dispatch,
    ) -> Result<(), RenderError>;

    /// Replace the presentation area with plain text
    fn show_message(&self, message: &str);
}
