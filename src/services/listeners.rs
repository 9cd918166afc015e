//! Listener lifetime management
//!
//! A `ListenerScope` is handed to every listener registration. Cancelling it
//! once detaches everything registered through it. In the browser each scope
//! owns an `AbortController` whose signal goes into `addEventListener`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AbortController, AddEventListenerOptions, Event, EventTarget};

use crate::error::{describe_js_error, RenderError};

#[derive(Default)]
struct ScopeState {
    cancelled: Cell<bool>,
    on_cancel: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Shared cancellation handle; clones observe the same cancellation
#[derive(Clone, Default)]
pub struct ListenerScope {
    state: Rc<ScopeState>,
}

impl ListenerScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Run `hook` when the scope is cancelled (immediately if it already is)
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            hook();
        } else {
            self.state.on_cancel.borrow_mut().push(Box::new(hook));
        }
    }

    /// Cancel the scope and run every cleanup hook. Idempotent.
    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        let hooks: Vec<_> = self.state.on_cancel.borrow_mut().drain(..).collect();
        for hook in hooks {
            hook();
        }
    }

    /// `addEventListener` tied to this scope: the listener is removed and its
    /// closure released when the scope is cancelled
    pub fn listen(
        &self,
        target: &EventTarget,
        event_type: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), RenderError> {
        if self.is_cancelled() {
            return Ok(());
        }

        let controller = AbortController::new()
            .map_err(|e| RenderError(format!("create AbortController: {}", describe_js_error(&e))))?;
        let options = AddEventListenerOptions::new();
        options.set_signal(&controller.signal());

        let closure = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                event_type,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| RenderError(format!("listen for {}: {}", event_type, describe_js_error(&e))))?;

        let event_type = event_type.to_string();
        self.on_cancel(move || {
            controller.abort();
            log::debug!("Detached {} listener", event_type);
            // Cancellation may run inside this very listener; free it afterwards
            wasm_bindgen_futures::spawn_local(async move { drop(closure) });
        });
        Ok(())
    }
}
