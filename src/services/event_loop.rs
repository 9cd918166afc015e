//! Single-threaded task spawning and deferred callbacks
//!
//! The browser implementation maps onto `spawn_local` and `setTimeout`.
//! `ManualEventLoop` runs the same work on demand with a virtual clock.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures_lite::future::{self, BoxedLocal};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::error::{describe_js_error, ConfigError};

pub trait EventLoop {
    /// Run a future to completion on the current thread
    fn spawn(&self, task: BoxedLocal<()>);

    /// Run `callback` once after `delay`, unless the handle is cancelled
    /// or dropped first
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle;
}

/// Pending deferred callback. Dropping it cancels the callback.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

pub struct BrowserEventLoop {
    window: web_sys::Window,
}

impl BrowserEventLoop {
    pub fn new() -> Result<Self, ConfigError> {
        let window = web_sys::window().ok_or_else(|| ConfigError::NoBrowser("no window".to_string()))?;
        Ok(Self { window })
    }
}

impl EventLoop for BrowserEventLoop {
    fn spawn(&self, task: BoxedLocal<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let closure = Closure::once(callback);
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis)
        {
            Ok(id) => {
                let window = self.window.clone();
                // The closure must outlive the timer, so the handle owns it
                TimerHandle::new(move || {
                    window.clear_timeout_with_handle(id);
                    drop(closure);
                })
            }
            Err(err) => {
                log::error!("setTimeout failed: {}", describe_js_error(&err));
                TimerHandle::new(|| {})
            }
        }
    }
}

struct Timer {
    id: u64,
    due: Duration,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct ManualState {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
    tasks: RefCell<Vec<BoxedLocal<()>>>,
}

/// Deterministic event loop: nothing runs until the test advances it
#[derive(Clone, Default)]
pub struct ManualEventLoop {
    state: Rc<ManualState>,
}

impl ManualEventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far
    pub fn now(&self) -> Duration {
        self.state.now.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.timers.borrow().len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.tasks.borrow().len()
    }

    /// Poll every spawned task until none of them can make progress
    pub fn run_until_stalled(&self) {
        loop {
            let batch: Vec<_> = self.state.tasks.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return;
            }

            let mut progressed = false;
            let mut pending = Vec::new();
            for mut task in batch {
                match future::block_on(future::poll_once(&mut task)) {
                    Some(()) => progressed = true,
                    None => pending.push(task),
                }
            }

            let spawned_more = !self.state.tasks.borrow().is_empty();
            self.state.tasks.borrow_mut().extend(pending);
            if !progressed && !spawned_more {
                return;
            }
        }
    }

    /// Move the clock forward, firing due timers in order and running the
    /// tasks they spawn
    pub fn advance(&self, by: Duration) {
        let target = self.state.now.get() + by;
        loop {
            self.run_until_stalled();

            let next = {
                let mut timers = self.state.timers.borrow_mut();
                let earliest = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);
                earliest.map(|index| timers.remove(index))
            };

            match next {
                Some(timer) => {
                    self.state.now.set(timer.due);
                    (timer.callback)();
                }
                None => break,
            }
        }
        self.state.now.set(target);
        self.run_until_stalled();
    }
}

impl EventLoop for ManualEventLoop {
    fn spawn(&self, task: BoxedLocal<()>) {
        self.state.tasks.borrow_mut().push(task);
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        self.state.timers.borrow_mut().push(Timer {
            id,
            due: self.state.now.get() + delay,
            callback,
        });

        let state: Weak<ManualState> = Rc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = state.upgrade() {
                state.timers.borrow_mut().retain(|timer| timer.id != id);
            }
        })
    }
}
