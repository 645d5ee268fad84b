//! The animation backend seam.
//!
//! statekit does not move pixels. When a widget has an element on screen the
//! orchestrator hands the visual work to an [`AnimationBackend`] and only keeps
//! the timing and completion bookkeeping for itself.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use futures_util::future::BoxFuture;

use crate::error::AnimationError;
use crate::state::{AnimationSpeed, StateValue, Variant};

/// An opaque reference to a widget's screen element.
///
/// The value means nothing to statekit; backends map it to whatever handle
/// their renderer uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u64);

impl ElementRef {
    /// Wrap a backend-defined element handle.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-defined handle.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementRef({})", self.0)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Something that can animate elements.
///
/// Implementations are shared between tasks, so every method takes `&self`.
/// A panic inside any method is caught by the orchestrator and handled like an
/// error.
pub trait AnimationBackend: Send + Sync {
    /// Animate `element` from one state to another.
    ///
    /// The returned future resolves when the visual transition is done. An
    /// `Err` is logged and the transition still counts as finished.
    fn execute_state_transition(
        &self,
        element: ElementRef,
        from: StateValue,
        to: StateValue,
        variant: Variant,
        speed: AnimationSpeed,
    ) -> BoxFuture<'static, Result<(), AnimationError>>;

    /// Play a hover hint. Fire and forget.
    fn apply_hover_animation(&self, _element: ElementRef, _variant: Variant, _is_entering: bool) {}

    /// Start an indefinite loading cue on `element`.
    fn create_loading_loop(&self, _element: ElementRef, _variant: Variant) -> LoadingLoop {
        LoadingLoop::noop()
    }

    /// Release everything the backend holds. Called once when a shared
    /// provider shuts down.
    fn cleanup(&self) {}
}

/// A running loading cue.
///
/// Stops the cue when [`cancel`](Self::cancel)led or dropped, whichever comes
/// first. The stop action runs at most once.
#[must_use = "the loading loop stops as soon as the handle is dropped"]
pub struct LoadingLoop {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl LoadingLoop {
    /// Create a loop handle that runs `stop` when cancelled.
    pub fn new<F>(stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// A handle with nothing to stop.
    pub fn noop() -> Self {
        Self { stop: None }
    }

    /// Whether cancelling this handle still has an effect.
    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }

    /// Stop the loop now.
    pub fn cancel(mut self) {
        self.run_stop();
    }

    fn run_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // A panicking stop action must not take the widget down with it.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(stop)) {
                tracing::error!(
                    target: "statekit::orchestrator",
                    panic = %panic_message(payload.as_ref()),
                    "loading loop cancel panicked"
                );
            }
        }
    }
}

impl Drop for LoadingLoop {
    fn drop(&mut self) {
        self.run_stop();
    }
}

impl fmt::Debug for LoadingLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingLoop")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

static_assertions::assert_impl_all!(LoadingLoop: Send);
static_assertions::assert_impl_all!(ElementRef: Send, Sync, Copy);
