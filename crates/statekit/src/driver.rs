//! How a widget reaches an orchestrator.
//!
//! A [`WidgetStateMachine`](crate::WidgetStateMachine) never asks whether it
//! runs under a shared provider. It holds a [`TransitionDriver`] that was
//! picked once, at construction, by [`resolve_driver`]: a [`SharedDriver`]
//! when a [`StateProvider`](crate::StateProvider) is in scope, a
//! [`PrivateDriver`] otherwise. Both behave the same for state purposes; only
//! the shared one feeds provider-wide metrics.

use std::fmt;
use std::sync::Arc;

use statekit_core::{TimerRegistry, WidgetId};

use crate::animation::{AnimationBackend, ElementRef, LoadingLoop};
use crate::config::{ConfigPatch, MachineOptions};
use crate::context::{ContextScope, StateProvider};
use crate::monitor::PerformanceMonitor;
use crate::orchestrator::{TransitionOrchestrator, TransitionOutcome, TransitionRequest};
use crate::state::Variant;

/// Called once when a transition finishes.
pub type CompletionCallback = Box<dyn FnOnce(TransitionOutcome) + Send>;

/// The capability a widget uses to run transitions and timers.
pub trait TransitionDriver: Send + Sync {
    /// The orchestrator transitions run on.
    fn orchestrator(&self) -> &TransitionOrchestrator;

    /// The registry auto-dismiss timers are armed in.
    fn timers(&self) -> &TimerRegistry;

    /// The patch new widgets start from, before their own patch.
    fn defaults(&self) -> &ConfigPatch;

    /// `false` forces every widget using this driver to be unanimated.
    fn animations_enabled(&self) -> bool;

    /// Whether this driver is backed by a shared provider.
    fn is_shared(&self) -> bool;

    fn execute_transition(&self, request: TransitionRequest, on_complete: CompletionCallback) {
        self.orchestrator().execute_transition(request, on_complete);
    }

    fn cancel_transition(&self, widget: WidgetId) -> bool {
        self.orchestrator().cancel(widget)
    }

    fn is_transitioning(&self, widget: WidgetId) -> bool {
        self.orchestrator().is_widget_transitioning(widget)
    }

    fn apply_hover_animation(&self, element: ElementRef, variant: Variant, is_entering: bool) {
        self.orchestrator().apply_hover_animation(element, variant, is_entering);
    }

    fn create_loading_loop(&self, element: ElementRef, variant: Variant) -> LoadingLoop {
        self.orchestrator().create_loading_loop(element, variant)
    }
}

/// A driver owned by a single widget.
///
/// It has its own orchestrator with monitoring off and its own timers.
pub struct PrivateDriver {
    orchestrator: TransitionOrchestrator,
    timers: TimerRegistry,
    defaults: ConfigPatch,
}

impl PrivateDriver {
    /// A private driver, optionally with a backend for the widget's element.
    pub fn new(backend: Option<Arc<dyn AnimationBackend>>) -> Self {
        Self {
            orchestrator: TransitionOrchestrator::new(backend, Arc::new(PerformanceMonitor::disabled())),
            timers: TimerRegistry::new(),
            defaults: ConfigPatch::default(),
        }
    }
}

impl Default for PrivateDriver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Drop for PrivateDriver {
    fn drop(&mut self) {
        // The backend may be shared with other widgets; only a provider cleans it up.
        self.timers.shutdown();
        self.orchestrator.halt();
    }
}

impl TransitionDriver for PrivateDriver {
    fn orchestrator(&self) -> &TransitionOrchestrator {
        &self.orchestrator
    }

    fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    fn defaults(&self) -> &ConfigPatch {
        &self.defaults
    }

    fn animations_enabled(&self) -> bool {
        true
    }

    fn is_shared(&self) -> bool {
        false
    }
}

impl fmt::Debug for PrivateDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateDriver")
            .field("orchestrator", &self.orchestrator)
            .field("timers", &self.timers)
            .finish()
    }
}

/// A driver backed by a [`StateProvider`].
///
/// Holds handles to the provider's orchestrator and timers, not the provider
/// itself, so widgets never keep a provider alive.
#[derive(Clone)]
pub struct SharedDriver {
    orchestrator: TransitionOrchestrator,
    timers: TimerRegistry,
    defaults: ConfigPatch,
    animations_enabled: bool,
}

impl SharedDriver {
    pub fn new(provider: &StateProvider) -> Self {
        Self::from_parts(
            provider.orchestrator().clone(),
            provider.timers().clone(),
            provider.options().defaults().clone(),
            provider.options().global_animations(),
        )
    }

    pub(crate) fn from_parts(
        orchestrator: TransitionOrchestrator,
        timers: TimerRegistry,
        defaults: ConfigPatch,
        animations_enabled: bool,
    ) -> Self {
        Self {
            orchestrator,
            timers,
            defaults,
            animations_enabled,
        }
    }
}

impl TransitionDriver for SharedDriver {
    fn orchestrator(&self) -> &TransitionOrchestrator {
        &self.orchestrator
    }

    fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    fn defaults(&self) -> &ConfigPatch {
        &self.defaults
    }

    fn animations_enabled(&self) -> bool {
        self.animations_enabled
    }

    fn is_shared(&self) -> bool {
        true
    }
}

impl fmt::Debug for SharedDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDriver")
            .field("orchestrator", &self.orchestrator)
            .field("animations_enabled", &self.animations_enabled)
            .finish()
    }
}

/// Pick the driver for a widget constructed in `scope`.
///
/// This is the only place the shared-or-private decision is made.
pub fn resolve_driver(scope: &ContextScope, options: &MachineOptions) -> Arc<dyn TransitionDriver> {
    match scope.try_provider() {
        Some(provider) => {
            tracing::trace!(target: "statekit::context", depth = scope.depth(), "resolved shared driver");
            Arc::new(SharedDriver::new(&provider))
        }
        None => {
            tracing::trace!(target: "statekit::context", "no provider in scope, using private driver");
            Arc::new(PrivateDriver::new(options.backend().cloned()))
        }
    }
}

static_assertions::assert_impl_all!(PrivateDriver: Send, Sync);
static_assertions::assert_impl_all!(SharedDriver: Send, Sync);
