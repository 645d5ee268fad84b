//! Transition orchestration.
//!
//! The [`TransitionOrchestrator`] turns a `(from, to)` pair into a timed
//! transition and reports when it is done. It runs at most one transition per
//! widget: a newer request for the same widget aborts the older task and its
//! completion callback never runs (last request wins).
//!
//! A transition resolves in one of four ways:
//!
//! - immediately, when the request is not animated or the states are equal
//! - through the [`AnimationBackend`], when both a backend and an element exist
//! - after a plain sleep of the timing's duration, otherwise
//! - immediately with an error log, when the backend fails or panics
//!
//! In every case except supersession and cancellation the completion callback
//! runs exactly once.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use statekit_core::{Signal, WidgetId};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::animation::{
    AnimationBackend, Easing, ElementRef, LoadingLoop, TransitionTiming, panic_message,
};
use crate::error::AnimationError;
use crate::monitor::{PerformanceMetrics, PerformanceMonitor};
use crate::state::{AnimationSpeed, StateChange, StateValue, Variant};

/// A request to move one widget between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub widget: WidgetId,
    pub from: StateValue,
    pub to: StateValue,
    pub element: Option<ElementRef>,
    pub variant: Variant,
    pub speed: AnimationSpeed,
    pub animated: bool,
}

impl TransitionRequest {
    /// An animated request at normal speed with no element.
    pub fn new(widget: WidgetId, from: StateValue, to: StateValue) -> Self {
        Self {
            widget,
            from,
            to,
            element: None,
            variant: Variant::default(),
            speed: AnimationSpeed::default(),
            animated: true,
        }
    }

    pub fn with_element(mut self, element: Option<ElementRef>) -> Self {
        self.element = element;
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_speed(mut self, speed: AnimationSpeed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn change(&self) -> StateChange {
        StateChange::new(self.from, self.to)
    }
}

/// A transition that is currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTransition {
    pub widget: WidgetId,
    pub from: StateValue,
    pub to: StateValue,
    pub duration: Duration,
    pub easing: Easing,
    pub element: Option<ElementRef>,
    pub started_at: Instant,
}

impl ActiveTransition {
    pub fn change(&self) -> StateChange {
        StateChange::new(self.from, self.to)
    }

    /// Eased progress at `now`.
    pub fn progress_at(&self, now: Instant) -> f32 {
        let timing = TransitionTiming {
            duration: self.duration,
            easing: self.easing,
        };
        timing.progress(now.saturating_duration_since(self.started_at))
    }
}

/// How a transition came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// Not animated, equal states, or no runtime to wait on.
    Immediate,
    /// The backend finished the animation.
    Animated,
    /// No element or backend; a plain timer ran out.
    Timer,
    /// The backend failed or panicked. The transition still counts as done.
    BackendFailed,
}

/// The result of a finished transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub widget: WidgetId,
    pub from: StateValue,
    pub to: StateValue,
    pub elapsed: Duration,
    pub kind: CompletionKind,
}

impl TransitionOutcome {
    pub fn change(&self) -> StateChange {
        StateChange::new(self.from, self.to)
    }
}

struct InFlight {
    generation: u64,
    task: AbortHandle,
    active: ActiveTransition,
}

struct OrchestratorInner {
    backend: Option<Arc<dyn AnimationBackend>>,
    monitor: Arc<PerformanceMonitor>,
    in_flight: Mutex<HashMap<WidgetId, InFlight>>,
    // The most recently started transition that is still running.
    current: Mutex<Option<(u64, ActiveTransition)>>,
    generation: AtomicU64,
    shut_down: AtomicBool,
    transition_started: Signal<ActiveTransition>,
    transition_finished: Signal<TransitionOutcome>,
}

impl OrchestratorInner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop the in-flight entry for `widget`, aborting its task.
    fn supersede(&self, widget: WidgetId) -> Option<ActiveTransition> {
        let prior = self.in_flight.lock().remove(&widget)?;
        prior.task.abort();
        self.clear_current(prior.generation);
        Some(prior.active)
    }

    fn clear_current(&self, generation: u64) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|(g, _)| *g == generation) {
            *current = None;
        }
    }

    /// Finish transition `generation` of `widget` unless something newer
    /// replaced it while it was running.
    fn finish<F>(&self, generation: u64, widget: WidgetId, kind: CompletionKind, on_complete: F)
    where
        F: FnOnce(TransitionOutcome),
    {
        let active = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&widget) {
                Some(entry) if entry.generation == generation => {
                    in_flight.remove(&widget).map(|entry| entry.active)
                }
                _ => None,
            }
        };
        let Some(active) = active else {
            tracing::trace!(target: "statekit::orchestrator", %widget, generation, "stale completion dropped");
            return;
        };
        self.clear_current(generation);

        let elapsed = active.started_at.elapsed();
        self.monitor.record(active.from, active.to, elapsed);

        let outcome = TransitionOutcome {
            widget,
            from: active.from,
            to: active.to,
            elapsed,
            kind,
        };
        tracing::debug!(
            target: "statekit::orchestrator",
            %widget,
            transition = %outcome.change(),
            ?kind,
            ?elapsed,
            "transition finished"
        );
        on_complete(outcome);
        self.transition_finished.emit(outcome);
    }
}

impl Drop for OrchestratorInner {
    fn drop(&mut self) {
        for (_, entry) in self.in_flight.get_mut().drain() {
            entry.task.abort();
        }
    }
}

/// Runs timed state transitions for many widgets.
///
/// Cloning is cheap; clones share the same in-flight table, backend and
/// monitor. Dropping the last clone aborts whatever is still running.
#[derive(Clone)]
pub struct TransitionOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl TransitionOrchestrator {
    /// Create an orchestrator.
    ///
    /// Without a backend every animated transition falls back to a timer.
    pub fn new(backend: Option<Arc<dyn AnimationBackend>>, monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                backend,
                monitor,
                in_flight: Mutex::new(HashMap::new()),
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
                transition_started: Signal::new(),
                transition_finished: Signal::new(),
            }),
        }
    }

    /// An orchestrator with no backend and monitoring off.
    pub fn headless() -> Self {
        Self::new(None, Arc::new(PerformanceMonitor::disabled()))
    }

    /// Start a transition and call `on_complete` when it finishes.
    ///
    /// Any transition still running for the same widget is superseded first:
    /// its task is aborted and its callback dropped without running.
    pub fn execute_transition<F>(&self, request: TransitionRequest, on_complete: F)
    where
        F: FnOnce(TransitionOutcome) + Send + 'static,
    {
        let widget = request.widget;
        if let Some(prior) = self.inner.supersede(widget) {
            tracing::debug!(
                target: "statekit::orchestrator",
                %widget,
                superseded = %prior.change(),
                by = %request.change(),
                "transition superseded"
            );
        }

        let immediate = TransitionOutcome {
            widget,
            from: request.from,
            to: request.to,
            elapsed: Duration::ZERO,
            kind: CompletionKind::Immediate,
        };

        if !request.animated || request.from == request.to || self.is_shut_down() {
            on_complete(immediate);
            self.inner.transition_finished.emit(immediate);
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(
                target: "statekit::orchestrator",
                %widget,
                transition = %request.change(),
                "no async runtime, completing transition immediately"
            );
            on_complete(immediate);
            self.inner.transition_finished.emit(immediate);
            return;
        };

        let timing = TransitionTiming::for_speed(request.speed);
        let active = ActiveTransition {
            widget,
            from: request.from,
            to: request.to,
            duration: timing.duration,
            easing: timing.easing,
            element: request.element,
            started_at: Instant::now(),
        };
        let generation = self.inner.next_generation();
        let backend = self.inner.backend.clone();
        let weak: Weak<OrchestratorInner> = Arc::downgrade(&self.inner);

        {
            // The entry must exist before the task can look itself up.
            let mut in_flight = self.inner.in_flight.lock();
            let task = handle.spawn(async move {
                let kind = match (backend, request.element) {
                    (Some(backend), Some(element)) => {
                        run_backend(backend.as_ref(), element, &request).await
                    }
                    _ => {
                        tokio::time::sleep(timing.duration).await;
                        CompletionKind::Timer
                    }
                };
                if let Some(inner) = weak.upgrade() {
                    inner.finish(generation, widget, kind, on_complete);
                }
            });
            in_flight.insert(
                widget,
                InFlight {
                    generation,
                    task: task.abort_handle(),
                    active: active.clone(),
                },
            );
            *self.inner.current.lock() = Some((generation, active.clone()));
        }

        tracing::debug!(
            target: "statekit::orchestrator",
            %widget,
            transition = %active.change(),
            duration = ?timing.duration,
            easing = timing.easing.as_str(),
            "transition started"
        );
        self.inner.transition_started.emit(active);
    }

    /// Cancel the running transition of `widget`, if any.
    ///
    /// Its completion callback will not run. Returns whether something was
    /// cancelled.
    pub fn cancel(&self, widget: WidgetId) -> bool {
        match self.inner.supersede(widget) {
            Some(active) => {
                tracing::debug!(target: "statekit::orchestrator", %widget, transition = %active.change(), "transition cancelled");
                true
            }
            None => false,
        }
    }

    /// Play a hover hint on `element`. Does nothing without a backend.
    pub fn apply_hover_animation(&self, element: ElementRef, variant: Variant, is_entering: bool) {
        let Some(backend) = &self.inner.backend else {
            return;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            backend.apply_hover_animation(element, variant, is_entering)
        }));
        if let Err(payload) = result {
            tracing::error!(
                target: "statekit::orchestrator",
                %element,
                panic = %panic_message(payload.as_ref()),
                "hover animation panicked"
            );
        }
    }

    /// Start a loading cue on `element`.
    ///
    /// Returns an inactive handle when there is no backend or the backend
    /// panicked.
    pub fn create_loading_loop(&self, element: ElementRef, variant: Variant) -> LoadingLoop {
        let Some(backend) = &self.inner.backend else {
            return LoadingLoop::noop();
        };
        match panic::catch_unwind(AssertUnwindSafe(|| backend.create_loading_loop(element, variant))) {
            Ok(handle) => {
                tracing::debug!(target: "statekit::orchestrator", %element, %variant, "loading loop started");
                handle
            }
            Err(payload) => {
                tracing::error!(
                    target: "statekit::orchestrator",
                    %element,
                    panic = %panic_message(payload.as_ref()),
                    "loading loop creation panicked"
                );
                LoadingLoop::noop()
            }
        }
    }

    /// The most recently started transition, while it is still running.
    pub fn current_transition(&self) -> Option<ActiveTransition> {
        self.inner.current.lock().as_ref().map(|(_, active)| active.clone())
    }

    /// Whether any widget has a transition running.
    pub fn is_transitioning(&self) -> bool {
        !self.inner.in_flight.lock().is_empty()
    }

    /// Whether `widget` has a transition running.
    pub fn is_widget_transitioning(&self, widget: WidgetId) -> bool {
        self.inner.in_flight.lock().contains_key(&widget)
    }

    /// Number of widgets with a transition running.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.inner.monitor
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.inner.monitor.metrics()
    }

    pub fn has_backend(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Emitted when an animated transition starts.
    pub fn transition_started(&self) -> &Signal<ActiveTransition> {
        &self.inner.transition_started
    }

    /// Emitted after every completion callback, including immediate ones.
    pub fn transition_finished(&self) -> &Signal<TransitionOutcome> {
        &self.inner.transition_finished
    }

    /// Cancel everything and release the backend.
    ///
    /// The backend's `cleanup` runs once no matter how often this is called.
    /// Later requests complete immediately.
    pub fn shutdown(&self) {
        if let Some(cancelled) = self.stop_all() {
            if let Some(backend) = &self.inner.backend {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| backend.cleanup())) {
                    tracing::error!(
                        target: "statekit::orchestrator",
                        panic = %panic_message(payload.as_ref()),
                        "backend cleanup panicked"
                    );
                }
            }
            tracing::debug!(target: "statekit::orchestrator", cancelled, "orchestrator shut down");
        }
    }

    /// Cancel everything and refuse new animated work, leaving the backend alone.
    ///
    /// For orchestrators that borrow a backend other orchestrators may still
    /// be using. A later [`shutdown`](Self::shutdown) is a no-op.
    pub fn halt(&self) {
        if let Some(cancelled) = self.stop_all() {
            tracing::debug!(target: "statekit::orchestrator", cancelled, "orchestrator halted");
        }
    }

    /// Abort every in-flight transition. `None` if already stopped.
    fn stop_all(&self) -> Option<usize> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return None;
        }
        let cancelled = {
            let mut in_flight = self.inner.in_flight.lock();
            let count = in_flight.len();
            for (_, entry) in in_flight.drain() {
                entry.task.abort();
            }
            count
        };
        *self.inner.current.lock() = None;
        Some(cancelled)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

async fn run_backend(
    backend: &dyn AnimationBackend,
    element: ElementRef,
    request: &TransitionRequest,
) -> CompletionKind {
    let started = panic::catch_unwind(AssertUnwindSafe(|| {
        backend.execute_state_transition(element, request.from, request.to, request.variant, request.speed)
    }));
    let result = match started {
        Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(AnimationError::Panicked(panic_message(payload.as_ref()))),
        },
        Err(payload) => Err(AnimationError::Panicked(panic_message(payload.as_ref()))),
    };

    match result {
        Ok(()) => CompletionKind::Animated,
        Err(err) => {
            tracing::error!(
                target: "statekit::orchestrator",
                widget = %request.widget,
                %element,
                transition = %request.change(),
                error = %err,
                "animation backend failed, completing transition"
            );
            CompletionKind::BackendFailed
        }
    }
}

impl fmt::Debug for TransitionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionOrchestrator")
            .field("in_flight", &self.in_flight_count())
            .field("has_backend", &self.has_backend())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

static_assertions::assert_impl_all!(TransitionOrchestrator: Send, Sync);
