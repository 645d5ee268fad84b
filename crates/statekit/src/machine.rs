//! The per-widget state machine.
//!
//! Each interactive widget owns one [`WidgetStateMachine`]. It holds the
//! widget's [`WidgetConfig`], validates every change to it, requests animated
//! transitions through its [`TransitionDriver`], and owns the timers and
//! loading loop that belong to the widget.
//!
//! # Auto-recovery
//!
//! Entering `error` arms a one-shot timer (5 s by default) that moves the
//! widget back to `idle`; entering `success` does the same after 3 s. Leaving
//! the state early stops the timer and entering it again arms a fresh one.
//!
//! # Teardown
//!
//! [`WidgetStateMachine::teardown`] (also run on drop) cancels the in-flight
//! transition, every timer the widget owns and its loading loop. After that
//! every method is a silent no-op.
//!
//! # Example
//!
//! ```
//! use statekit::{MachineOptions, StateValue, WidgetStateMachine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let machine = WidgetStateMachine::new(MachineOptions::new());
//! machine.set_state(StateValue::Loading);
//!
//! let view = machine.view();
//! assert!(view.is_loading);
//! assert_eq!(view.class_name, "sk-widget sk-variant-primary sk-size-md sk-state-loading sk-animated");
//!
//! // Unknown names are logged and ignored.
//! machine.set_state_named("exploded");
//! assert_eq!(machine.state(), StateValue::Loading);
//! # }
//! ```

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use statekit_core::{PerfSpan, Property, Signal, TimerId, WidgetId};

use crate::animation::{ElementRef, LoadingLoop};
use crate::config::{ConfigPatch, MachineOptions, RawConfigPatch, WidgetConfig};
use crate::context::ContextScope;
use crate::driver::{PrivateDriver, SharedDriver, TransitionDriver, resolve_driver};
use crate::error::Result;
use crate::orchestrator::TransitionRequest;
use crate::state::{Size, StateChange, StateValue, Variant};

/// The read model a widget renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub state: StateValue,
    pub variant: Variant,
    pub size: Size,
    pub animated: bool,
    pub is_loading: bool,
    /// `true` in the `disabled` state and while disabled is forced.
    pub is_disabled: bool,
    pub is_success: bool,
    pub has_error: bool,
    /// Space separated tags derived from the fields above.
    pub class_name: String,
}

impl WidgetView {
    fn new(config: &WidgetConfig, force_disabled: bool) -> Self {
        let is_disabled = config.state == StateValue::Disabled || force_disabled;

        let mut class_name = format!(
            "sk-widget sk-variant-{} sk-size-{} sk-state-{}",
            config.variant, config.size, config.state
        );
        if is_disabled && config.state != StateValue::Disabled {
            class_name.push_str(" sk-disabled");
        }
        if config.animated {
            class_name.push_str(" sk-animated");
        }

        Self {
            state: config.state,
            variant: config.variant,
            size: config.size,
            animated: config.animated,
            is_loading: config.state == StateValue::Loading,
            is_disabled,
            is_success: config.state == StateValue::Success,
            has_error: config.state == StateValue::Error,
            class_name,
        }
    }
}

/// Orders `transition_finished` after `state_changed` for the same change.
///
/// A completion arriving while the change is still being announced is held
/// and emitted once the announcement is done.
enum FinishGate {
    Holding(Option<StateChange>),
    Open,
}

impl FinishGate {
    fn held(self) -> Option<StateChange> {
        match self {
            Self::Holding(held) => held,
            Self::Open => None,
        }
    }
}

struct MachineShared {
    id: WidgetId,
    driver: Arc<dyn TransitionDriver>,
    config: Property<WidgetConfig>,
    force_disabled: AtomicBool,
    element: Mutex<Option<ElementRef>>,
    recovery_timer: Mutex<Option<TimerId>>,
    loading_loop: Mutex<Option<LoadingLoop>>,
    torn_down: AtomicBool,
    error_dismiss_after: Option<Duration>,
    success_dismiss_after: Option<Duration>,
    state_changed: Signal<StateChange>,
    config_changed: Signal<WidgetConfig>,
    transition_finished: Signal<StateChange>,
}

impl MachineShared {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn clamp(&self, config: &mut WidgetConfig) {
        if !self.driver.animations_enabled() {
            config.animated = false;
        }
    }

    fn set_state(self: &Arc<Self>, next: StateValue) {
        if self.is_torn_down() {
            return;
        }
        match self.config.update(|config| config.state = next) {
            Some((old, new)) => self.state_entered(old.state, new),
            None => {
                tracing::trace!(target: "statekit::machine", widget = %self.id, state = %next, "state unchanged");
            }
        }
    }

    fn update_config(self: &Arc<Self>, patch: &ConfigPatch) {
        if self.is_torn_down() {
            return;
        }
        let Some((old, new)) = self.config.update(|config| {
            config.apply(patch);
            self.clamp(config);
        }) else {
            return;
        };

        if old.state != new.state {
            self.state_entered(old.state, new);
            return;
        }
        if old.variant != new.variant && new.state == StateValue::Loading {
            self.restart_loading_loop(new.variant);
        }
        self.config_changed.emit(new);
    }

    /// Side effects of moving from `from` to `config.state`.
    fn state_entered(self: &Arc<Self>, from: StateValue, config: WidgetConfig) {
        let change = StateChange::new(from, config.state);
        tracing::debug!(target: "statekit::machine", widget = %self.id, transition = %change, "state changed");

        self.stop_recovery_timer();
        if from == StateValue::Loading {
            self.stop_loading_loop();
        }
        if config.state == StateValue::Loading {
            self.restart_loading_loop(config.variant);
        }
        self.arm_recovery_timer(config.state);

        let gate = if config.animated {
            Some(self.request_transition(change, &config))
        } else {
            // An older animated transition must not report after this change.
            self.driver.cancel_transition(self.id);
            None
        };

        self.state_changed.emit(change);
        self.config_changed.emit(config);

        // A transition that completed inside the request reports only now.
        let held = match gate {
            Some(gate) => {
                let mut gate = gate.lock();
                mem::replace(&mut *gate, FinishGate::Open).held()
            }
            None => None,
        };
        if let Some(finished) = held {
            if !self.is_torn_down() {
                self.transition_finished.emit(finished);
            }
        }
    }

    fn request_transition(self: &Arc<Self>, change: StateChange, config: &WidgetConfig) -> Arc<Mutex<FinishGate>> {
        let request = TransitionRequest::new(self.id, change.from, change.to)
            .with_element(*self.element.lock())
            .with_variant(config.variant)
            .with_speed(config.animation_speed);

        let gate = Arc::new(Mutex::new(FinishGate::Holding(None)));
        let callback_gate = gate.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        self.driver.execute_transition(
            request,
            Box::new(move |outcome| {
                if let FinishGate::Holding(slot) = &mut *callback_gate.lock() {
                    *slot = Some(outcome.change());
                    return;
                }
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if shared.is_torn_down() {
                    return;
                }
                shared.transition_finished.emit(outcome.change());
            }),
        );
        gate
    }

    fn arm_recovery_timer(self: &Arc<Self>, state: StateValue) {
        let after = match state {
            StateValue::Error => self.error_dismiss_after,
            StateValue::Success => self.success_dismiss_after,
            _ => None,
        };
        let Some(after) = after else {
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let armed = self.driver.timers().start_one_shot(self.id, after, move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if shared.is_torn_down() || shared.config.with(|config| config.state) != state {
                return;
            }
            tracing::debug!(target: "statekit::machine", widget = %shared.id, %state, "auto-dismissing");
            shared.set_state(StateValue::Idle);
        });

        match armed {
            Ok(id) => *self.recovery_timer.lock() = Some(id),
            Err(err) => {
                tracing::warn!(
                    target: "statekit::machine",
                    widget = %self.id,
                    %state,
                    error = %err,
                    "auto-dismiss timer not armed"
                );
            }
        }
    }

    fn stop_recovery_timer(&self) {
        let timer = self.recovery_timer.lock().take();
        if let Some(id) = timer {
            // Already gone when it fired; nothing to stop then.
            let _ = self.driver.timers().stop(id);
        }
    }

    fn restart_loading_loop(&self, variant: Variant) {
        self.stop_loading_loop();
        let Some(element) = *self.element.lock() else {
            return;
        };
        let handle = self.driver.create_loading_loop(element, variant);
        let previous = self.loading_loop.lock().replace(handle);
        drop(previous);
    }

    fn stop_loading_loop(&self) {
        let handle = self.loading_loop.lock().take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _span = PerfSpan::new("widget_teardown");
        let cancelled = self.driver.cancel_transition(self.id);
        self.recovery_timer.lock().take();
        let timers = self.driver.timers().remove_timers_for(self.id);
        self.stop_loading_loop();

        self.state_changed.disconnect_all();
        self.config_changed.disconnect_all();
        self.transition_finished.disconnect_all();

        tracing::debug!(
            target: "statekit::machine",
            widget = %self.id,
            cancelled_transition = cancelled,
            timers,
            "widget torn down"
        );
    }
}

/// The state store of one widget.
pub struct WidgetStateMachine {
    shared: Arc<MachineShared>,
}

impl WidgetStateMachine {
    /// A standalone machine with its own private driver.
    pub fn new(options: MachineOptions) -> Self {
        Self::with_driver(Arc::new(PrivateDriver::new(options.backend().cloned())), options)
    }

    /// A machine that shares the nearest provider in `scope`, or works
    /// standalone when there is none.
    pub fn in_scope(scope: &ContextScope, options: MachineOptions) -> Self {
        let driver = resolve_driver(scope, &options);
        Self::with_driver(driver, options)
    }

    /// A machine that must run under a provider.
    ///
    /// Fails with [`Error::MissingProvider`](crate::Error::MissingProvider)
    /// naming `consumer` when no provider is in scope.
    pub fn with_required_provider(
        scope: &ContextScope,
        consumer: &str,
        options: MachineOptions,
    ) -> Result<Self> {
        let provider = scope.require_provider(consumer)?;
        Ok(Self::with_driver(Arc::new(SharedDriver::new(&provider)), options))
    }

    /// A machine on an explicit driver.
    pub fn with_driver(driver: Arc<dyn TransitionDriver>, options: MachineOptions) -> Self {
        let mut config = WidgetConfig::default().merged(&driver.defaults().overlay(options.config()));
        if !driver.animations_enabled() {
            config.animated = false;
        }
        let initial = config.state;
        let id = WidgetId::next();

        let shared = Arc::new(MachineShared {
            id,
            driver,
            config: Property::new(config),
            force_disabled: AtomicBool::new(false),
            element: Mutex::new(None),
            recovery_timer: Mutex::new(None),
            loading_loop: Mutex::new(None),
            torn_down: AtomicBool::new(false),
            error_dismiss_after: options.error_dismiss_after(),
            success_dismiss_after: options.success_dismiss_after(),
            state_changed: Signal::new(),
            config_changed: Signal::new(),
            transition_finished: Signal::new(),
        });
        tracing::debug!(
            target: "statekit::machine",
            widget = %id,
            state = %initial,
            shared = shared.driver.is_shared(),
            "widget created"
        );

        // A widget may start out in a self-dismissing state.
        shared.arm_recovery_timer(initial);
        Self { shared }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Move to `next`. Same state is a no-op.
    pub fn set_state(&self, next: StateValue) {
        self.shared.set_state(next);
    }

    /// Move to the state named `name`; unknown names are logged and ignored.
    pub fn set_state_named(&self, name: &str) {
        match name.parse() {
            Ok(next) => self.set_state(next),
            Err(err) => self.reject("state", name, &err),
        }
    }

    pub fn set_variant(&self, variant: Variant) {
        self.shared.update_config(&ConfigPatch::new().with_variant(variant));
    }

    pub fn set_variant_named(&self, name: &str) {
        match name.parse() {
            Ok(variant) => self.set_variant(variant),
            Err(err) => self.reject("variant", name, &err),
        }
    }

    pub fn set_size(&self, size: Size) {
        self.shared.update_config(&ConfigPatch::new().with_size(size));
    }

    pub fn set_size_named(&self, name: &str) {
        match name.parse() {
            Ok(size) => self.set_size(size),
            Err(err) => self.reject("size", name, &err),
        }
    }

    /// Merge `patch` into the config. A state change behaves like
    /// [`set_state`](Self::set_state).
    pub fn update_config(&self, patch: ConfigPatch) {
        self.shared.update_config(&patch);
    }

    /// Merge an untyped patch, dropping fields that do not parse.
    pub fn update_config_raw(&self, patch: RawConfigPatch) {
        if self.is_torn_down() {
            return;
        }
        self.update_config(patch.into_patch());
    }

    /// Force the widget to read as disabled regardless of its state.
    pub fn set_force_disabled(&self, disabled: bool) {
        if self.is_torn_down() {
            return;
        }
        if self.shared.force_disabled.swap(disabled, Ordering::SeqCst) != disabled {
            tracing::debug!(target: "statekit::machine", widget = %self.shared.id, disabled, "forced disable changed");
        }
    }

    /// Attach or detach the widget's screen element.
    ///
    /// Transitions started afterwards animate this element. While loading,
    /// the loading loop moves to the new element.
    pub fn set_element(&self, element: Option<ElementRef>) {
        if self.is_torn_down() {
            return;
        }
        let previous = std::mem::replace(&mut *self.shared.element.lock(), element);
        if previous == element {
            return;
        }
        let config = self.shared.config.get();
        if config.state == StateValue::Loading {
            self.shared.restart_loading_loop(config.variant);
        }
    }

    /// Play a hover hint on the attached element, if any.
    pub fn hover(&self, is_entering: bool) {
        if self.is_torn_down() {
            return;
        }
        let Some(element) = self.element() else {
            return;
        };
        self.shared
            .driver
            .apply_hover_animation(element, self.variant(), is_entering);
    }

    /// Cancel everything the widget owns. Idempotent.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    fn reject(&self, field: &'static str, value: &str, err: &crate::Error) {
        if self.is_torn_down() {
            return;
        }
        tracing::warn!(
            target: "statekit::machine",
            widget = %self.shared.id,
            field,
            value,
            error = %err,
            "rejected invalid value"
        );
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.shared.id
    }

    pub fn config(&self) -> WidgetConfig {
        self.shared.config.get()
    }

    pub fn state(&self) -> StateValue {
        self.shared.config.with(|config| config.state)
    }

    pub fn variant(&self) -> Variant {
        self.shared.config.with(|config| config.variant)
    }

    pub fn size(&self) -> Size {
        self.shared.config.with(|config| config.size)
    }

    /// The derived read model.
    pub fn view(&self) -> WidgetView {
        let force_disabled = self.shared.force_disabled.load(Ordering::SeqCst);
        self.shared
            .config
            .with(|config| WidgetView::new(config, force_disabled))
    }

    pub fn element(&self) -> Option<ElementRef> {
        *self.shared.element.lock()
    }

    /// Whether this widget has a transition running.
    pub fn is_transitioning(&self) -> bool {
        self.shared.driver.is_transitioning(self.shared.id)
    }

    /// Whether an auto-dismiss timer is pending.
    pub fn has_recovery_timer(&self) -> bool {
        let timer = *self.shared.recovery_timer.lock();
        timer.is_some_and(|id| self.shared.driver.timers().is_active(id))
    }

    /// Whether a loading loop is running.
    pub fn has_loading_loop(&self) -> bool {
        self.shared
            .loading_loop
            .lock()
            .as_ref()
            .is_some_and(LoadingLoop::is_active)
    }

    /// Whether the widget resolved to a shared provider.
    pub fn is_shared(&self) -> bool {
        self.shared.driver.is_shared()
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.is_torn_down()
    }

    pub fn driver(&self) -> &Arc<dyn TransitionDriver> {
        &self.shared.driver
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Emitted after every state change, once its transition was requested.
    pub fn state_changed(&self) -> &Signal<StateChange> {
        &self.shared.state_changed
    }

    /// Emitted with the new config after every change.
    pub fn config_changed(&self) -> &Signal<WidgetConfig> {
        &self.shared.config_changed
    }

    /// Emitted when an animated transition of this widget finishes.
    pub fn transition_finished(&self) -> &Signal<StateChange> {
        &self.shared.transition_finished
    }
}

impl Drop for WidgetStateMachine {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl fmt::Debug for WidgetStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetStateMachine")
            .field("id", &self.shared.id)
            .field("config", &self.shared.config)
            .field("shared", &self.is_shared())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

static_assertions::assert_impl_all!(WidgetStateMachine: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::state::AnimationSpeed;

    fn machine() -> WidgetStateMachine {
        WidgetStateMachine::new(MachineOptions::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_names_leave_config_unchanged() {
        let machine = machine();
        let before = machine.config();

        machine.set_state_named("exploded");
        machine.set_variant_named("neon");
        machine.set_size_named("huge");
        assert_eq!(machine.config(), before);

        machine.set_size_named("xs");
        assert_eq!(machine.size(), Size::Xs);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_state_is_silent() {
        let machine = machine();
        let changes = Arc::new(AtomicUsize::new(0));
        let clone = changes.clone();
        machine.state_changed().connect(move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
        });

        machine.set_state(StateValue::Idle);
        assert_eq!(changes.load(Ordering::SeqCst), 0);
        assert!(!machine.is_transitioning());

        machine.set_state(StateValue::Pending);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert!(machine.is_transitioning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_animated_skips_transition() {
        let machine = WidgetStateMachine::new(
            MachineOptions::new().with_config(ConfigPatch::new().with_animated(false)),
        );
        machine.set_state(StateValue::Loading);
        assert!(machine.view().is_loading);
        assert!(!machine.is_transitioning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_flags() {
        let machine = machine();
        machine.set_state(StateValue::Error);
        let view = machine.view();
        assert!(view.has_error);
        assert!(!view.is_disabled);

        machine.set_force_disabled(true);
        let view = machine.view();
        assert!(view.is_disabled);
        assert!(view.class_name.contains("sk-disabled"));

        machine.set_force_disabled(false);
        machine.set_state(StateValue::Disabled);
        let view = machine.view();
        assert!(view.is_disabled);
        assert_eq!(
            view.class_name,
            "sk-widget sk-variant-primary sk-size-md sk-state-disabled sk-animated"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_config_drops_only_invalid_fields() {
        let machine = machine();
        machine.update_config_raw(RawConfigPatch {
            variant: Some("danger".into()),
            size: Some("gigantic".into()),
            animation_speed: Some("slow".into()),
            error_message: Some("Upload failed".into()),
            ..RawConfigPatch::default()
        });

        let config = machine.config();
        assert_eq!(config.variant, Variant::Danger);
        assert_eq!(config.size, Size::Md);
        assert_eq!(config.animation_speed, AnimationSpeed::Slow);
        assert_eq!(config.error_message.as_deref(), Some("Upload failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_timer_lifecycle() {
        let machine = machine();
        machine.set_state(StateValue::Success);
        assert!(machine.has_recovery_timer());

        machine.set_state(StateValue::Loading);
        assert!(!machine.has_recovery_timer());

        machine.set_state(StateValue::Error);
        assert!(machine.has_recovery_timer());
        assert_eq!(machine.driver().timers().count_for(machine.id()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_in_transient_state() {
        let machine = WidgetStateMachine::new(
            MachineOptions::new()
                .with_config(ConfigPatch::new().with_state(StateValue::Success))
                .with_success_dismiss_after(Some(Duration::from_millis(100))),
        );
        assert!(machine.has_recovery_timer());
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(machine.state(), StateValue::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_is_idempotent_and_final() {
        let machine = machine();
        let kept = machine.state_changed().connect(|_| {});
        let dropped = machine.state_changed().connect(|_| {});
        assert!(machine.state_changed().disconnect(dropped));
        machine.set_state(StateValue::Error);
        machine.teardown();
        assert!(!machine.state_changed().disconnect(kept));
        assert_eq!(machine.state_changed().connection_count(), 0);
        machine.teardown();

        assert!(machine.is_torn_down());
        assert!(!machine.is_transitioning());
        assert_eq!(machine.driver().timers().count_for(machine.id()), 0);

        machine.set_state(StateValue::Loading);
        machine.set_variant(Variant::Ghost);
        machine.update_config(ConfigPatch::new().with_size(Size::Xl));
        machine.set_element(Some(ElementRef::new(1)));
        assert_eq!(machine.state(), StateValue::Error);
        assert_eq!(machine.variant(), Variant::Primary);
        assert_eq!(machine.element(), None);
    }

    #[test]
    fn test_works_without_runtime() {
        let machine = machine();
        machine.set_state(StateValue::Loading);
        machine.set_state(StateValue::Error);
        assert_eq!(machine.state(), StateValue::Error);
        assert!(!machine.has_recovery_timer());
    }

    #[test]
    fn test_immediate_completion_reports_after_change() {
        // Without a runtime the transition completes inside `set_state`.
        let machine = machine();
        let events = Arc::new(Mutex::new(Vec::new()));
        let changed = events.clone();
        machine
            .state_changed()
            .connect(move |change| changed.lock().push(("changed", *change)));
        let finished = events.clone();
        machine
            .transition_finished()
            .connect(move |change| finished.lock().push(("finished", *change)));

        machine.set_state(StateValue::Loading);

        let change = StateChange::new(StateValue::Idle, StateValue::Loading);
        assert_eq!(*events.lock(), vec![("changed", change), ("finished", change)]);
        assert!(!machine.is_transitioning());
    }
}
