//! Shared context for many widgets.
//!
//! A [`StateProvider`] owns one orchestrator, one performance monitor and one
//! timer registry. Placing it in a [`ContextScope`] lets every widget created
//! in that scope or any child scope share them instead of each owning its own.
//!
//! Sharing is optional. [`ContextScope::try_provider`] returns `None` when no
//! ancestor provides one, and widgets then fall back to a private driver.
//! Consumers that cannot work without a provider use
//! [`ContextScope::require_provider`], which fails with
//! [`Error::MissingProvider`].
//!
//! # Example
//!
//! ```
//! use statekit::{ContextScope, MachineOptions, ProviderOptions, StateProvider, WidgetStateMachine};
//!
//! let root = ContextScope::root();
//! root.provide(StateProvider::new(ProviderOptions::new().with_performance_monitoring(true)));
//!
//! let form = root.child();
//! let submit = WidgetStateMachine::in_scope(&form, MachineOptions::new());
//! assert!(submit.is_shared());
//!
//! let detached = WidgetStateMachine::in_scope(&ContextScope::root(), MachineOptions::new());
//! assert!(!detached.is_shared());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use statekit_core::{PerfSpan, Signal, TimerRegistry};

use crate::animation::{ElementRef, LoadingLoop};
use crate::config::{ConfigPatch, MachineOptions, ProviderOptions, WidgetConfig};
use crate::driver::SharedDriver;
use crate::error::{Error, Result};
use crate::machine::{WidgetStateMachine, WidgetView};
use crate::monitor::{PerformanceMetrics, PerformanceMonitor};
use crate::orchestrator::{ActiveTransition, TransitionOrchestrator, TransitionOutcome};
use crate::state::{Size, StateChange, StateValue, Variant};

/// One orchestrator and monitor shared by every widget under it.
///
/// The provider also carries a tree-scoped machine of its own, for consumers
/// that drive a single shared state through the provider directly.
pub struct StateProvider {
    options: ProviderOptions,
    orchestrator: TransitionOrchestrator,
    timers: TimerRegistry,
    machine: WidgetStateMachine,
    shut_down: AtomicBool,
}

impl StateProvider {
    pub fn new(options: ProviderOptions) -> Self {
        let monitor = PerformanceMonitor::new(options.performance_monitoring())
            .with_summary_interval(options.summary_interval());
        let orchestrator = TransitionOrchestrator::new(options.backend().cloned(), Arc::new(monitor));
        let timers = TimerRegistry::new();

        let driver = SharedDriver::from_parts(
            orchestrator.clone(),
            timers.clone(),
            options.defaults().clone(),
            options.global_animations(),
        );
        let machine = WidgetStateMachine::with_driver(Arc::new(driver), MachineOptions::new());

        tracing::debug!(
            target: "statekit::context",
            global_animations = options.global_animations(),
            performance_monitoring = options.performance_monitoring(),
            has_backend = options.backend().is_some(),
            "state provider created"
        );

        Self {
            options,
            orchestrator,
            timers,
            machine,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub fn orchestrator(&self) -> &TransitionOrchestrator {
        &self.orchestrator
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        self.orchestrator.monitor()
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// The provider's own tree-scoped machine.
    pub fn machine(&self) -> &WidgetStateMachine {
        &self.machine
    }

    // =========================================================================
    // Tree-scoped state
    // =========================================================================

    pub fn set_state(&self, next: StateValue) {
        self.machine.set_state(next);
    }

    pub fn set_variant(&self, variant: Variant) {
        self.machine.set_variant(variant);
    }

    pub fn set_size(&self, size: Size) {
        self.machine.set_size(size);
    }

    pub fn update_config(&self, patch: ConfigPatch) {
        self.machine.update_config(patch);
    }

    /// Animate `element` in subsequent tree-scoped transitions.
    pub fn set_active_element(&self, element: ElementRef) {
        self.machine.set_element(Some(element));
    }

    pub fn config(&self) -> WidgetConfig {
        self.machine.config()
    }

    pub fn view(&self) -> WidgetView {
        self.machine.view()
    }

    pub fn state_changed(&self) -> &Signal<StateChange> {
        self.machine.state_changed()
    }

    // =========================================================================
    // Shared orchestrator
    // =========================================================================

    pub fn apply_hover_animation(&self, element: ElementRef, variant: Variant, is_entering: bool) {
        self.orchestrator.apply_hover_animation(element, variant, is_entering);
    }

    pub fn create_loading_loop(&self, element: ElementRef, variant: Variant) -> LoadingLoop {
        self.orchestrator.create_loading_loop(element, variant)
    }

    /// The most recently started transition of any widget under this provider.
    pub fn current_transition(&self) -> Option<ActiveTransition> {
        self.orchestrator.current_transition()
    }

    /// Whether any widget under this provider is transitioning.
    pub fn is_transitioning(&self) -> bool {
        self.orchestrator.is_transitioning()
    }

    pub fn transition_started(&self) -> &Signal<ActiveTransition> {
        self.orchestrator.transition_started()
    }

    pub fn transition_finished(&self) -> &Signal<TransitionOutcome> {
        self.orchestrator.transition_finished()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.orchestrator.metrics()
    }

    /// Tear down the tree-scoped machine, stop all timers and in-flight
    /// transitions, and release the backend. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _span = PerfSpan::new("provider_shutdown");
        self.machine.teardown();
        self.timers.shutdown();
        self.orchestrator.shutdown();

        let metrics = self.metrics();
        tracing::debug!(
            target: "statekit::context",
            transition_count = metrics.transition_count,
            slow_transitions = metrics.slow_transitions,
            "state provider shut down"
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for StateProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for StateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProvider")
            .field("options", &self.options)
            .field("orchestrator", &self.orchestrator)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

struct ScopeNode {
    parent: Option<Arc<ScopeNode>>,
    provider: RwLock<Option<Arc<StateProvider>>>,
}

/// A node in the widget tree that may provide a [`StateProvider`].
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct ContextScope {
    node: Arc<ScopeNode>,
}

impl ContextScope {
    /// A scope with no parent and no provider.
    pub fn root() -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: None,
                provider: RwLock::new(None),
            }),
        }
    }

    /// A new scope below this one.
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: Some(self.node.clone()),
                provider: RwLock::new(None),
            }),
        }
    }

    /// Provide `provider` to this scope and its descendants.
    ///
    /// Replaces any provider this scope already had.
    pub fn provide(&self, provider: impl Into<Arc<StateProvider>>) -> Arc<StateProvider> {
        let provider = provider.into();
        let previous = self.node.provider.write().replace(provider.clone());
        tracing::debug!(
            target: "statekit::context",
            depth = self.depth(),
            replaced = previous.is_some(),
            "provider installed"
        );
        provider
    }

    /// Remove this scope's own provider.
    pub fn clear_provider(&self) -> Option<Arc<StateProvider>> {
        self.node.provider.write().take()
    }

    /// The nearest provider on the way to the root.
    pub fn try_provider(&self) -> Option<Arc<StateProvider>> {
        let mut node = Some(&self.node);
        while let Some(current) = node {
            if let Some(provider) = current.provider.read().as_ref() {
                return Some(provider.clone());
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// The nearest provider, or an error naming `consumer`.
    pub fn require_provider(&self, consumer: &str) -> Result<Arc<StateProvider>> {
        self.try_provider().ok_or_else(|| {
            tracing::error!(target: "statekit::context", consumer, "required provider missing");
            Error::missing_provider(consumer)
        })
    }

    pub fn has_provider(&self) -> bool {
        self.try_provider().is_some()
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.node.parent.as_ref();
        while let Some(parent) = node {
            depth += 1;
            node = parent.parent.as_ref();
        }
        depth
    }
}

impl Default for ContextScope {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextScope")
            .field("depth", &self.depth())
            .field("provides", &self.node.provider.read().is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(StateProvider: Send, Sync);
static_assertions::assert_impl_all!(ContextScope: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_ancestors() {
        let root = ContextScope::root();
        let leaf = root.child().child().child();
        assert_eq!(leaf.depth(), 3);
        assert!(leaf.try_provider().is_none());

        let provider = root.provide(StateProvider::new(ProviderOptions::new()));
        let found = leaf.try_provider().unwrap();
        assert!(Arc::ptr_eq(&found, &provider));
    }

    #[test]
    fn test_nearest_provider_wins() {
        let root = ContextScope::root();
        let outer = root.provide(StateProvider::new(ProviderOptions::new()));
        let section = root.child();
        let inner = section.provide(StateProvider::new(ProviderOptions::new()));

        let leaf = section.child();
        assert!(Arc::ptr_eq(&leaf.try_provider().unwrap(), &inner));
        assert!(Arc::ptr_eq(&root.child().try_provider().unwrap(), &outer));

        section.clear_provider();
        assert!(Arc::ptr_eq(&leaf.try_provider().unwrap(), &outer));
    }

    #[test]
    fn test_require_provider() {
        let scope = ContextScope::root();
        let err = scope.require_provider("SaveButton").unwrap_err();
        assert_eq!(
            err,
            Error::MissingProvider {
                provider: "StateProvider",
                consumer: "SaveButton".into(),
            }
        );

        scope.provide(StateProvider::new(ProviderOptions::new()));
        assert!(scope.child().require_provider("SaveButton").is_ok());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let provider = StateProvider::new(ProviderOptions::new());
        provider.shutdown();
        provider.shutdown();
        assert!(provider.is_shut_down());
        assert!(provider.timers().is_closed());
        assert!(provider.orchestrator().is_shut_down());
        assert!(provider.machine().is_torn_down());
    }
}
