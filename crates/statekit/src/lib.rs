//! statekit - interaction states and animated transitions for UI widgets.
//!
//! Every interactive widget (button, input, placeholder card, ...) owns a
//! [`WidgetStateMachine`] that moves it between a fixed set of states
//! (`idle`, `loading`, `error`, `success`, `disabled`, `pending`). State
//! changes are applied immediately and animated through a
//! [`TransitionOrchestrator`], which delegates visuals to an
//! [`AnimationBackend`](animation::AnimationBackend) when the widget has an
//! element on screen and falls back to a timer otherwise. A
//! [`PerformanceMonitor`] keeps transition timing metrics.
//!
//! Widgets can share one orchestrator and monitor through a
//! [`StateProvider`] placed in a [`ContextScope`], or run standalone.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use statekit::{
//!     ContextScope, MachineOptions, ProviderOptions, StateProvider, StateValue, WidgetStateMachine,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = ContextScope::root();
//!     let provider = root.provide(StateProvider::new(
//!         ProviderOptions::from_toml_str("performance_monitoring = true")?,
//!     ));
//!
//!     let save = WidgetStateMachine::with_required_provider(&root, "SaveButton", MachineOptions::new())?;
//!     save.set_state(StateValue::Loading);
//!     tokio::time::sleep(Duration::from_millis(300)).await;
//!     save.set_state(StateValue::Success);
//!
//!     println!("{}", provider.metrics().summary());
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! All diagnostics go through `tracing` under the targets listed in
//! [`logging::targets`].

pub mod animation;
mod config;
mod context;
mod driver;
mod error;
mod machine;
mod monitor;
mod orchestrator;
mod state;

pub use config::{
    ConfigPatch, DEFAULT_ERROR_DISMISS_AFTER, DEFAULT_SUCCESS_DISMISS_AFTER, MachineOptions,
    ProviderOptions, RawConfigPatch, WidgetConfig,
};
pub use context::{ContextScope, StateProvider};
pub use driver::{CompletionCallback, PrivateDriver, SharedDriver, TransitionDriver, resolve_driver};
pub use error::{AnimationError, Error, Result};
pub use machine::{WidgetStateMachine, WidgetView};
pub use monitor::{
    MetricsSummary, PerformanceMetrics, PerformanceMonitor, SLOW_TRANSITION_THRESHOLD,
    SLOW_TRANSITION_TOLERANCE,
};
pub use orchestrator::{
    ActiveTransition, CompletionKind, TransitionOrchestrator, TransitionOutcome, TransitionRequest,
};
pub use state::{
    AnimationSpeed, Size, StateChange, StateValue, Variant, is_valid_size, is_valid_state,
    is_valid_variant,
};

pub use statekit_core::logging;
pub use statekit_core::{
    ConnectionId, CoreError, Property, Signal, TimerError, TimerId, TimerRegistry, WidgetId,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::animation::{AnimationBackend, ElementRef, LoadingLoop};
    pub use crate::{
        AnimationSpeed, ConfigPatch, ContextScope, MachineOptions, ProviderOptions, Size,
        StateProvider, StateValue, Variant, WidgetStateMachine,
    };
}
