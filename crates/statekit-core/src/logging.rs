//! Logging and tracing facilities for statekit.
//!
//! statekit uses the `tracing` crate for all diagnostics and never prints on
//! its own. Install a subscriber in the application to see the output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("statekit=debug,statekit::monitor=info")
//!     .init();
//! ```
//!
//! Events follow a fixed level policy: rejected input is a `warn`, animation
//! backend failures are an `error`, widget lifecycle is `debug`, and timer and
//! signal internals are `trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core systems target.
    pub const CORE: &str = "statekit_core";
    /// Timer registry target.
    pub const TIMER: &str = "statekit_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "statekit_core::signal";
    /// Per-widget state machine target.
    pub const MACHINE: &str = "statekit::machine";
    /// Transition orchestrator target.
    pub const ORCHESTRATOR: &str = "statekit::orchestrator";
    /// Performance monitor target.
    pub const MONITOR: &str = "statekit::monitor";
    /// Shared context target.
    pub const CONTEXT: &str = "statekit::context";
    /// Performance spans target.
    pub const PERF: &str = "statekit::perf";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// Useful for measuring how long a synchronous section takes with a
/// span-timing subscriber.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span named after `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::debug_span!(target: "statekit::perf", "perf", operation);
        Self {
            _span: span.entered(),
        }
    }
}
