//! Core systems for statekit.
//!
//! This crate provides the building blocks the widget state layer is made of:
//!
//! - **Signals**: Type-safe, re-entrant observer connections
//! - **Properties**: Values with change detection
//! - **Timers**: One-shot timers tracked per owning widget
//! - **Identity**: Process-unique widget IDs
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal Example
//!
//! ```
//! use statekit_core::Signal;
//!
//! let state_changed = Signal::<&'static str>::new();
//! let conn_id = state_changed.connect(|state| {
//!     println!("now {}", state);
//! });
//!
//! state_changed.emit("loading");
//! state_changed.disconnect(conn_id);
//! ```
//!
//! # Timer Example
//!
//! ```no_run
//! use statekit_core::{TimerRegistry, WidgetId};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let timers = TimerRegistry::new();
//!     let widget = WidgetId::next();
//!
//!     timers.start_one_shot(widget, Duration::from_secs(5), || {
//!         println!("dismissed");
//!     })?;
//!
//!     // Widget went away: drop everything it armed.
//!     timers.remove_timers_for(widget);
//!     Ok(())
//! }
//! ```

mod error;
mod id;
pub mod logging;
pub mod property;
pub mod signal;
pub mod timer;

pub use error::{CoreError, Result, TimerError};
pub use id::WidgetId;
pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionId, Signal};
pub use timer::{TimerId, TimerRegistry};
