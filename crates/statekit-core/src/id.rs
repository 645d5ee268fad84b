//! Widget identity.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique widget IDs.
static NEXT_WIDGET_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a widget.
///
/// Timers, in-flight transitions and loading loops are keyed by the widget
/// that owns them, so they can be cancelled together when the widget goes
/// away.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(NonZeroU64);

impl WidgetId {
    /// Allocate a fresh ID.
    pub fn next() -> Self {
        let raw = NEXT_WIDGET_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// The raw numeric value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({})", self.0)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
