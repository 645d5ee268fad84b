//! Change notifications.
//!
//! A [`Signal<Args>`] is how a state machine or orchestrator reports that a
//! state changed or a transition started or finished. Slots are plain
//! closures, called synchronously on whichever task emits.
//!
//! Emission snapshots the slot list before calling anything, so a slot may
//! connect, disconnect or emit again on the same signal. A slot connected
//! during an emission first runs on the next one.
//!
//! ```
//! use statekit_core::Signal;
//!
//! let state_changed = Signal::<&'static str>::new();
//! let id = state_changed.connect(|state| println!("now {state}"));
//!
//! state_changed.emit("loading");
//! assert!(state_changed.disconnect(id));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Identifies one connected slot.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots called with `&Args` on every [`emit`](Self::emit).
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Connect `slot`; the returned ID disconnects it again.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Returns `true` if `id` was still connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Call every connected slot in connection order.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        if slots.is_empty() {
            return;
        }
        tracing::trace!(target: "statekit_core::signal", slots = slots.len(), "emitting");
        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.lock().len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
