//! Owner-tracked timers.
//!
//! A [`TimerRegistry`] arms one-shot timers on the Tokio runtime and
//! remembers which widget owns each of them, so a widget that goes away
//! can drop all of its timers with a single [`TimerRegistry::remove_timers_for`]
//! call. Every armed timer yields a [`TimerId`] that stops it.
//!
//! Callbacks run on the runtime, after the timer entry has been removed and
//! with no registry lock held, so a callback may freely
//! arm or stop other timers.
//!
//! # Example
//!
//! ```no_run
//! use statekit_core::{TimerRegistry, WidgetId};
//! use std::time::Duration;
//!
//! # async fn demo() -> statekit_core::Result<()> {
//! let timers = TimerRegistry::new();
//! let owner = WidgetId::next();
//!
//! let id = timers.start_one_shot(owner, Duration::from_secs(5), || {
//!     println!("dismissed");
//! })?;
//!
//! // Changed our mind.
//! timers.stop(id)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::error::{Result, TimerError};
use crate::id::WidgetId;

new_key_type! {
    /// A unique identifier for an armed timer.
    pub struct TimerId;
}

struct TimerEntry {
    owner: WidgetId,
    task: AbortHandle,
}

#[derive(Default)]
struct RegistryInner {
    timers: SlotMap<TimerId, TimerEntry>,
    closed: bool,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        for (_, entry) in self.timers.drain() {
            entry.task.abort();
        }
    }
}

/// A cloneable handle to a set of owner-tracked timers.
///
/// Clones share the same timers. When the last handle is dropped every
/// pending timer is aborted without firing.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer that calls `callback` once after `delay`.
    ///
    /// Fails with [`TimerError::NoRuntime`] when called outside a Tokio
    /// runtime and with [`TimerError::RegistryClosed`] after
    /// [`shutdown`](Self::shutdown).
    pub fn start_one_shot<F>(&self, owner: WidgetId, delay: Duration, callback: F) -> Result<TimerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let registry = Arc::downgrade(&self.inner);

        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TimerError::RegistryClosed.into());
        }

        let id = inner.timers.insert_with_key(|id| {
            let task = handle.spawn(async move {
                tokio::time::sleep(delay).await;
                let Some(inner) = registry.upgrade() else {
                    return;
                };
                // A missing entry means the timer was stopped while we slept.
                if inner.lock().timers.remove(id).is_none() {
                    return;
                }
                drop(inner);
                tracing::trace!(target: "statekit_core::timer", ?id, %owner, "timer fired");
                callback();
            });
            TimerEntry {
                owner,
                task: task.abort_handle(),
            }
        });
        tracing::trace!(target: "statekit_core::timer", ?id, %owner, ?delay, "timer armed");
        Ok(id)
    }

    /// Stop and remove a timer.
    ///
    /// Returns an error if the timer already fired or was stopped.
    pub fn stop(&self, id: TimerId) -> Result<()> {
        match self.inner.lock().timers.remove(id) {
            Some(entry) => {
                entry.task.abort();
                tracing::trace!(target: "statekit_core::timer", ?id, "timer stopped");
                Ok(())
            }
            None => Err(TimerError::InvalidTimerId.into()),
        }
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.lock().timers.contains_key(id)
    }

    /// Stop every timer owned by `owner`.
    ///
    /// Returns how many timers were stopped.
    pub fn remove_timers_for(&self, owner: WidgetId) -> usize {
        let mut inner = self.inner.lock();
        let ids: Vec<TimerId> = inner
            .timers
            .iter()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(id, _)| id)
            .collect();

        for id in &ids {
            if let Some(entry) = inner.timers.remove(*id) {
                entry.task.abort();
            }
        }
        if !ids.is_empty() {
            tracing::trace!(target: "statekit_core::timer", ?owner, count = ids.len(), "removed owner timers");
        }
        ids.len()
    }

    /// Number of timers owned by `owner`.
    pub fn count_for(&self, owner: WidgetId) -> usize {
        self.inner
            .lock()
            .timers
            .values()
            .filter(|entry| entry.owner == owner)
            .count()
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Abort every timer and refuse new ones.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        for (_, entry) in inner.timers.drain() {
            entry.task.abort();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TimerRegistry")
            .field("active", &inner.timers.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

static_assertions::assert_impl_all!(TimerRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::CoreError;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Clone + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = count.clone();
        (count, move || {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let timers = TimerRegistry::new();
        let owner = WidgetId::next();
        let (count, bump) = counter();

        let id = timers
            .start_one_shot(owner, Duration::from_millis(100), bump)
            .unwrap();
        assert!(timers.is_active(id));
        assert_eq!(timers.count_for(owner), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timers.is_active(id));
        assert_eq!(timers.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_fire() {
        let timers = TimerRegistry::new();
        let (count, bump) = counter();

        let id = timers
            .start_one_shot(WidgetId::next(), Duration::from_millis(10), bump)
            .unwrap();
        timers.stop(id).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(
            timers.stop(id),
            Err(CoreError::Timer(TimerError::InvalidTimerId))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_timers_for_owner() {
        let timers = TimerRegistry::new();
        let doomed = WidgetId::next();
        let survivor = WidgetId::next();
        let (doomed_count, doomed_bump) = counter();
        let (survivor_count, survivor_bump) = counter();

        timers
            .start_one_shot(doomed, Duration::from_millis(10), doomed_bump.clone())
            .unwrap();
        timers
            .start_one_shot(doomed, Duration::from_millis(30), doomed_bump)
            .unwrap();
        timers
            .start_one_shot(survivor, Duration::from_millis(10), survivor_bump)
            .unwrap();

        assert_eq!(timers.count_for(doomed), 2);
        assert_eq!(timers.remove_timers_for(doomed), 2);
        assert_eq!(timers.count_for(doomed), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(doomed_count.load(Ordering::SeqCst), 0);
        assert_eq!(survivor_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_rearm() {
        let timers = TimerRegistry::new();
        let owner = WidgetId::next();
        let (count, bump) = counter();

        let rearm = timers.clone();
        timers
            .start_one_shot(owner, Duration::from_millis(10), move || {
                rearm
                    .start_one_shot(owner, Duration::from_millis(10), bump)
                    .unwrap();
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_new_timers() {
        let timers = TimerRegistry::new();
        let (count, bump) = counter();
        timers
            .start_one_shot(WidgetId::next(), Duration::from_millis(10), bump.clone())
            .unwrap();

        timers.shutdown();
        assert!(timers.is_closed());
        assert_eq!(timers.active_count(), 0);
        assert_eq!(
            timers.start_one_shot(WidgetId::next(), Duration::from_millis(10), bump),
            Err(CoreError::Timer(TimerError::RegistryClosed))
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_runtime() {
        let timers = TimerRegistry::new();
        let result = timers.start_one_shot(WidgetId::next(), Duration::from_millis(10), || {});
        assert_eq!(result, Err(CoreError::Timer(TimerError::NoRuntime)));
    }
}
