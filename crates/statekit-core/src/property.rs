//! Lock-guarded values with change detection.
//!
//! A widget's configuration lives in a [`Property`]. Writes go through
//! [`Property::update`], which reports the old and new value only when the
//! write changed something, so owners emit notifications for real changes
//! and never while the lock is held.
//!
//! ```
//! use statekit_core::Property;
//!
//! let size = Property::new(12u32);
//! assert_eq!(size.update(|s| *s = 12), None);
//! assert_eq!(size.update(|s| *s += 4), Some((12, 16)));
//! assert_eq!(size.get(), 16);
//! ```

use std::fmt;
use std::mem;

use parking_lot::RwLock;

pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Read through `f` without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Apply `f` to a copy and store it if it differs.
    ///
    /// Returns `(old, new)` on change. The write lock covers the whole
    /// read-modify-write, so concurrent updates never interleave.
    pub fn update<F>(&self, f: F) -> Option<(T, T)>
    where
        F: FnOnce(&mut T),
    {
        let mut current = self.value.write();
        let mut next = current.clone();
        f(&mut next);
        if *current == next {
            return None;
        }
        let old = mem::replace(&mut *current, next.clone());
        Some((old, next))
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&*self.value.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Config {
        state: &'static str,
        size: u8,
    }

    #[test]
    fn test_update_reports_only_changes() {
        let config = Property::new(Config::default());
        assert_eq!(config.update(|c| c.size = 0), None);

        let (old, new) = config.update(|c| c.state = "loading").unwrap();
        assert_eq!(old.state, "");
        assert_eq!(new.state, "loading");
        assert_eq!(config.with(|c| c.state), "loading");
    }

    #[test]
    fn test_update_keeps_untouched_fields() {
        let config = Property::new(Config { state: "idle", size: 3 });
        config.update(|c| c.state = "error");
        assert_eq!(config.get(), Config { state: "error", size: 3 });
    }
}
