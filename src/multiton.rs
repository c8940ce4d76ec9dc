//! Instance-reuse registry
//!
//! A [`Multiton`] hands out one shared value per construction key. Entries
//! that have not been requested within the idle window are released on the
//! next access; values still held elsewhere stay alive, the registry simply
//! stops returning them.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Default idle window before an entry is released, in seconds
pub const DEFAULT_IDLE_SECS: i64 = 3600;

struct Entry<V> {
    value: V,
    last_used: DateTime<Utc>,
}

/// Registry of shared values keyed by construction parameters
pub struct Multiton<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    idle_window: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> Multiton<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Registry with the default one-hour idle window
    pub fn new() -> Self {
        Self::with_clock(Duration::seconds(DEFAULT_IDLE_SECS), Arc::new(SystemClock))
    }

    pub fn with_clock(idle_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_window,
            clock,
        }
    }

    /// Return the value cached for `key`, or build, cache and return it
    ///
    /// The constructor runs under the registry lock. A failed construction
    /// leaves no entry behind and its error is returned unchanged.
    pub fn get_or_try_init<E, F>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Self::evict_idle(&mut entries, now, self.idle_window);

        if let Some(entry) = entries.get_mut(key) {
            entry.last_used = now;
            return Ok(entry.value.clone());
        }

        let value = init()?;
        debug!(key = ?key, "Registry entry created");
        entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                last_used: now,
            },
        );
        Ok(value)
    }

    /// Infallible variant of [`Multiton::get_or_try_init`]
    pub fn get_or_init<F>(&self, key: &K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_init::<std::convert::Infallible, _>(key, || Ok(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Whether an entry for `key` is currently retained
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Release every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn evict_idle(entries: &mut HashMap<K, Entry<V>>, now: DateTime<Utc>, idle: Duration) {
        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_used <= idle);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Released idle registry entries");
        }
    }
}

impl<K, V> Default for Multiton<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Registry that shares a value only while someone outside holds it
///
/// No idle window applies: an entry lives exactly as long as its last
/// strong reference, so every holder of a key sees the same value.
pub struct WeakRegistry<K, T> {
    entries: Mutex<HashMap<K, Weak<T>>>,
}

impl<K, T> WeakRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The live value for `key`, or a new one when no holder remains
    pub fn get_or_init<F>(&self, key: &K, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);

        if let Some(value) = entries.get(key).and_then(Weak::upgrade) {
            return value;
        }

        let value = Arc::new(init());
        debug!(key = ?key, "Shared entry created");
        entries.insert(key.clone(), Arc::downgrade(&value));
        value
    }

    /// Number of keys with a live value
    pub fn len(&self) -> usize {
        self.entries.lock().values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every key; values already handed out are unaffected
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K, T> Default for WeakRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry(clock: Arc<ManualClock>) -> Multiton<String, Arc<u32>> {
        Multiton::with_clock(Duration::seconds(DEFAULT_IDLE_SECS), clock)
    }

    #[test]
    fn test_same_key_same_instance() {
        let clock = Arc::new(ManualClock::default());
        let reg = registry(clock);

        let a = reg.get_or_init(&"k".to_string(), || Arc::new(1));
        let b = reg.get_or_init(&"k".to_string(), || Arc::new(2));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_distinct_keys_distinct_instances() {
        let reg = registry(Arc::new(ManualClock::default()));

        let a = reg.get_or_init(&"a".to_string(), || Arc::new(1));
        let b = reg.get_or_init(&"b".to_string(), || Arc::new(1));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_idle_eviction_window() {
        let clock = Arc::new(ManualClock::default());
        let reg = registry(clock.clone());
        let key = "k".to_string();

        let first = reg.get_or_init(&key, || Arc::new(1));

        clock.advance(Duration::minutes(30));
        let second = reg.get_or_init(&key, || Arc::new(2));
        assert!(Arc::ptr_eq(&first, &second));

        clock.advance(Duration::minutes(90));
        let third = reg.get_or_init(&key, || Arc::new(3));
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*third, 3);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_eviction_drops_other_idle_keys() {
        let clock = Arc::new(ManualClock::default());
        let reg = registry(clock.clone());

        reg.get_or_init(&"old".to_string(), || Arc::new(1));
        clock.advance(Duration::minutes(61));
        reg.get_or_init(&"new".to_string(), || Arc::new(2));

        assert!(!reg.contains(&"old".to_string()));
        assert!(reg.contains(&"new".to_string()));
    }

    #[test]
    fn test_failed_construction_leaves_no_entry() {
        let reg = registry(Arc::new(ManualClock::default()));
        let key = "k".to_string();

        let result: Result<Arc<u32>, &str> = reg.get_or_try_init(&key, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(reg.is_empty());

        let value: Result<Arc<u32>, &str> = reg.get_or_try_init(&key, || Ok(Arc::new(7)));
        assert_eq!(*value.unwrap(), 7);
    }

    #[test]
    fn test_weak_registry_follows_holders() {
        let reg: WeakRegistry<String, u32> = WeakRegistry::new();
        let key = "app".to_string();

        let held = reg.get_or_init(&key, || 1);
        let again = reg.get_or_init(&key, || 2);
        assert!(Arc::ptr_eq(&held, &again));
        assert_eq!(reg.len(), 1);

        drop(held);
        drop(again);
        assert!(reg.is_empty());
        assert_eq!(*reg.get_or_init(&key, || 3), 3);
    }
}
