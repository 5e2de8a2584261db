use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

struct Slot<V> {
    touched_ms: AtomicI64,
    value: Mutex<V>,
}

impl<V> Slot<V> {
    fn new(value: V) -> Self {
        Self {
            touched_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            value: Mutex::new(value),
        }
    }

    fn touch(&self) {
        self.touched_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn touched(&self) -> i64 {
        self.touched_ms.load(Ordering::Relaxed)
    }
}

/// Keyed records with one mutex per key.
///
/// The map lock is held only to find or insert a slot; the slot lock is held
/// for one read-modify-write. Nothing takes the map lock while holding a slot.
pub struct KeyedStore<K, V> {
    slots: RwLock<HashMap<K, Arc<Slot<V>>>>,
    capacity: usize,
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Runs `f` on the record for `key`, creating it with `init` if absent.
    pub fn update<R>(&self, key: &K, init: impl FnOnce() -> V, f: impl FnOnce(&mut V) -> R) -> R {
        let slot = self.slot_or_insert(key, init);
        slot.touch();
        let mut value = slot.value.lock();
        f(&mut value)
    }

    /// Runs `f` on the record for `key` if present. Reads do not refresh the
    /// idle timer.
    pub fn read<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let slot = self.slots.read().get(key).cloned()?;
        let value = slot.value.lock();
        Some(f(&value))
    }

    /// Runs `f` on the record for `key` if present, without creating it.
    pub fn update_existing<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let slot = self.slots.read().get(key).cloned()?;
        slot.touch();
        let mut value = slot.value.lock();
        Some(f(&mut value))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Drops every record idle for longer than `max_age`.
    pub fn cleanup_stale(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now().timestamp_millis() - max_age.num_milliseconds();
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.touched() >= cutoff);
        before - slots.len()
    }

    fn slot_or_insert(&self, key: &K, init: impl FnOnce() -> V) -> Arc<Slot<V>> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        if slots.len() >= self.capacity {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.touched())
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                slots.remove(&oldest);
                tracing::debug!(capacity = self.capacity, "store full, evicted least recently used record");
            }
        }

        let slot = Arc::new(Slot::new(init()));
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }
}
