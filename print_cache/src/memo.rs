//! Bounded least-recently-used memo cache
//!
//! Entries belong to one cache epoch. Values computed against an older store
//! generation are refused, so a lookup that races a reload cannot plant a
//! stale answer after `invalidate_all` has run.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    tick: u64,
}

#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    epoch: u64,
    tick: u64,
    entries: HashMap<K, Slot<V>>,
    /// Recency order: tick -> key, oldest first
    order: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            epoch: 0,
            tick: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    fn touch(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.tick);
        self.tick += 1;
        slot.tick = self.tick;
        self.order.insert(self.tick, key.clone());
        Some(slot.value.clone())
    }

    /// Cached value for `key`, if it was computed in `epoch`
    pub fn get(&mut self, key: &K, epoch: u64) -> Option<V> {
        if epoch != self.epoch {
            return None;
        }
        self.touch(key)
    }

    /// Store a value computed against store generation `epoch`
    pub fn insert(&mut self, key: K, value: V, epoch: u64) {
        if epoch < self.epoch {
            return;
        }
        if epoch > self.epoch {
            self.invalidate_all();
            self.epoch = epoch;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.order.remove(&old.tick);
        }
        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        self.tick += 1;
        self.order.insert(self.tick, key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                tick: self.tick,
            },
        );
    }

    /// Drop every entry
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Drop every entry and refuse values from generations before `epoch`
    pub fn reset_to(&mut self, epoch: u64) {
        self.invalidate_all();
        self.epoch = self.epoch.max(epoch);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
