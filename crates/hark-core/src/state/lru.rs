//! Small bounded map with least-recently-touched eviction.

use std::collections::HashMap;
use std::hash::Hash;

/// Bounded map that evicts the least recently touched entry on overflow.
///
/// Capacities here are tiny (tens of entries), so eviction scans for the
/// oldest tick instead of maintaining a linked list.
#[derive(Debug)]
pub(crate) struct LruMap<K, V> {
    entries: HashMap<K, (u64, V)>,
    capacity: usize,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> LruMap<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.saturating_add(1)),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    /// Get an entry and mark it as most recently touched.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|(t, v)| {
            *t = tick;
            &*v
        })
    }

    /// Get an entry, inserting `make()` first if it is absent.
    ///
    /// Room is made by evicting the least recently touched entries for which
    /// `evictable` holds. When none qualifies the map grows past capacity and
    /// shrinks back on later inserts. Returns the entry and whatever was evicted.
    pub(crate) fn get_or_insert_with(
        &mut self,
        key: K,
        make: impl FnOnce() -> V,
        evictable: impl Fn(&V) -> bool,
    ) -> (&V, Vec<(K, V)>) {
        self.tick += 1;
        let tick = self.tick;

        let mut evicted = Vec::new();
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                match self.evict_oldest(&evictable) {
                    Some(entry) => evicted.push(entry),
                    None => break,
                }
            }
        }

        let slot = self.entries.entry(key).or_insert_with(|| (tick, make()));
        slot.0 = tick;
        (&slot.1, evicted)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn evict_oldest(&mut self, evictable: impl Fn(&V) -> bool) -> Option<(K, V)> {
        let oldest = self
            .entries
            .iter()
            .filter(|(_, (_, v))| evictable(v))
            .min_by_key(|(_, (t, _))| *t)
            .map(|(k, _)| k.clone())?;
        self.entries.remove(&oldest).map(|(_, v)| (oldest, v))
    }
}
