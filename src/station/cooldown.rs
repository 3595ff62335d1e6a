//! Bounded per-creature cooldowns

use ahash::AHashMap;

use crate::core::types::{EntityId, Tick};

#[derive(Debug, Clone, Copy)]
struct Entry {
    expires: Tick,
    inserted: Tick,
}

/// Cooldown expiry per creature, holding at most `capacity` entries
///
/// When full, expired entries are swept first; if that frees nothing, the
/// oldest entries are evicted.
#[derive(Debug, Clone)]
pub struct CooldownMap {
    entries: AHashMap<EntityId, Entry>,
    capacity: usize,
}

impl CooldownMap {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_cooling(&self, id: EntityId, now: Tick) -> bool {
        self.entries.get(&id).is_some_and(|e| e.expires > now)
    }

    /// Start (or restart) a cooldown of `duration` ticks
    pub fn insert(&mut self, id: EntityId, now: Tick, duration: Tick) {
        if !self.entries.contains_key(&id) && self.entries.len() >= self.capacity {
            self.sweep(now);
            while self.entries.len() >= self.capacity {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(id, e)| (e.inserted, **id))
                    .map(|(id, _)| *id);
                match oldest {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        self.entries.insert(
            id,
            Entry {
                expires: now + duration,
                inserted: now,
            },
        );
    }

    /// Drop every expired entry
    pub fn sweep(&mut self, now: Tick) {
        self.entries.retain(|_, e| e.expires > now);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooling_until_expiry() {
        let mut map = CooldownMap::new(4);
        map.insert(EntityId(1), 100, 50);
        assert!(map.is_cooling(EntityId(1), 149));
        assert!(!map.is_cooling(EntityId(1), 150));
        assert!(!map.is_cooling(EntityId(2), 0));
    }

    #[test]
    fn test_bound_prefers_sweeping_expired() {
        let mut map = CooldownMap::new(2);
        map.insert(EntityId(1), 0, 10);
        map.insert(EntityId(2), 5, 1000);
        map.insert(EntityId(3), 20, 1000);
        assert_eq!(map.len(), 2);
        assert!(map.is_cooling(EntityId(2), 20));
        assert!(map.is_cooling(EntityId(3), 20));
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let mut map = CooldownMap::new(128);
        for i in 0..200 {
            map.insert(EntityId(i), i, 10_000);
        }
        assert_eq!(map.len(), 128);
        assert!(!map.is_cooling(EntityId(0), 200));
        assert!(map.is_cooling(EntityId(199), 200));
    }
}
