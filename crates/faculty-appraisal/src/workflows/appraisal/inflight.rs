use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Tracks which entities have an operation outstanding. A second attempt on the
/// same key is refused rather than queued.
#[derive(Debug)]
pub struct InFlightRegistry<K> {
    active: Mutex<HashSet<K>>,
}

impl<K> Default for InFlightRegistry<K> {
    fn default() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlightRegistry<K> {
    pub fn try_acquire(&self, key: K) -> Option<InFlightGuard<'_, K>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            registry: self,
            key,
        })
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a, K: Eq + Hash> {
    registry: &'a InFlightRegistry<K>,
    key: K,
}

impl<K: Eq + Hash> Drop for InFlightGuard<'_, K> {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
