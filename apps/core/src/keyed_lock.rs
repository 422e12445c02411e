use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

/// Per-key exclusion. Holding the guard for a key serializes every fill for
/// that key while other keys proceed in parallel.
pub struct KeyedLocks<K> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no other guard for `key` is alive.
    pub fn lock(&self, key: &K) -> KeyGuard<'_, K> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        while held.contains(key) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|e| e.into_inner());
        }
        held.insert(key.clone());
        KeyGuard {
            owner: self,
            key: key.clone(),
        }
    }

    /// Number of keys currently held.
    pub fn held(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or(0)
    }
}

pub struct KeyGuard<'a, K: Eq + Hash + Clone> {
    owner: &'a KeyedLocks<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        let mut held = self.owner.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.key);
        drop(held);
        self.owner.released.notify_all();
    }
}
