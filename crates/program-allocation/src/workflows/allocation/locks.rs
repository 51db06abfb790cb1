use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lazily created mutex per key, so work on one key never waits on another.
///
/// An entry lives only while some caller holds a [`KeyHandle`] for it, so the table stays
/// bounded by the number of keys in flight rather than every key ever requested.
pub(crate) struct KeyedLocks<K: Eq + Hash> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Handle for `key`; lock it to serialize with every other holder of the same key.
    pub(crate) fn handle(&self, key: &K) -> KeyHandle<'_, K> {
        let mutex = self
            .table()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyHandle {
            owner: self,
            key: key.clone(),
            mutex,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }

    // The guarded values are `()`, so a poisoned lock carries no broken state.
    fn table(&self) -> MutexGuard<'_, HashMap<K, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim on one key's mutex. Dropping the last claim removes the key from the table.
pub(crate) struct KeyHandle<'a, K>
where
    K: Eq + Hash + Clone,
{
    owner: &'a KeyedLocks<K>,
    key: K,
    mutex: Arc<Mutex<()>>,
}

impl<K> KeyHandle<'_, K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K> Drop for KeyHandle<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let mut table = self.owner.table();
        // Clones are only taken under the table lock, so two references means the table's
        // own and ours.
        if Arc::strong_count(&self.mutex) == 2 {
            table.remove(&self.key);
        }
    }
}
