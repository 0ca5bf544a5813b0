//! String-keyed map behind a single read-write lock.
//!
//! Reads take the shared lock, mutations the exclusive one.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug)]
pub struct SyncMap<T> {
    inner: RwLock<HashMap<String, T>>,
}

impl<T> Default for SyncMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncMap<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self, key: impl Into<String>, value: T) {
        self.inner.write().insert(key.into(), value);
    }

    pub fn delete(&self, key: &str) -> Option<T> {
        self.inner.write().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Keys in unspecified order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<T: Clone> SyncMap<T> {
    pub fn get(&self, key: &str) -> Option<T> {
        self.inner.read().get(key).cloned()
    }

    pub fn values(&self) -> Vec<T> {
        self.inner.read().values().cloned().collect()
    }
}
