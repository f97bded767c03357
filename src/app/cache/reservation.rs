//! Per-key reservation for preventing duplicate downloads
//!
//! Each registry filename gets its own async mutex. A caller holds the guard
//! for the whole fetch, verify and extract pipeline of that key, so two
//! concurrent requests for the same file within one cache instance result in
//! a single download; the second caller finds a valid file once it gets the
//! lock. Different keys never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Guard held while a key is being fetched
pub type KeyGuard = OwnedMutexGuard<()>;

/// Lazily populated table of per-key locks
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and reserve it
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = self.lock_for(key);
        if let Ok(guard) = Arc::clone(&lock).try_lock_owned() {
            return guard;
        }
        debug!("Waiting for in-flight fetch of {}", key);
        lock.lock_owned().await
    }

    /// Whether some caller currently holds `key`
    pub fn is_reserved(&self, key: &str) -> bool {
        let locks = self.table();
        locks
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys that have been reserved at least once
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.table();
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    // The table is only touched for map lookups, so a poisoned lock still
    // holds a consistent map.
    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
