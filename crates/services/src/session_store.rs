//! Shared persistence boundary for one learning session.
//!
//! Every service reads and writes through a `SessionStore`. Missing or
//! unparseable values come back as `None`; a failing backend switches the
//! whole session to in-memory operation instead of surfacing errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use storage::records::{decode, encode};
use storage::repository::{KeyValueStore, Storage, StorageError};
use tracing::{debug, warn};

/// Whether writes still reach durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Durable,
    /// A read or write failed; state lives in memory until the session ends.
    Degraded,
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    degraded: Arc<AtomicBool>,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.kv))
    }

    #[must_use]
    pub fn persistence(&self) -> Persistence {
        if self.degraded.load(Ordering::Acquire) {
            Persistence::Degraded
        } else {
            Persistence::Durable
        }
    }

    /// Read and decode `key`. Absent, malformed and unreadable values are all `None`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                self.degrade("read", key, &err);
                return None;
            }
        };
        match decode::<T>(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding malformed stored value");
                None
            }
        }
    }

    /// Encode and write `value`. Returns true if it reached storage.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> bool {
        if self.persistence() == Persistence::Degraded {
            debug!(key, "storage degraded; keeping value in memory");
            return false;
        }
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "value could not be encoded");
                return false;
            }
        };
        match self.kv.set(key, &raw).await {
            Ok(()) => {
                debug!(key, bytes = raw.len(), "saved");
                true
            }
            Err(err) => {
                self.degrade("write", key, &err);
                false
            }
        }
    }

    /// Delete `key`. Returns true if storage confirmed the removal.
    pub async fn remove(&self, key: &str) -> bool {
        if self.persistence() == Persistence::Degraded {
            return false;
        }
        match self.kv.remove(key).await {
            Ok(()) => true,
            Err(err) => {
                self.degrade("remove", key, &err);
                false
            }
        }
    }

    fn degrade(&self, op: &'static str, key: &str, err: &StorageError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(op, key, error = %err, "storage unavailable; continuing in memory for this session");
        }
    }
}
