use std::sync::{Mutex, PoisonError};

use subfox_domain::Subscription;

use crate::CoreError;

/// Fixed key under which the subscription collection is cached.
pub const CACHE_KEY: &str = "subfox_subscriptions";

/// Device-local persistence of the subscription collection.
///
/// `load` never fails: absent or malformed content reads as an empty
/// collection. `save` replaces the previous content as a whole; readers
/// never observe a partial write.
pub trait CacheStore: Send + Sync {
    fn load(&self) -> Vec<Subscription>;
    fn save(&self, records: &[Subscription]) -> Result<(), CoreError>;
}

/// Process-local cache, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: Mutex<Vec<Subscription>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Subscription>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Vec<Subscription> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, records: &[Subscription]) -> Result<(), CoreError> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }
}
