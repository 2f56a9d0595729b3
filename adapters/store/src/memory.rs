//! BTreeMap-backed room store.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::{RoomId, RoomPatch, RoomRecord, RoomStore, StoreError};

/// In-memory room store.
///
/// Documents are kept as serialized JSON bytes so every read exercises the
/// same decoding path as a remote document store. An optional write quota
/// makes the store report [`StoreError::Exhausted`] once the configured
/// number of writes has been spent. Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRoomStore {
    storage: Arc<RwLock<BTreeMap<RoomId, Vec<u8>>>>,
    quota: Option<Arc<AtomicU64>>,
}

impl InMemoryRoomStore {
    /// Creates an empty store without a write quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that accepts at most `writes` writes.
    #[must_use]
    pub fn with_write_quota(writes: u64) -> Self {
        Self {
            storage: Arc::default(),
            quota: Some(Arc::new(AtomicU64::new(writes))),
        }
    }

    /// Number of writes left before the quota is exhausted, if one is set.
    #[must_use]
    pub fn remaining_writes(&self) -> Option<u64> {
        self.quota
            .as_ref()
            .map(|quota| quota.load(Ordering::SeqCst))
    }

    fn spend_write(&self) -> Result<(), StoreError> {
        let Some(quota) = &self.quota else {
            return Ok(());
        };
        quota
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::Exhausted)
    }

    fn encode(record: &RoomRecord) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record).map_err(|error| StoreError::Corrupt(error.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<RoomRecord, StoreError> {
        serde_json::from_slice(bytes).map_err(|error| StoreError::Corrupt(error.to_string()))
    }
}

impl RoomStore for InMemoryRoomStore {
    fn get(&self, id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
        let storage = self.storage.read().map_err(|_| StoreError::Poisoned)?;
        storage.get(id).map(|bytes| Self::decode(bytes)).transpose()
    }

    fn set(&self, id: &RoomId, record: &RoomRecord) -> Result<(), StoreError> {
        let bytes = Self::encode(record)?;
        let mut storage = self.storage.write().map_err(|_| StoreError::Poisoned)?;
        self.spend_write()?;
        let _ = storage.insert(id.clone(), bytes);
        Ok(())
    }

    fn merge(&self, id: &RoomId, patch: &RoomPatch) -> Result<(), StoreError> {
        let mut storage = self.storage.write().map_err(|_| StoreError::Poisoned)?;
        let Some(bytes) = storage.get_mut(id) else {
            return Err(StoreError::NotFound(id.clone()));
        };
        let mut record = Self::decode(bytes)?;
        record.merge(patch);
        let encoded = Self::encode(&record)?;
        self.spend_write()?;
        *bytes = encoded;
        Ok(())
    }

    fn list(&self) -> Result<Vec<RoomId>, StoreError> {
        let storage = self.storage.read().map_err(|_| StoreError::Poisoned)?;
        Ok(storage.keys().cloned().collect())
    }
}
