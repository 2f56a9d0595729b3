//! Process-local fallback used once the backing store is exhausted.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use tracing::warn;

use crate::{InMemoryRoomStore, RoomId, StoreError};

/// Degraded-mode state shared by every request handler.
///
/// Once activated the latch stays set for the lifetime of the process. While
/// active, rooms are read from and written to a local cache and viewer
/// counts are approximated in memory. Nothing written here is synchronized
/// back to the backing store.
#[derive(Debug, Default)]
pub struct DegradedMode {
    active: AtomicBool,
    viewers: Mutex<HashMap<RoomId, u32>>,
    rooms: InMemoryRoomStore,
}

impl DegradedMode {
    /// Creates an inactive fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether degraded mode is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Switches to degraded mode. Returns `true` on the first activation.
    pub fn activate(&self, cause: &StoreError) -> bool {
        let first = !self.active.swap(true, Ordering::SeqCst);
        if first {
            warn!(%cause, "room store degraded, serving process-local state");
        }
        first
    }

    /// Local room cache used while degraded.
    #[must_use]
    pub fn rooms(&self) -> &InMemoryRoomStore {
        &self.rooms
    }

    /// Approximate viewer count of a room.
    pub fn viewers(&self, id: &RoomId) -> Result<u32, StoreError> {
        let viewers = self.viewers.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(viewers.get(id).copied().unwrap_or(0))
    }

    /// Adjusts the approximate viewer count by one, clamped at zero.
    pub fn adjust_viewers(&self, id: &RoomId, joined: bool) -> Result<u32, StoreError> {
        let mut viewers = self.viewers.lock().map_err(|_| StoreError::Poisoned)?;
        let count = viewers.entry(id.clone()).or_insert(0);
        *count = if joined {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
        Ok(*count)
    }

    /// Seeds the approximate viewer count for a room.
    pub fn set_viewers(&self, id: &RoomId, count: u32) -> Result<(), StoreError> {
        let mut viewers = self.viewers.lock().map_err(|_| StoreError::Poisoned)?;
        let _ = viewers.insert(id.clone(), count);
        Ok(())
    }
}
