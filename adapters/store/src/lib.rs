#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Persistence adapter for room documents.
//!
//! Rooms are persisted as [`RoomRecord`] documents keyed by [`RoomId`]. The
//! [`RoomStore`] trait abstracts the backing document store; the crate ships
//! an in-memory implementation with an optional write quota, a process-local
//! [`DegradedMode`] used once the backing store is exhausted, and per-room
//! [`RoomLocks`] that serialize read-modify-write cycles.

mod degraded;
mod locks;
mod memory;
mod record;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use degraded::DegradedMode;
pub use locks::RoomLocks;
pub use memory::InMemoryRoomStore;
pub use record::{RoomPatch, RoomRecord};

/// Identifier of a room document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room identifier, rejecting blank values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// String form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures raised by room persistence.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("room store unavailable: {0}")]
    Unavailable(String),
    /// The backing store refused the operation because a quota was exhausted.
    #[error("room store quota exhausted")]
    Exhausted,
    /// A merge targeted a room that does not exist.
    #[error("room `{0}` not found")]
    NotFound(RoomId),
    /// A persisted document could not be decoded.
    #[error("room document is corrupt: {0}")]
    Corrupt(String),
    /// A lock guarding in-process state was poisoned.
    #[error("lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Reports whether the failure should switch the service to degraded mode.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Exhausted)
    }
}

/// Document store holding one record per room.
///
/// Implementations must be safe to share between request handlers.
pub trait RoomStore: Send + Sync + fmt::Debug {
    /// Reads a room document.
    fn get(&self, id: &RoomId) -> Result<Option<RoomRecord>, StoreError>;

    /// Writes a full room document, replacing any previous one.
    fn set(&self, id: &RoomId, record: &RoomRecord) -> Result<(), StoreError>;

    /// Merges the present fields of `patch` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the room does not exist.
    fn merge(&self, id: &RoomId, patch: &RoomPatch) -> Result<(), StoreError>;

    /// Lists every stored room identifier in ascending order.
    fn list(&self) -> Result<Vec<RoomId>, StoreError>;
}
