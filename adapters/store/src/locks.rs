//! Per-room mutual exclusion.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{RoomId, StoreError};

/// Lazily created lock per room.
///
/// Every read-modify-write cycle on a room holds that room's lock, so
/// concurrent requests against one room are applied one after another while
/// different rooms proceed independently. Entries are dropped once no caller
/// holds them.
#[derive(Clone, Debug, Default)]
pub struct RoomLocks {
    locks: Arc<Mutex<HashMap<RoomId, Arc<Mutex<()>>>>>,
}

impl RoomLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `operation` while holding the lock for `id`.
    pub fn with_lock<T, E, F>(&self, id: &RoomId, operation: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce() -> Result<T, E>,
    {
        let lock = self.acquire(id)?;
        let result = match lock.lock() {
            Ok(_guard) => operation(),
            Err(_) => Err(StoreError::Poisoned.into()),
        };
        self.release(id, lock)?;
        result
    }

    /// Number of rooms with a live lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }

    /// Reports whether no room currently holds a lock entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, id: &RoomId) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(locks.entry(id.clone()).or_default()))
    }

    fn release(&self, id: &RoomId, lock: Arc<Mutex<()>>) -> Result<(), StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        drop(lock);
        if locks.get(id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            let _ = locks.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::mpsc, thread};

    fn room(id: &str) -> RoomId {
        RoomId::new(id).expect("room id")
    }

    #[test]
    fn entries_are_dropped_after_use() {
        let locks = RoomLocks::new();

        let value: Result<u32, StoreError> = locks.with_lock(&room("alpha"), || Ok(7));

        assert_eq!(value, Ok(7));
        assert!(locks.is_empty());
    }

    #[test]
    fn same_room_runs_one_operation_at_a_time() {
        let locks = RoomLocks::new();
        let alpha = room("alpha");
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let locks = locks.clone();
            let alpha = alpha.clone();
            thread::spawn(move || {
                locks.with_lock(&alpha, || {
                    entered_tx.send(()).expect("send");
                    release_rx.recv().expect("recv");
                    Ok::<_, StoreError>(())
                })
            })
        };
        entered_rx.recv().expect("entered");
        assert_eq!(locks.len(), 1);

        let other: Result<(), StoreError> = locks.with_lock(&room("beta"), || Ok(()));
        assert_eq!(other, Ok(()));
        assert_eq!(locks.len(), 1);

        release_tx.send(()).expect("release");
        assert_eq!(holder.join().expect("join"), Ok(()));
        assert!(locks.is_empty());
    }
}
