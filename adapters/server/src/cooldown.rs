//! Per-viewer sabotage cooldown tracking.

use std::{
    collections::HashMap,
    fmt,
    sync::Mutex,
    time::Duration,
};

use maze_sabotage_core::{SabotageKind, Timestamp};
use maze_sabotage_store::StoreError;

/// Remembers when each viewer last used each sabotage kind.
pub trait CooldownLedger: Send + Sync + fmt::Debug {
    /// Time `viewer` must still wait before using `kind` again.
    fn remaining(
        &self,
        viewer: &str,
        kind: SabotageKind,
        now: Timestamp,
    ) -> Result<Duration, StoreError>;

    /// Records that `viewer` used `kind` at `now`.
    fn record(&self, viewer: &str, kind: SabotageKind, now: Timestamp) -> Result<(), StoreError>;
}

/// Process-local cooldown ledger.
///
/// Entries whose cooldown has elapsed are pruned, so the ledger only holds
/// viewers that are still waiting.
#[derive(Debug, Default)]
pub struct InMemoryCooldownLedger {
    used_at: Mutex<HashMap<(String, SabotageKind), Timestamp>>,
}

impl InMemoryCooldownLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of viewer and kind pairs still cooling down.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used_at.lock().map_or(0, |used_at| used_at.len())
    }

    /// Reports whether no viewer is cooling down.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remaining_at(kind: SabotageKind, last: Timestamp, now: Timestamp) -> Duration {
    let since = Duration::from_millis(now.millis().saturating_sub(last.millis()));
    kind.cooldown().saturating_sub(since)
}

impl CooldownLedger for InMemoryCooldownLedger {
    fn remaining(
        &self,
        viewer: &str,
        kind: SabotageKind,
        now: Timestamp,
    ) -> Result<Duration, StoreError> {
        let mut used_at = self.used_at.lock().map_err(|_| StoreError::Poisoned)?;
        let key = (viewer.to_owned(), kind);
        let Some(last) = used_at.get(&key).copied() else {
            return Ok(Duration::ZERO);
        };
        let remaining = remaining_at(kind, last, now);
        if remaining.is_zero() {
            let _ = used_at.remove(&key);
        }
        Ok(remaining)
    }

    fn record(&self, viewer: &str, kind: SabotageKind, now: Timestamp) -> Result<(), StoreError> {
        let mut used_at = self.used_at.lock().map_err(|_| StoreError::Poisoned)?;
        used_at.retain(|(_, used), last| !remaining_at(*used, *last, now).is_zero());
        let _ = used_at.insert((viewer.to_owned(), kind), now);
        Ok(())
    }
}
