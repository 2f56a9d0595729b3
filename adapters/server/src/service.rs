//! Room operations shared by every transport.
//!
//! Each mutating operation holds the room's lock for its whole
//! read-modify-write cycle. Storage failures that indicate an exhausted or
//! unreachable backing store flip the shared [`DegradedMode`] latch, after
//! which rooms are served from process-local state and every response is
//! flagged as a fallback.

use std::sync::{Arc, Mutex};

use maze_sabotage_core::{Difficulty, Direction, GameStatus, RoomState, SabotageKind};
use maze_sabotage_store::{
    DegradedMode, RoomId, RoomLocks, RoomPatch, RoomRecord, RoomStore, StoreError,
};
use maze_sabotage_system_sabotage::SabotageRejection;
use maze_sabotage_system_session::{Session, Transition};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::{Clock, CooldownLedger, InMemoryCooldownLedger};

/// Failures surfaced by room operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A sabotage request failed validation.
    #[error(transparent)]
    Rejected(#[from] SabotageRejection),
    /// The backing store failed in a way degraded mode cannot absorb.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Room state returned to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomView {
    /// Current room state.
    pub state: RoomState,
    /// Whether the state came from process-local fallback storage.
    pub fallback: bool,
}

/// Viewer count after a presence update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresenceView {
    /// Current viewer count.
    pub viewers: u32,
    /// Whether the count came from process-local fallback storage.
    pub fallback: bool,
}

/// Outcome of a sabotage precheck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecheckView {
    /// Whether the sabotage would currently be accepted.
    pub allowed: bool,
    /// Human-readable reason when refused.
    pub reason: Option<String>,
}

/// Kinds of presence updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// A new viewer joined.
    Join,
    /// An existing viewer is still watching.
    Heartbeat,
    /// A viewer left.
    Leave,
}

enum Write {
    Full(RoomRecord),
    Patch(RoomPatch),
}

struct Loaded {
    state: Option<RoomState>,
    fallback: bool,
}

/// Authoritative room operations backed by a [`RoomStore`].
#[derive(Debug)]
pub struct RoomService {
    store: Arc<dyn RoomStore>,
    degraded: Arc<DegradedMode>,
    locks: RoomLocks,
    session: Session,
    clock: Arc<dyn Clock>,
    cooldowns: Arc<dyn CooldownLedger>,
    rng: Mutex<ChaCha8Rng>,
    write_interval_secs: u32,
}

impl RoomService {
    /// Creates a service with in-memory cooldowns and a fresh degraded-mode latch.
    #[must_use]
    pub fn new(store: Arc<dyn RoomStore>, clock: Arc<dyn Clock>, rng: ChaCha8Rng) -> Self {
        Self {
            store,
            degraded: Arc::new(DegradedMode::new()),
            locks: RoomLocks::new(),
            session: Session::default(),
            clock,
            cooldowns: Arc::new(InMemoryCooldownLedger::new()),
            rng: Mutex::new(rng),
            write_interval_secs: 5,
        }
    }

    /// Shares an existing degraded-mode latch.
    #[must_use]
    pub fn with_degraded_mode(mut self, degraded: Arc<DegradedMode>) -> Self {
        self.degraded = degraded;
        self
    }

    /// Replaces the cooldown ledger.
    #[must_use]
    pub fn with_cooldowns(mut self, cooldowns: Arc<dyn CooldownLedger>) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    /// Sets how many whole seconds of decay a read tolerates before writing back.
    #[must_use]
    pub fn with_write_interval(mut self, secs: u32) -> Self {
        self.write_interval_secs = secs;
        self
    }

    /// Degraded-mode latch shared by this service.
    #[must_use]
    pub fn degraded(&self) -> &DegradedMode {
        &self.degraded
    }

    /// Registers a waiting room. Existing rooms are left untouched.
    pub fn create_room(&self, id: &RoomId) -> Result<RoomView, ServiceError> {
        self.with_room(id, || {
            let loaded = self.load(id)?;
            if let Some(state) = loaded.state {
                return Ok(RoomView {
                    state,
                    fallback: loaded.fallback,
                });
            }

            let state = RoomState::waiting(0);
            let record = RoomRecord::waiting(0, self.clock.now());
            let fallback = self.persist(id, &state, Write::Full(record), loaded.fallback)?;
            info!(room = %id, fallback, "room registered");
            Ok(RoomView { state, fallback })
        })
    }

    /// Lists registered rooms.
    pub fn list_rooms(&self) -> Result<Vec<RoomId>, ServiceError> {
        if !self.degraded.is_active() {
            match self.store.list() {
                Ok(rooms) => return Ok(rooms),
                Err(error) if error.is_degradable() => {
                    let _ = self.degraded.activate(&error);
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(self.degraded.rooms().list()?)
    }

    /// Starts a fresh game, replacing whatever the room held.
    pub fn start_game(
        &self,
        id: &RoomId,
        difficulty: Difficulty,
        wallet: Option<String>,
    ) -> Result<RoomView, ServiceError> {
        self.with_room(id, || {
            let loaded = self.load(id)?;
            let previous = match loaded.state {
                Some(state) => state,
                None => RoomState::waiting(self.unknown_room_viewers(id, loaded.fallback)?),
            };

            let now = self.clock.now();
            let transition = self.with_rng(|rng| {
                self.session
                    .start(previous, difficulty, wallet, now, rng)
            })?;
            let state = transition.state;
            let record = RoomRecord::from_state(&state)?;
            let fallback = self.persist(id, &state, Write::Full(record), loaded.fallback)?;
            info!(
                room = %id,
                %difficulty,
                enemies = state.enemies.len(),
                fallback,
                "game started"
            );
            Ok(RoomView { state, fallback })
        })
    }

    /// Returns the stored room without touching its countdown.
    pub fn peek(&self, id: &RoomId) -> Result<RoomView, ServiceError> {
        let loaded = self.load(id)?;
        let state = match loaded.state {
            Some(state) => state,
            None => RoomState::waiting(self.unknown_room_viewers(id, loaded.fallback)?),
        };
        Ok(RoomView {
            state,
            fallback: loaded.fallback,
        })
    }

    /// Returns the room with its countdown brought up to date.
    ///
    /// Unknown rooms are reported as waiting. The decayed timer is written
    /// back only once enough whole seconds have accumulated or the game ended.
    pub fn state(&self, id: &RoomId) -> Result<RoomView, ServiceError> {
        self.with_room(id, || {
            let loaded = self.load(id)?;
            let Some(state) = loaded.state else {
                let viewers = self.unknown_room_viewers(id, loaded.fallback)?;
                return Ok(RoomView {
                    state: RoomState::waiting(viewers),
                    fallback: loaded.fallback,
                });
            };

            let transition = self.session.decay(state, self.clock.now());
            let mut fallback = loaded.fallback;
            if transition.ended() || transition.decayed_secs() >= self.write_interval_secs.max(1)
            {
                let patch = RoomPatch::timer(&transition.state);
                fallback = self.persist(id, &transition.state, Write::Patch(patch), fallback)?;
            }
            Ok(RoomView {
                state: transition.state,
                fallback,
            })
        })
    }

    /// Moves the runner one cell and lets the enemies respond.
    pub fn move_player(&self, id: &RoomId, direction: Direction) -> Result<RoomView, ServiceError> {
        self.mutate(id, |state| {
            let now = self.clock.now();
            self.with_rng(|rng| self.session.move_player(state, direction, now, rng))
        })
    }

    /// Advances every enemy once and resolves collisions.
    pub fn enemy_tick(&self, id: &RoomId) -> Result<RoomView, ServiceError> {
        self.mutate(id, |state| {
            self.with_rng(|rng| self.session.enemy_tick(state, rng))
        })
    }

    /// Applies collision damage if an enemy shares the runner's cell.
    pub fn check_collision(&self, id: &RoomId) -> Result<RoomView, ServiceError> {
        self.mutate(id, |state| Ok(self.session.check_collision(state)))
    }

    /// Reports whether a sabotage would currently be accepted.
    pub fn precheck_sabotage(
        &self,
        id: &RoomId,
        kind: SabotageKind,
        viewer: &str,
    ) -> Result<PrecheckView, ServiceError> {
        let now = self.clock.now();
        let state = match self.load(id)?.state {
            Some(state) => self.session.decay(state, now).state,
            None => RoomState::waiting(0),
        };
        let cooldown = self.cooldowns.remaining(viewer, kind, now)?;

        Ok(match self.session.precheck(&state, kind, cooldown) {
            Ok(_) => PrecheckView {
                allowed: true,
                reason: None,
            },
            Err(rejection) => PrecheckView {
                allowed: false,
                reason: Some(rejection.to_string()),
            },
        })
    }

    /// Validates and applies a sabotage on behalf of `viewer`.
    pub fn sabotage(
        &self,
        id: &RoomId,
        kind: SabotageKind,
        viewer: &str,
    ) -> Result<RoomView, ServiceError> {
        self.with_room(id, || {
            let loaded = self.load(id)?;
            let Some(state) = loaded.state else {
                return Err(SabotageRejection::NotActive {
                    status: GameStatus::Waiting,
                }
                .into());
            };

            let now = self.clock.now();
            let state = self.session.decay(state, now).state;
            let cooldown = self.cooldowns.remaining(viewer, kind, now)?;
            let transition = self.session.sabotage(state, kind, cooldown)?;

            let patch = RoomPatch::gameplay(&transition.state);
            let fallback = self.persist(id, &transition.state, Write::Patch(patch), loaded.fallback)?;
            self.cooldowns.record(viewer, kind, now)?;
            info!(room = %id, %kind, viewer, fallback, "sabotage applied");
            Ok(RoomView {
                state: transition.state,
                fallback,
            })
        })
    }

    /// Records a presence update and returns the resulting viewer count.
    ///
    /// Any presence update on an unknown room registers it with one viewer.
    pub fn presence(&self, id: &RoomId, presence: Presence) -> Result<PresenceView, ServiceError> {
        self.with_room(id, || {
            let loaded = self.load(id)?;

            if loaded.fallback {
                let viewers = match presence {
                    Presence::Join => self.degraded.adjust_viewers(id, true)?,
                    Presence::Leave => self.degraded.adjust_viewers(id, false)?,
                    Presence::Heartbeat => self.degraded.viewers(id)?,
                };
                if let Some(mut state) = loaded.state {
                    state.viewers = viewers;
                    let _ = self.persist(id, &state, Write::Patch(RoomPatch::viewers(viewers)), true)?;
                }
                return Ok(PresenceView {
                    viewers,
                    fallback: true,
                });
            }

            let Some(state) = loaded.state else {
                if presence == Presence::Leave {
                    return Ok(PresenceView {
                        viewers: 0,
                        fallback: false,
                    });
                }
                let state = RoomState::waiting(1);
                let record = RoomRecord::waiting(1, self.clock.now());
                let fallback = self.persist(id, &state, Write::Full(record), false)?;
                return Ok(PresenceView {
                    viewers: 1,
                    fallback,
                });
            };

            let state = match presence {
                Presence::Join => self.session.join_viewer(state).state,
                Presence::Leave => self.session.leave_viewer(state).state,
                Presence::Heartbeat => {
                    return Ok(PresenceView {
                        viewers: state.viewers,
                        fallback: false,
                    })
                }
            };
            let patch = RoomPatch::viewers(state.viewers);
            let fallback = self.persist(id, &state, Write::Patch(patch), false)?;
            debug!(room = %id, viewers = state.viewers, ?presence, "presence updated");
            Ok(PresenceView {
                viewers: state.viewers,
                fallback,
            })
        })
    }

    fn mutate<F>(&self, id: &RoomId, operation: F) -> Result<RoomView, ServiceError>
    where
        F: FnOnce(RoomState) -> Result<Transition, ServiceError>,
    {
        self.with_room(id, || {
            let loaded = self.load(id)?;
            let Some(state) = loaded.state else {
                let viewers = self.unknown_room_viewers(id, loaded.fallback)?;
                return Ok(RoomView {
                    state: RoomState::waiting(viewers),
                    fallback: loaded.fallback,
                });
            };

            let transition = operation(state)?;
            let mut fallback = loaded.fallback;
            if !transition.is_noop() {
                let patch = RoomPatch::gameplay(&transition.state);
                fallback = self.persist(id, &transition.state, Write::Patch(patch), fallback)?;
            }
            if transition.ended() {
                info!(
                    room = %id,
                    status = ?transition.state.game_status,
                    score = transition.state.player.score,
                    "game ended"
                );
            }
            Ok(RoomView {
                state: transition.state,
                fallback,
            })
        })
    }

    fn with_room<T, F>(&self, id: &RoomId, operation: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Result<T, ServiceError>,
    {
        self.locks.with_lock(id, operation)
    }

    fn with_rng<T, F>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut ChaCha8Rng) -> T,
    {
        let mut rng = self.rng.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(operation(&mut rng))
    }

    fn unknown_room_viewers(&self, id: &RoomId, fallback: bool) -> Result<u32, ServiceError> {
        if fallback {
            Ok(self.degraded.viewers(id)?)
        } else {
            Ok(0)
        }
    }

    fn load(&self, id: &RoomId) -> Result<Loaded, ServiceError> {
        if !self.degraded.is_active() {
            match self.store.get(id) {
                Ok(record) => {
                    return Ok(Loaded {
                        state: record.map(RoomRecord::into_state).transpose()?,
                        fallback: false,
                    })
                }
                Err(error) if error.is_degradable() => {
                    let _ = self.degraded.activate(&error);
                }
                Err(error) => return Err(error.into()),
            }
        }

        let state = self
            .degraded
            .rooms()
            .get(id)?
            .map(RoomRecord::into_state)
            .transpose()?;
        Ok(Loaded {
            state,
            fallback: true,
        })
    }

    /// Writes the room, returning whether the write landed in fallback storage.
    fn persist(
        &self,
        id: &RoomId,
        state: &RoomState,
        write: Write,
        fallback: bool,
    ) -> Result<bool, ServiceError> {
        if !fallback && !self.degraded.is_active() {
            let result = match write {
                Write::Full(record) => self.store.set(id, &record),
                Write::Patch(patch) => match self.store.merge(id, &patch) {
                    Err(StoreError::NotFound(_)) => RoomRecord::from_state(state)
                        .and_then(|record| self.store.set(id, &record)),
                    other => other,
                },
            };
            match result {
                Ok(()) => return Ok(false),
                Err(error) if error.is_degradable() => {
                    let _ = self.degraded.activate(&error);
                }
                Err(error) => return Err(error.into()),
            }
        }

        let record = RoomRecord::from_state(state)?;
        self.degraded.rooms().set(id, &record)?;
        self.degraded.set_viewers(id, state.viewers)?;
        Ok(true)
    }
}
