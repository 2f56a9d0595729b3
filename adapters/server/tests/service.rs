use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use maze_sabotage_core::{Difficulty, Direction, GameStatus, SabotageKind, Timestamp};
use maze_sabotage_server::{ManualClock, Presence, RoomService, ServiceError};
use maze_sabotage_store::{
    DegradedMode, InMemoryRoomStore, RoomId, RoomPatch, RoomRecord, RoomStore, StoreError,
};
use maze_sabotage_system_sabotage::SabotageRejection;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Store that reports itself unreachable while `down` is set.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: InMemoryRoomStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn outage(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl RoomStore for FlakyStore {
    fn get(&self, id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
        self.outage()?;
        self.inner.get(id)
    }

    fn set(&self, id: &RoomId, record: &RoomRecord) -> Result<(), StoreError> {
        self.outage()?;
        self.inner.set(id, record)
    }

    fn merge(&self, id: &RoomId, patch: &RoomPatch) -> Result<(), StoreError> {
        self.outage()?;
        self.inner.merge(id, patch)
    }

    fn list(&self) -> Result<Vec<RoomId>, StoreError> {
        self.outage()?;
        self.inner.list()
    }
}

fn room(id: &str) -> RoomId {
    RoomId::new(id).expect("room id")
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Timestamp::from_millis(5_000_000)))
}

fn service(store: Arc<dyn RoomStore>, clock: Arc<ManualClock>) -> RoomService {
    RoomService::new(store, clock, ChaCha8Rng::seed_from_u64(11))
}

#[test]
fn outage_switches_to_the_local_cache() {
    let store = Arc::new(FlakyStore::default());
    let service = service(Arc::clone(&store) as Arc<dyn RoomStore>, clock());
    let alpha = room("alpha");

    let started = service
        .start_game(&alpha, Difficulty::Easy, None)
        .expect("start");
    assert!(!started.fallback);

    store.down.store(true, Ordering::SeqCst);
    let lost = service.state(&alpha).expect("state");
    assert!(lost.fallback);
    assert_eq!(lost.state.game_status, GameStatus::Waiting);
    assert!(service.degraded().is_active());

    let restarted = service
        .start_game(&alpha, Difficulty::Easy, None)
        .expect("restart");
    assert!(restarted.fallback);

    store.down.store(false, Ordering::SeqCst);
    let cached = service.state(&alpha).expect("state");
    assert!(cached.fallback);
    assert_eq!(cached.state.game_status, GameStatus::Playing);
    assert_eq!(service.list_rooms().expect("list"), vec![alpha]);
}

#[test]
fn degraded_latch_is_shared_between_services() {
    let degraded = Arc::new(DegradedMode::new());
    let failing = FlakyStore::default();
    failing.down.store(true, Ordering::SeqCst);
    let first = service(Arc::new(failing), clock()).with_degraded_mode(Arc::clone(&degraded));
    let second = service(Arc::new(InMemoryRoomStore::new()), clock())
        .with_degraded_mode(Arc::clone(&degraded));

    let view = first.create_room(&room("alpha")).expect("create");
    assert!(view.fallback);

    let view = second.create_room(&room("beta")).expect("create");
    assert!(view.fallback);
    assert!(second.degraded().is_active());
}

#[test]
fn presence_is_approximated_while_degraded() {
    let failing = FlakyStore::default();
    failing.down.store(true, Ordering::SeqCst);
    let service = service(Arc::new(failing), clock());
    let lobby = room("lobby");

    let joined = service.presence(&lobby, Presence::Join).expect("join");
    assert_eq!(joined.viewers, 1);
    assert!(joined.fallback);
    let _ = service.presence(&lobby, Presence::Join).expect("join");

    let beat = service.presence(&lobby, Presence::Heartbeat).expect("beat");
    assert_eq!(beat.viewers, 2);

    let left = service.presence(&lobby, Presence::Leave).expect("leave");
    assert_eq!(left.viewers, 1);
    assert!(left.fallback);
}

#[test]
fn rejected_moves_are_not_written() {
    let store = InMemoryRoomStore::with_write_quota(1);
    let service = service(Arc::new(store.clone()), clock());
    let alpha = room("alpha");
    let _ = service
        .start_game(&alpha, Difficulty::Medium, None)
        .expect("start");

    let view = service
        .move_player(&alpha, Direction::North)
        .expect("move");

    assert!(!view.fallback);
    assert_eq!(view.state.player.cell, maze_sabotage_core::START_CELL);
    assert_eq!(store.remaining_writes(), Some(0));
}

#[test]
fn reads_write_back_once_the_interval_elapsed() {
    let clock = clock();
    let store = InMemoryRoomStore::with_write_quota(10);
    let service = service(Arc::new(store.clone()), Arc::clone(&clock)).with_write_interval(5);
    let alpha = room("alpha");
    let _ = service
        .start_game(&alpha, Difficulty::Medium, None)
        .expect("start");
    assert_eq!(store.remaining_writes(), Some(9));

    clock.advance(Duration::from_secs(2));
    assert_eq!(service.state(&alpha).expect("state").state.time_left, 118);
    assert_eq!(store.remaining_writes(), Some(9));

    clock.advance(Duration::from_secs(4));
    assert_eq!(service.state(&alpha).expect("state").state.time_left, 114);
    assert_eq!(store.remaining_writes(), Some(8));

    let peeked = service.peek(&alpha).expect("peek");
    assert_eq!(peeked.state.time_left, 114);
}

#[test]
fn cooldowns_are_tracked_per_viewer() {
    let clock = clock();
    let service = service(Arc::new(InMemoryRoomStore::new()), Arc::clone(&clock));
    let alpha = room("alpha");
    let _ = service
        .start_game(&alpha, Difficulty::Medium, None)
        .expect("start");

    let view = service
        .sabotage(&alpha, SabotageKind::Slow, "alice")
        .expect("slow");
    assert_eq!(view.state.time_left, 110);

    let again = service.sabotage(&alpha, SabotageKind::Slow, "alice");
    assert!(matches!(
        again,
        Err(ServiceError::Rejected(SabotageRejection::OnCooldown {
            remaining_secs: 10
        }))
    ));

    let view = service
        .sabotage(&alpha, SabotageKind::Slow, "bob")
        .expect("slow");
    assert_eq!(view.state.time_left, 100);

    clock.advance(Duration::from_secs(10));
    let check = service
        .precheck_sabotage(&alpha, SabotageKind::Slow, "alice")
        .expect("precheck");
    assert!(check.allowed);

    let view = service
        .sabotage(&alpha, SabotageKind::Slow, "alice")
        .expect("slow");
    assert_eq!(view.state.time_left, 80);
}

#[test]
fn sabotage_on_unknown_room_is_refused() {
    let service = service(Arc::new(InMemoryRoomStore::new()), clock());

    let result = service.sabotage(&room("ghost"), SabotageKind::Damage, "alice");

    assert!(matches!(
        result,
        Err(ServiceError::Rejected(SabotageRejection::NotActive { .. }))
    ));
}
