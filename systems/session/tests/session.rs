use std::time::Duration;

use maze_sabotage_core::{
    CellCoord, Difficulty, Direction, Enemy, EnemyId, Event, GameStatus, MoveRejection,
    RoomState, SabotageKind, Timestamp, GOAL_SCORE,
};
use maze_sabotage_system_sabotage::SabotageRejection;
use maze_sabotage_system_session::Session;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn started(seed: u64) -> RoomState {
    let session = Session::default();
    session
        .start(
            RoomState::waiting(2),
            Difficulty::Medium,
            Some("0xrunner".to_owned()),
            Timestamp::from_millis(1_000),
            &mut ChaCha8Rng::seed_from_u64(seed),
        )
        .state
}

#[test]
fn medium_start_produces_fresh_game() {
    let state = started(1);

    assert_eq!(state.game_status, GameStatus::Playing);
    assert_eq!(state.player.cell, CellCoord::new(1, 1));
    assert_eq!(state.goal, CellCoord::new(33, 23));
    assert_eq!(state.player.health, 100);
    assert_eq!(state.time_left, 120);
    assert_eq!(state.viewers, 2);
    assert_eq!(state.difficulty, Some(Difficulty::Medium));
    assert_eq!(state.player_wallet.as_deref(), Some("0xrunner"));
    assert!(!state.enemies.is_empty() && state.enemies.len() <= 3);
    assert!(state.obstacles.is_empty());
}

#[test]
fn move_into_border_is_rejected_unchanged() {
    let session = Session::default();
    let state = started(2);
    let transition = session.move_player(
        state.clone(),
        Direction::North,
        Timestamp::from_millis(9_000),
        &mut ChaCha8Rng::seed_from_u64(0),
    );

    assert_eq!(transition.state, state);
    assert_eq!(
        transition.events,
        vec![Event::MoveRejected {
            direction: Direction::North,
            reason: MoveRejection::Wall
        }]
    );
}

#[test]
fn reaching_goal_wins_and_later_moves_are_ignored() {
    let session = Session::default();
    let mut state = started(3);
    state.enemies.clear();
    let (approach, direction) = [
        (CellCoord::new(32, 23), Direction::East),
        (CellCoord::new(33, 22), Direction::South),
    ]
    .into_iter()
    .find(|(cell, _)| state.maze.is_open(*cell))
    .expect("goal has an open neighbour");
    state.player.cell = approach;

    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let won = session
        .move_player(state, direction, Timestamp::from_millis(1_000), &mut rng)
        .state;
    assert_eq!(won.game_status, GameStatus::Won);
    assert_eq!(won.player.score, GOAL_SCORE);

    let after = session.move_player(
        won.clone(),
        Direction::West,
        Timestamp::from_millis(60_000),
        &mut rng,
    );
    assert_eq!(after.state, won);
    assert!(after.is_noop());
}

#[test]
fn decay_counts_whole_seconds_only() {
    let session = Session::default();
    let state = started(5);

    let first = session.decay(state, Timestamp::from_millis(6_500));
    assert_eq!(first.state.time_left, 115);
    assert_eq!(first.decayed_secs(), 5);

    let second = session.decay(first.state, Timestamp::from_millis(6_900));
    assert_eq!(second.state.time_left, 115);
    assert_eq!(second.decayed_secs(), 0);

    let third = session.decay(second.state, Timestamp::from_millis(7_000));
    assert_eq!(third.state.time_left, 114);
}

#[test]
fn timer_running_out_loses_the_game() {
    let session = Session::default();
    let transition = session.decay(started(6), Timestamp::from_millis(200_000));

    assert_eq!(transition.state.time_left, 0);
    assert_eq!(transition.state.game_status, GameStatus::Lost);
    assert!(transition.ended());
}

#[test]
fn slow_sabotage_drains_ten_seconds_until_the_floor() {
    let session = Session::default();
    let slowed = session
        .sabotage(started(7), SabotageKind::Slow, Duration::ZERO)
        .expect("slow allowed");
    assert_eq!(slowed.state.time_left, 110);

    let mut low = slowed.state;
    low.time_left = 10;
    assert_eq!(
        session.sabotage(low, SabotageKind::Slow, Duration::ZERO),
        Err(SabotageRejection::TimeTooLow { floor_secs: 15 })
    );
}

#[test]
fn collision_at_low_health_loses_the_game() {
    let session = Session::default();
    let mut state = started(8);
    state.player.health = 25;
    state.enemies = vec![Enemy {
        id: EnemyId::new(0),
        cell: state.player.cell,
    }];

    let transition = session.check_collision(state);
    assert_eq!(transition.state.player.health, 0);
    assert_eq!(transition.state.game_status, GameStatus::Lost);
}

#[test]
fn enemy_tick_is_inert_outside_play() {
    let session = Session::default();
    let waiting = RoomState::waiting(0);
    let transition = session.enemy_tick(waiting.clone(), &mut ChaCha8Rng::seed_from_u64(9));

    assert_eq!(transition.state, waiting);
    assert!(transition.events.is_empty());
}

#[test]
fn restart_keeps_viewers_and_clears_obstacles() {
    let session = Session::default();
    let blocked = session
        .sabotage(started(10), SabotageKind::Block, Duration::ZERO)
        .map(|transition| transition.state)
        .unwrap_or_else(|_| started(10));
    let restarted = session
        .start(
            blocked,
            Difficulty::Easy,
            None,
            Timestamp::from_millis(50_000),
            &mut ChaCha8Rng::seed_from_u64(11),
        )
        .state;

    assert_eq!(restarted.viewers, 2);
    assert!(restarted.obstacles.is_empty());
    assert_eq!(restarted.player.health, 150);
    assert_eq!(restarted.time_left, 180);
}

#[test]
fn viewer_presence_is_clamped_at_zero() {
    let session = Session::default();
    let state = session.leave_viewer(RoomState::waiting(0)).state;
    assert_eq!(state.viewers, 0);

    let state = session.join_viewer(state).state;
    assert_eq!(state.viewers, 1);
}
