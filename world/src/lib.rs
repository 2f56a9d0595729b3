#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative room state management for Maze Sabotage.
//!
//! The world owns a single [`RoomState`] and is the only place where that
//! state is mutated. Every mutation arrives as a [`Command`] and is reported
//! back as one or more [`Event`] values.

pub mod navigation;

use maze_sabotage_core::{
    CellCoord, Command, Difficulty, Direction, Enemy, EnemyId, Event, GameStatus, MazeLayout,
    MoveRejection, Obstacle, ObstacleId, Player, RoomState, SabotageEffect, Timestamp,
    COLLISION_DAMAGE, GOAL_SCORE,
};

/// Represents the authoritative state of one room.
#[derive(Clone, Debug)]
pub struct World {
    state: RoomState,
}

impl World {
    /// Creates a registered room that has no game yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RoomState::waiting(0),
        }
    }

    /// Wraps a previously persisted room state.
    #[must_use]
    pub fn from_state(state: RoomState) -> Self {
        Self { state }
    }

    /// Consumes the world, returning its room state.
    #[must_use]
    pub fn into_state(self) -> RoomState {
        self.state
    }

    fn start(
        &mut self,
        difficulty: Difficulty,
        layout: MazeLayout,
        wallet: Option<String>,
        now: Timestamp,
    ) -> usize {
        let settings = difficulty.settings();
        let enemies: Vec<Enemy> = layout
            .enemies
            .iter()
            .zip(0_u32..)
            .map(|(cell, id)| Enemy {
                id: EnemyId::new(id),
                cell: *cell,
            })
            .collect();
        let count = enemies.len();

        self.state = RoomState {
            player: Player {
                cell: layout.start,
                health: settings.health,
                speed: 1.0,
                score: 0,
            },
            enemies,
            obstacles: Vec::new(),
            goal: layout.goal,
            maze: layout.grid,
            game_status: GameStatus::Playing,
            time_left: settings.time_limit_secs,
            viewers: self.state.viewers,
            last_update: now,
            player_wallet: wallet,
            difficulty: Some(difficulty),
            last_move: None,
        };
        count
    }

    fn decay_timer(&mut self, now: Timestamp, out_events: &mut Vec<Event>) {
        if self.consume_elapsed(now, out_events) {
            self.finish(GameStatus::Lost, out_events);
        }
    }

    /// Deducts whole elapsed seconds and reports whether the clock ran out.
    fn consume_elapsed(&mut self, now: Timestamp, out_events: &mut Vec<Event>) -> bool {
        let elapsed = now.whole_seconds_since(self.state.last_update);
        if elapsed == 0 {
            return false;
        }

        let elapsed_secs = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.state.time_left = self.state.time_left.saturating_sub(elapsed_secs);
        self.state.last_update = self.state.last_update.plus_seconds(elapsed);
        out_events.push(Event::TimeDecayed {
            elapsed_secs,
            remaining_secs: self.state.time_left,
        });
        self.state.time_left == 0
    }

    fn move_player(&mut self, direction: Direction, now: Timestamp, out_events: &mut Vec<Event>) {
        let from = self.state.player.cell;
        let target = match self.check_player_target(from.step(direction)) {
            Ok(target) => target,
            Err(reason) => {
                out_events.push(Event::MoveRejected { direction, reason });
                return;
            }
        };

        self.state.player.cell = target;
        self.state.last_move = Some(direction);
        out_events.push(Event::PlayerMoved { from, to: target });

        let expired = self.consume_elapsed(now, out_events);

        // Reaching the goal beats a clock that ran out on the same move.
        if target == self.state.goal {
            self.state.player.score = self.state.player.score.saturating_add(GOAL_SCORE);
            out_events.push(Event::GoalReached {
                score: self.state.player.score,
            });
            self.finish(GameStatus::Won, out_events);
            return;
        }
        if expired {
            self.finish(GameStatus::Lost, out_events);
            return;
        }

        self.resolve_collisions(out_events);
    }

    fn check_player_target(&self, target: Option<CellCoord>) -> Result<CellCoord, MoveRejection> {
        let target = target
            .filter(|cell| self.state.maze.contains(*cell))
            .ok_or(MoveRejection::OutOfBounds)?;
        if !self.state.maze.is_open(target) {
            return Err(MoveRejection::Wall);
        }
        if self.state.has_obstacle(target) {
            return Err(MoveRejection::Obstacle);
        }
        Ok(target)
    }

    fn step_enemy(&mut self, enemy: EnemyId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(from) = self
            .state
            .enemies
            .iter()
            .find(|candidate| candidate.id == enemy)
            .map(|candidate| candidate.cell)
        else {
            return;
        };

        let Some(target) = from.step(direction) else {
            return;
        };
        if !query::enemy_can_enter(&self.state, target, enemy) {
            return;
        }

        if let Some(slot) = self
            .state
            .enemies
            .iter_mut()
            .find(|candidate| candidate.id == enemy)
        {
            slot.cell = target;
            out_events.push(Event::EnemyAdvanced {
                enemy,
                from,
                to: target,
            });
        }
    }

    fn resolve_collisions(&mut self, out_events: &mut Vec<Event>) {
        if self.state.enemy_at(self.state.player.cell).is_some() {
            self.damage_player(COLLISION_DAMAGE, out_events);
        }
    }

    fn damage_player(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        self.state.player.health = self.state.player.health.saturating_sub(amount);
        out_events.push(Event::PlayerDamaged {
            amount,
            health: self.state.player.health,
        });
        if self.state.player.health == 0 {
            self.finish(GameStatus::Lost, out_events);
        }
    }

    fn apply_sabotage(&mut self, effect: SabotageEffect, out_events: &mut Vec<Event>) {
        match effect {
            SabotageEffect::DrainTime { seconds } => {
                self.state.time_left = self.state.time_left.saturating_sub(seconds);
                out_events.push(Event::TimeDrained {
                    seconds,
                    remaining_secs: self.state.time_left,
                });
                if self.state.time_left == 0 {
                    self.finish(GameStatus::Lost, out_events);
                }
            }
            SabotageEffect::PlaceObstacle { cell } => {
                let next = u32::try_from(self.state.obstacles.len()).unwrap_or(u32::MAX);
                let obstacle = ObstacleId::new(next);
                self.state.obstacles.push(Obstacle { id: obstacle, cell });
                out_events.push(Event::ObstaclePlaced { obstacle, cell });
            }
            SabotageEffect::DamagePlayer { amount } => self.damage_player(amount, out_events),
            SabotageEffect::SpawnEnemy { cell } => {
                let enemy = self
                    .state
                    .enemies
                    .iter()
                    .map(|existing| existing.id.get().saturating_add(1))
                    .max()
                    .map_or(EnemyId::new(0), EnemyId::new);
                self.state.enemies.push(Enemy { id: enemy, cell });
                out_events.push(Event::EnemySpawned { enemy, cell });
            }
        }
    }

    fn finish(&mut self, status: GameStatus, out_events: &mut Vec<Event>) {
        if self.state.game_status.is_terminal() {
            return;
        }
        self.state.game_status = status;
        out_events.push(Event::GameEnded { status });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Gameplay commands are only honoured while the room is playing; otherwise
/// the world reports [`Event::CommandIgnored`] and leaves the state untouched.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartGame {
            difficulty,
            layout,
            wallet,
            now,
        } => {
            let enemies = world.start(difficulty, layout, wallet, now);
            out_events.push(Event::GameStarted {
                difficulty,
                enemies,
            });
        }
        Command::JoinViewer => {
            world.state.viewers = world.state.viewers.saturating_add(1);
            out_events.push(Event::ViewersChanged {
                viewers: world.state.viewers,
            });
        }
        Command::LeaveViewer => {
            world.state.viewers = world.state.viewers.saturating_sub(1);
            out_events.push(Event::ViewersChanged {
                viewers: world.state.viewers,
            });
        }
        Command::DecayTimer { now } => {
            if world.state.is_playing() {
                world.decay_timer(now, out_events);
            }
        }
        _ if !world.state.is_playing() => {
            out_events.push(Event::CommandIgnored {
                status: world.state.game_status,
            });
        }
        Command::MovePlayer { direction, now } => world.move_player(direction, now, out_events),
        Command::StepEnemy { enemy, direction } => world.step_enemy(enemy, direction, out_events),
        Command::ResolveCollisions => world.resolve_collisions(out_events),
        Command::ApplySabotage { effect } => world.apply_sabotage(effect, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use maze_sabotage_core::{CellCoord, EnemyId, RoomState};

    /// Provides read-only access to the room state.
    #[must_use]
    pub fn room(world: &World) -> &RoomState {
        &world.state
    }

    /// Reports whether the runner may stand on the provided cell.
    #[must_use]
    pub fn player_can_enter(state: &RoomState, cell: CellCoord) -> bool {
        state.maze.is_open(cell) && !state.has_obstacle(cell)
    }

    /// Reports whether `enemy` may step onto the provided cell.
    ///
    /// Enemies never enter walls, obstacles, or cells held by another enemy.
    #[must_use]
    pub fn enemy_can_enter(state: &RoomState, cell: CellCoord, enemy: EnemyId) -> bool {
        player_can_enter(state, cell)
            && !state
                .enemies
                .iter()
                .any(|other| other.id != enemy && other.cell == cell)
    }

    /// Reports whether the cell is impassable for path finding that treats
    /// both obstacles and enemies as blocking.
    #[must_use]
    pub fn is_occupied(state: &RoomState, cell: CellCoord) -> bool {
        state.has_obstacle(cell) || state.enemy_at(cell).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_sabotage_core::{Cell, MazeGrid, SabotageEffect};

    fn corridor_layout() -> MazeLayout {
        let mut grid = MazeGrid::walled(7, 3);
        for column in 1..=5 {
            grid.set(CellCoord::new(column, 1), Cell::Open);
        }
        MazeLayout {
            grid,
            start: CellCoord::new(1, 1),
            goal: CellCoord::new(5, 1),
            enemies: vec![CellCoord::new(4, 1)],
        }
    }

    fn started_world(now: u64) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::StartGame {
                difficulty: Difficulty::Medium,
                layout: corridor_layout(),
                wallet: Some("wallet".to_owned()),
                now: Timestamp::from_millis(now),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::GameStarted {
                difficulty: Difficulty::Medium,
                enemies: 1
            }]
        );
        world
    }

    #[test]
    fn start_applies_difficulty_settings() {
        let world = started_world(0);
        let state = query::room(&world);

        assert_eq!(state.game_status, GameStatus::Playing);
        assert_eq!(state.player.health, 100);
        assert_eq!(state.time_left, 120);
        assert_eq!(state.player.cell, CellCoord::new(1, 1));
        assert_eq!(state.enemies[0].id, EnemyId::new(0));
    }

    #[test]
    fn move_into_wall_is_rejected_without_changes() {
        let mut world = started_world(0);
        let before = query::room(&world).clone();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::North,
                now: Timestamp::from_millis(5_000),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::MoveRejected {
                direction: Direction::North,
                reason: MoveRejection::Wall
            }]
        );
        assert_eq!(query::room(&world), &before);
    }

    #[test]
    fn accepted_move_decays_whole_seconds() {
        let mut world = started_world(0);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::East,
                now: Timestamp::from_millis(2_500),
            },
            &mut events,
        );

        let state = query::room(&world);
        assert_eq!(state.player.cell, CellCoord::new(2, 1));
        assert_eq!(state.time_left, 118);
        assert_eq!(state.last_update, Timestamp::from_millis(2_000));
        assert_eq!(state.last_move, Some(Direction::East));
    }

    #[test]
    fn stepping_onto_enemy_costs_health() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        for _ in 0..3 {
            apply(
                &mut world,
                Command::MovePlayer {
                    direction: Direction::East,
                    now: Timestamp::from_millis(0),
                },
                &mut events,
            );
        }

        assert!(events.contains(&Event::PlayerDamaged {
            amount: COLLISION_DAMAGE,
            health: 75
        }));
        assert_eq!(query::room(&world).player.health, 75);
    }

    #[test]
    fn reaching_goal_wins_and_freezes_the_room() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        for _ in 0..4 {
            apply(
                &mut world,
                Command::MovePlayer {
                    direction: Direction::East,
                    now: Timestamp::from_millis(0),
                },
                &mut events,
            );
        }

        let state = query::room(&world).clone();
        assert_eq!(state.game_status, GameStatus::Won);
        assert_eq!(state.player.score, GOAL_SCORE);

        events.clear();
        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::West,
                now: Timestamp::from_millis(10_000),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::CommandIgnored {
                status: GameStatus::Won
            }]
        );
        assert_eq!(query::room(&world), &state);
    }

    #[test]
    fn goal_reached_as_the_clock_runs_out_still_wins() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        for _ in 0..3 {
            apply(
                &mut world,
                Command::MovePlayer {
                    direction: Direction::East,
                    now: Timestamp::from_millis(0),
                },
                &mut events,
            );
        }

        events.clear();
        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::East,
                now: Timestamp::from_millis(120_000),
            },
            &mut events,
        );

        let state = query::room(&world);
        assert_eq!(state.player.cell, CellCoord::new(5, 1));
        assert_eq!(state.time_left, 0);
        assert_eq!(state.game_status, GameStatus::Won);
        assert_eq!(state.player.score, GOAL_SCORE);
        assert!(!events.contains(&Event::GameEnded {
            status: GameStatus::Lost
        }));
    }

    #[test]
    fn move_that_outlasts_the_clock_loses() {
        let mut world = started_world(0);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::East,
                now: Timestamp::from_millis(121_000),
            },
            &mut events,
        );

        let state = query::room(&world);
        assert_eq!(state.player.cell, CellCoord::new(2, 1));
        assert_eq!(state.game_status, GameStatus::Lost);
        assert_eq!(
            events.last(),
            Some(&Event::GameEnded {
                status: GameStatus::Lost
            })
        );
    }

    #[test]
    fn timer_expiry_loses_the_game() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DecayTimer {
                now: Timestamp::from_millis(500_000),
            },
            &mut events,
        );

        assert_eq!(query::room(&world).time_left, 0);
        assert_eq!(query::room(&world).game_status, GameStatus::Lost);
        assert!(events.contains(&Event::GameEnded {
            status: GameStatus::Lost
        }));
    }

    #[test]
    fn enemies_refuse_walls_and_each_other() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplySabotage {
                effect: SabotageEffect::SpawnEnemy {
                    cell: CellCoord::new(3, 1),
                },
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StepEnemy {
                enemy: EnemyId::new(0),
                direction: Direction::West,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StepEnemy {
                enemy: EnemyId::new(1),
                direction: Direction::North,
            },
            &mut events,
        );

        let state = query::room(&world);
        assert_eq!(state.enemies[0].cell, CellCoord::new(4, 1));
        assert_eq!(state.enemies[1].cell, CellCoord::new(3, 1));
        assert_eq!(state.enemies[1].id, EnemyId::new(1));
    }

    #[test]
    fn viewer_count_never_goes_negative() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::LeaveViewer, &mut events);
        apply(&mut world, Command::JoinViewer, &mut events);

        assert_eq!(query::room(&world).viewers, 1);
        assert_eq!(
            events,
            vec![
                Event::ViewersChanged { viewers: 0 },
                Event::ViewersChanged { viewers: 1 }
            ]
        );
    }

    #[test]
    fn obstacles_block_the_runner() {
        let mut world = started_world(0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplySabotage {
                effect: SabotageEffect::PlaceObstacle {
                    cell: CellCoord::new(2, 1),
                },
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::East,
                now: Timestamp::from_millis(0),
            },
            &mut events,
        );

        assert_eq!(
            events.last(),
            Some(&Event::MoveRejected {
                direction: Direction::East,
                reason: MoveRejection::Obstacle
            })
        );
    }
}
