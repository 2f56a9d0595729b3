#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy behaviour system that proposes one step per enemy per tick.
//!
//! Each enemy either chases the runner along the dominant axis or wanders in
//! a random cardinal direction. The wander probability is higher when the
//! enemy is already adjacent to the runner so that contact is not constant.
//! Enemies are processed in stable order and later enemies observe the
//! moves proposed for earlier ones.

use maze_sabotage_core::{CellCoord, Command, Direction, EnemyId, RoomState};
use maze_sabotage_world::query;
use rand::Rng;

/// Configuration parameters for the enemy behaviour.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    close_wander_probability: f64,
    far_wander_probability: f64,
}

impl Config {
    /// Creates a configuration using the provided wander probabilities for
    /// enemies adjacent to the runner and for enemies further away.
    #[must_use]
    pub const fn new(close_wander_probability: f64, far_wander_probability: f64) -> Self {
        Self {
            close_wander_probability,
            far_wander_probability,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0.8, 0.3)
    }
}

/// Pure system that reads a room snapshot and emits enemy step commands.
#[derive(Debug, Default)]
pub struct EnemyAi {
    config: Config,
}

impl EnemyAi {
    /// Creates a new enemy system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Emits at most one [`Command::StepEnemy`] per enemy.
    ///
    /// Nothing is emitted unless the room is playing. Every proposed step is
    /// a single cardinal move onto an open, unobstructed cell not held by
    /// another enemy.
    pub fn handle<R: Rng + ?Sized>(&self, room: &RoomState, rng: &mut R, out: &mut Vec<Command>) {
        if !room.is_playing() {
            return;
        }

        let mut positions: Vec<(EnemyId, CellCoord)> = room
            .enemies
            .iter()
            .map(|enemy| (enemy.id, enemy.cell))
            .collect();

        for index in 0..positions.len() {
            let (enemy, cell) = positions[index];
            if let Some(direction) = self.choose_step(room, &positions, index, rng) {
                if let Some(target) = cell.step(direction) {
                    positions[index].1 = target;
                    out.push(Command::StepEnemy { enemy, direction });
                }
            }
        }
    }

    fn choose_step<R: Rng + ?Sized>(
        &self,
        room: &RoomState,
        positions: &[(EnemyId, CellCoord)],
        index: usize,
        rng: &mut R,
    ) -> Option<Direction> {
        let (_, cell) = positions[index];
        let player = room.player.cell;
        let close = cell.manhattan_distance(player) <= 1;
        let wander_probability = if close {
            self.config.close_wander_probability
        } else {
            self.config.far_wander_probability
        };
        let chasing = rng.gen::<f64>() > wander_probability && !close;

        let direction = if chasing {
            chase_direction(cell, player)
        } else {
            random_direction(rng)
        };
        if can_enter(room, positions, index, direction) {
            return Some(direction);
        }

        // A blocked chase gets one random retry.
        if chasing {
            let fallback = random_direction(rng);
            if can_enter(room, positions, index, fallback) {
                return Some(fallback);
            }
        }

        None
    }
}

fn chase_direction(from: CellCoord, to: CellCoord) -> Direction {
    let dx = i64::from(to.column()) - i64::from(from.column());
    let dy = i64::from(to.row()) - i64::from(from.row());
    if dx.abs() > dy.abs() {
        if dx > 0 {
            Direction::East
        } else {
            Direction::West
        }
    } else if dy > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

fn can_enter(
    room: &RoomState,
    positions: &[(EnemyId, CellCoord)],
    index: usize,
    direction: Direction,
) -> bool {
    let (_, cell) = positions[index];
    let Some(target) = cell.step(direction) else {
        return false;
    };
    query::player_can_enter(room, target)
        && positions
            .iter()
            .enumerate()
            .all(|(other, (_, occupied))| other == index || *occupied != target)
}
