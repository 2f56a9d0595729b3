#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Sabotage validation system.
//!
//! Viewers purchase sabotage actions against the runner. Before any effect is
//! applied, the validator checks the room status, the viewer's cooldown, and
//! the kind-specific safety rules, then resolves the concrete
//! [`SabotageEffect`]. The validator never mutates state; the world applies
//! the returned effect.

use std::time::Duration;

use maze_sabotage_core::{
    CellCoord, GameStatus, RoomState, SabotageEffect, SabotageKind, SABOTAGE_DAMAGE,
    SLOW_PENALTY_SECS,
};
use maze_sabotage_world::{navigation, query};
use thiserror::Error;

/// Reasons a sabotage request may be refused.
///
/// The `Display` output is the human-readable reason surfaced to viewers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SabotageRejection {
    /// The room is not currently playing.
    #[error("Game not found or not active.")]
    NotActive {
        /// Status the room was in.
        status: GameStatus,
    },
    /// The viewer used this sabotage kind too recently.
    #[error("Sabotage is cooling down, {remaining_secs}s remaining.")]
    OnCooldown {
        /// Whole seconds until the kind is available again, rounded up.
        remaining_secs: u64,
    },
    /// The countdown already reached zero.
    #[error("Cannot slow, time is already zero.")]
    TimeExhausted,
    /// The countdown is at or below the slow floor.
    #[error("Cannot slow, {floor_secs} seconds or less left.")]
    TimeTooLow {
        /// Countdown at or below which a slow is refused.
        floor_secs: u32,
    },
    /// No route from the runner to the goal exists at all.
    #[error("No path from the player to the goal exists.")]
    MazeUnsolvable,
    /// The runner's path offers no cell that may be blocked.
    #[error("No valid cell to block.")]
    NoCellToBlock,
    /// Blocking the candidate cell would seal the goal off.
    #[error("Blocking this path would leave no way to the goal.")]
    WouldSealGoal,
    /// The runner's health is at or below the damage floor.
    #[error("Player health is too low to damage further.")]
    HealthTooLow,
    /// No cell ahead of the runner can host a new enemy.
    #[error("No valid cell to spawn enemy.")]
    NoSpawnCell,
}

/// Configuration parameters for sabotage validation.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    slow_floor_secs: u32,
    damage_floor: u32,
    block_index: usize,
    spawn_lookahead: usize,
}

impl Config {
    /// Creates a configuration.
    ///
    /// `slow_floor_secs` is the countdown at or below which a slow is refused,
    /// `damage_floor` the health at or below which damage is refused,
    /// `block_index` the preferred path index for a new obstacle, and
    /// `spawn_lookahead` how many path cells ahead an enemy may spawn.
    #[must_use]
    pub const fn new(
        slow_floor_secs: u32,
        damage_floor: u32,
        block_index: usize,
        spawn_lookahead: usize,
    ) -> Self {
        Self {
            slow_floor_secs,
            damage_floor,
            block_index,
            spawn_lookahead,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(15, 30, 2, 3)
    }
}

/// Pure system validating sabotage requests against a room snapshot.
#[derive(Debug, Default)]
pub struct SabotageValidator {
    config: Config,
}

impl SabotageValidator {
    /// Creates a validator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Checks whether `kind` may be applied and resolves its effect.
    ///
    /// `cooldown_remaining` is how long the requesting viewer must still wait
    /// before using this kind again.
    pub fn precheck(
        &self,
        room: &RoomState,
        kind: SabotageKind,
        cooldown_remaining: Duration,
    ) -> Result<SabotageEffect, SabotageRejection> {
        if !room.is_playing() {
            return Err(SabotageRejection::NotActive {
                status: room.game_status,
            });
        }
        if !cooldown_remaining.is_zero() {
            let remaining_secs = cooldown_remaining
                .as_secs()
                .saturating_add(u64::from(cooldown_remaining.subsec_nanos() > 0));
            return Err(SabotageRejection::OnCooldown { remaining_secs });
        }

        match kind {
            SabotageKind::Slow => self.check_slow(room),
            SabotageKind::Block => self.check_block(room),
            SabotageKind::Damage => self.check_damage(room),
            SabotageKind::Enemy => self.check_spawn(room),
        }
    }

    fn check_slow(&self, room: &RoomState) -> Result<SabotageEffect, SabotageRejection> {
        if room.time_left == 0 {
            return Err(SabotageRejection::TimeExhausted);
        }
        if room.time_left <= self.config.slow_floor_secs {
            return Err(SabotageRejection::TimeTooLow {
                floor_secs: self.config.slow_floor_secs,
            });
        }
        Ok(SabotageEffect::DrainTime {
            seconds: SLOW_PENALTY_SECS,
        })
    }

    fn check_block(&self, room: &RoomState) -> Result<SabotageEffect, SabotageRejection> {
        let path = navigation::shortest_path(&room.maze, room.player.cell, room.goal, |cell| {
            room.has_obstacle(cell)
        })
        .ok_or(SabotageRejection::MazeUnsolvable)?;

        let Some(cell) = pick(&path, self.config.block_index) else {
            return Err(SabotageRejection::NoCellToBlock);
        };
        if cell == room.goal || cell == room.player.cell {
            return Err(SabotageRejection::NoCellToBlock);
        }

        let still_solvable =
            navigation::is_reachable(&room.maze, room.player.cell, room.goal, |candidate| {
                candidate == cell || room.has_obstacle(candidate)
            });
        if !still_solvable {
            return Err(SabotageRejection::WouldSealGoal);
        }

        Ok(SabotageEffect::PlaceObstacle { cell })
    }

    fn check_damage(&self, room: &RoomState) -> Result<SabotageEffect, SabotageRejection> {
        if room.player.health <= self.config.damage_floor {
            return Err(SabotageRejection::HealthTooLow);
        }
        Ok(SabotageEffect::DamagePlayer {
            amount: SABOTAGE_DAMAGE,
        })
    }

    fn check_spawn(&self, room: &RoomState) -> Result<SabotageEffect, SabotageRejection> {
        let path = navigation::shortest_path(&room.maze, room.player.cell, room.goal, |cell| {
            query::is_occupied(room, cell)
        })
        .ok_or(SabotageRejection::NoSpawnCell)?;

        let player = room.player.cell;
        let ahead = path
            .iter()
            .take(self.config.spawn_lookahead)
            .skip(1)
            .copied()
            .find(|cell| *cell != player && *cell != room.goal);

        let cell = ahead
            .or_else(|| pick(&path, self.config.block_index))
            .ok_or(SabotageRejection::NoSpawnCell)?;
        if cell == player || cell == room.goal {
            return Err(SabotageRejection::NoSpawnCell);
        }

        Ok(SabotageEffect::SpawnEnemy { cell })
    }
}

/// Cell at `index` along the path, clamped to the last cell.
fn pick(path: &[CellCoord], index: usize) -> Option<CellCoord> {
    let last = path.len().checked_sub(1)?;
    path.get(index.min(last)).copied()
}
