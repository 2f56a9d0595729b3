#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Sabotage engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative room world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then reports [`Event`] values
//! describing what actually changed. Systems read immutable [`RoomState`]
//! snapshots and respond exclusively with new command batches.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health removed from the runner every time a collision with an enemy is detected.
pub const COLLISION_DAMAGE: u32 = 25;

/// Score awarded when the runner reaches the goal cell.
pub const GOAL_SCORE: u64 = 1_000;

/// Seconds removed from the timer by a `slow` sabotage.
pub const SLOW_PENALTY_SECS: u32 = 10;

/// Health removed by a `damage` sabotage.
pub const SABOTAGE_DAMAGE: u32 = 25;

/// Cell the runner spawns on for every generated maze.
pub const START_CELL: CellCoord = CellCoord::new(1, 1);

/// Commands that express all permissible room mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the room contents with a freshly generated game.
    StartGame {
        /// Difficulty preset chosen by the runner.
        difficulty: Difficulty,
        /// Maze, start, goal and enemy spawn cells produced by the generator.
        layout: MazeLayout,
        /// Wallet address of the runner, if one was supplied.
        wallet: Option<String>,
        /// Wall-clock time at which the game starts.
        now: Timestamp,
    },
    /// Recomputes the countdown from the wall-clock time elapsed since the last tick.
    DecayTimer {
        /// Current wall-clock time.
        now: Timestamp,
    },
    /// Requests that the runner advance a single cell.
    MovePlayer {
        /// Direction of travel for the attempted step.
        direction: Direction,
        /// Wall-clock time at which the move was requested.
        now: Timestamp,
    },
    /// Requests that an enemy advance a single cell.
    StepEnemy {
        /// Identifier of the enemy attempting to move.
        enemy: EnemyId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Applies collision damage if any enemy shares the runner's cell.
    ResolveCollisions,
    /// Applies the effect of a sabotage that already passed validation.
    ApplySabotage {
        /// Effect to apply.
        effect: SabotageEffect,
    },
    /// Records that a new viewer joined the room.
    JoinViewer,
    /// Records that a viewer left the room.
    LeaveViewer,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a new game replaced the room contents.
    GameStarted {
        /// Difficulty preset applied to the game.
        difficulty: Difficulty,
        /// Number of enemies that were placed in the maze.
        enemies: usize,
    },
    /// Reports that whole seconds were removed from the countdown.
    TimeDecayed {
        /// Whole seconds consumed by this decay.
        elapsed_secs: u32,
        /// Seconds remaining after the decay.
        remaining_secs: u32,
    },
    /// Confirms that the runner moved between two cells.
    PlayerMoved {
        /// Cell the runner occupied before moving.
        from: CellCoord,
        /// Cell the runner occupies after the move.
        to: CellCoord,
    },
    /// Reports that a runner move was refused and the state left untouched.
    MoveRejected {
        /// Direction that was requested.
        direction: Direction,
        /// Specific reason the move failed.
        reason: MoveRejection,
    },
    /// Confirms that an enemy moved between two cells.
    EnemyAdvanced {
        /// Identifier of the enemy that advanced.
        enemy: EnemyId,
        /// Cell the enemy occupied before moving.
        from: CellCoord,
        /// Cell the enemy occupies after the move.
        to: CellCoord,
    },
    /// Reports that the runner lost health.
    PlayerDamaged {
        /// Health removed by this event.
        amount: u32,
        /// Health remaining afterwards.
        health: u32,
    },
    /// Confirms that the runner stepped onto the goal.
    GoalReached {
        /// Score after the goal bonus was awarded.
        score: u64,
    },
    /// Announces that the game entered a terminal status.
    GameEnded {
        /// Terminal status that became active.
        status: GameStatus,
    },
    /// Confirms that an obstacle was placed by a sabotage.
    ObstaclePlaced {
        /// Identifier assigned to the obstacle.
        obstacle: ObstacleId,
        /// Cell the obstacle occupies.
        cell: CellCoord,
    },
    /// Confirms that an enemy was added by a sabotage.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Cell the enemy occupies.
        cell: CellCoord,
    },
    /// Reports that a sabotage removed time from the countdown.
    TimeDrained {
        /// Seconds removed.
        seconds: u32,
        /// Seconds remaining afterwards.
        remaining_secs: u32,
    },
    /// Reports the viewer count after a presence change.
    ViewersChanged {
        /// Current number of viewers.
        viewers: u32,
    },
    /// Reports that a gameplay command arrived while the room was not playing.
    CommandIgnored {
        /// Status the room was in when the command arrived.
        status: GameStatus,
    },
}

/// Reasons a runner move may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The target cell lies outside the maze.
    OutOfBounds,
    /// The target cell is a wall.
    Wall,
    /// The target cell holds a sabotage obstacle.
    Obstacle,
}

/// Effect of a validated sabotage, ready to be applied by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SabotageEffect {
    /// Removes seconds from the countdown, floored at zero.
    DrainTime {
        /// Seconds to remove.
        seconds: u32,
    },
    /// Places an obstacle on the provided cell.
    PlaceObstacle {
        /// Cell that becomes impassable.
        cell: CellCoord,
    },
    /// Removes health from the runner, floored at zero.
    DamagePlayer {
        /// Health to remove.
        amount: u32,
    },
    /// Adds a new enemy on the provided cell.
    SpawnEnemy {
        /// Cell the new enemy occupies.
        cell: CellCoord,
    },
}

/// Cardinal movement directions available to the runner and enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row offsets applied by a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Resolves a unit delta into a direction.
    ///
    /// Exactly one component must be `-1` or `1` and the other `0`; anything
    /// else (including diagonals and the zero delta) yields `None`.
    #[must_use]
    pub const fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, 1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }
}

/// Location of a single maze cell expressed as column and row coordinates.
///
/// Serialized as `{ "x": column, "y": row }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    #[serde(rename = "x")]
    column: u32,
    #[serde(rename = "y")]
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Cell reached by a single step in `direction`, or `None` when the step
    /// would leave the non-negative quadrant.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.delta();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(CellCoord::new(column, row))
    }
}

/// State of a single maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Traversable floor.
    Open,
    /// Impassable wall.
    Wall,
}

/// Failure raised while decoding a persisted maze grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MazeDecodeError {
    /// The grid contained no rows or no columns.
    #[error("maze grid is empty")]
    Empty,
    /// A row did not match the width of the first row.
    #[error("maze row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width found on the offending row.
        found: usize,
    },
    /// A cell held a value other than `0` (open) or `1` (wall).
    #[error("maze cell ({column}, {row}) holds unknown value {value}")]
    UnknownCell {
        /// Column of the offending cell.
        column: usize,
        /// Row of the offending cell.
        row: usize,
        /// Raw value found.
        value: u8,
    },
}

/// Dense row-major grid of maze cells.
///
/// Serialized as an array of rows where `0` marks an open cell and `1` a wall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct MazeGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl MazeGrid {
    /// Creates a grid of the provided dimensions where every cell is a wall.
    #[must_use]
    pub fn walled(width: u32, height: u32) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![Cell::Wall; capacity],
        }
    }

    /// Creates an empty zero-sized grid, used by rooms that have not started.
    #[must_use]
    pub fn empty() -> Self {
        Self::walled(0, 0)
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Returns the cell state, or `None` when the coordinate is out of bounds.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<Cell> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell is inside the grid and open.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.cell(cell) == Some(Cell::Open)
    }

    /// Overwrites a cell. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, cell: CellCoord, value: Cell) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = value;
            }
        }
    }

    /// Row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

impl TryFrom<Vec<Vec<u8>>> for MazeGrid {
    type Error = MazeDecodeError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        let expected = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || expected == 0 {
            return Err(MazeDecodeError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(MazeDecodeError::Ragged {
                    row: row_index,
                    expected,
                    found: row.len(),
                });
            }
            for (column_index, value) in row.iter().enumerate() {
                let cell = match value {
                    0 => Cell::Open,
                    1 => Cell::Wall,
                    other => {
                        return Err(MazeDecodeError::UnknownCell {
                            column: column_index,
                            row: row_index,
                            value: *other,
                        })
                    }
                };
                cells.push(cell);
            }
        }

        let width = u32::try_from(expected).map_err(|_| MazeDecodeError::Empty)?;
        let height = u32::try_from(rows.len()).map_err(|_| MazeDecodeError::Empty)?;
        Ok(Self {
            width,
            height,
            cells,
        })
    }
}

impl From<MazeGrid> for Vec<Vec<u8>> {
    fn from(grid: MazeGrid) -> Self {
        let width = usize::try_from(grid.width).unwrap_or(0).max(1);
        grid.cells
            .chunks(width)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Open => 0,
                        Cell::Wall => 1,
                    })
                    .collect()
            })
            .collect()
    }
}

/// Maze plus the fixed cells produced by the generator for a new game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeLayout {
    /// Generated grid.
    pub grid: MazeGrid,
    /// Cell the runner starts on.
    pub start: CellCoord,
    /// Cell the runner must reach.
    pub goal: CellCoord,
    /// Spawn cells for the initial enemies, in placement order.
    pub enemies: Vec<CellCoord>,
}

/// Difficulty presets offered to the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Small, open maze with a generous timer.
    Easy,
    /// Default preset.
    Medium,
    /// Large maze, more enemies, short timer.
    Hard,
}

impl Difficulty {
    /// Every preset in ascending order of difficulty.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Fixed tuning constants for the preset.
    #[must_use]
    pub const fn settings(self) -> DifficultySettings {
        match self {
            Self::Easy => DifficultySettings {
                width: 25,
                height: 20,
                extra_connections: 25,
                enemy_count: 2,
                health: 150,
                time_limit_secs: 180,
            },
            Self::Medium => DifficultySettings {
                width: 35,
                height: 25,
                extra_connections: 18,
                enemy_count: 3,
                health: 100,
                time_limit_secs: 120,
            },
            Self::Hard => DifficultySettings {
                width: 40,
                height: 28,
                extra_connections: 12,
                enemy_count: 4,
                health: 75,
                time_limit_secs: 90,
            },
        }
    }

    /// Lowercase identifier used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parses a preset name, falling back to [`Difficulty::Medium`] for
    /// anything unrecognised.
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(UnknownVariant(value.to_owned())),
        }
    }
}

/// Identifier that did not match any known variant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown identifier `{0}`")]
pub struct UnknownVariant(pub String);

/// Tuning constants attached to a [`Difficulty`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultySettings {
    /// Maze width in cells, including the border.
    pub width: u32,
    /// Maze height in cells, including the border.
    pub height: u32,
    /// Extra walls removed after the perfect-maze pass.
    pub extra_connections: u32,
    /// Number of enemies the generator attempts to place.
    pub enemy_count: usize,
    /// Starting and maximum runner health.
    pub health: u32,
    /// Countdown length in seconds.
    pub time_limit_secs: u32,
}

impl DifficultySettings {
    /// Goal cell for mazes generated with these settings.
    #[must_use]
    pub const fn goal(&self) -> CellCoord {
        CellCoord::new(self.width.saturating_sub(2), self.height.saturating_sub(2))
    }
}

/// Lifecycle status of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Room is registered but no game has been started.
    Waiting,
    /// Game in progress.
    Playing,
    /// Runner reached the goal.
    Won,
    /// Runner ran out of health or time.
    Lost,
}

impl GameStatus {
    /// Reports whether the status accepts no further gameplay mutations.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Milliseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wraps a raw millisecond count.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Raw millisecond count.
    #[must_use]
    pub const fn millis(&self) -> u64 {
        self.0
    }

    /// Whole seconds elapsed since `earlier`, zero when `earlier` is in the future.
    #[must_use]
    pub const fn whole_seconds_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0) / 1_000
    }

    /// Timestamp advanced by whole seconds.
    #[must_use]
    pub const fn plus_seconds(&self, seconds: u64) -> Self {
        Self(self.0.saturating_add(seconds.saturating_mul(1_000)))
    }
}

/// The runner controlled by the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Cell the runner occupies.
    #[serde(flatten)]
    pub cell: CellCoord,
    /// Remaining health.
    pub health: u32,
    /// Cosmetic speed multiplier consumed by renderers.
    pub speed: f32,
    /// Accumulated score.
    pub score: u64,
}

/// An enemy roaming the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    /// Identifier stable for the room's lifetime.
    pub id: EnemyId,
    /// Cell the enemy occupies.
    #[serde(flatten)]
    pub cell: CellCoord,
}

/// A sabotage obstacle blocking a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Identifier assigned when the obstacle was placed.
    pub id: ObstacleId,
    /// Cell the obstacle blocks.
    #[serde(flatten)]
    pub cell: CellCoord,
}

/// Authoritative aggregate describing one room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    /// The runner.
    pub player: Player,
    /// Enemies in stable order.
    pub enemies: Vec<Enemy>,
    /// Obstacles in placement order. Never shrinks during play.
    pub obstacles: Vec<Obstacle>,
    /// Goal cell fixed at room creation.
    pub goal: CellCoord,
    /// Generated maze, immutable after the game starts.
    pub maze: MazeGrid,
    /// Current lifecycle status.
    pub game_status: GameStatus,
    /// Seconds remaining on the countdown.
    pub time_left: u32,
    /// Number of viewers watching the room.
    pub viewers: u32,
    /// Wall-clock time of the last timer tick.
    pub last_update: Timestamp,
    /// Wallet address of the runner.
    pub player_wallet: Option<String>,
    /// Preset the game was started with.
    pub difficulty: Option<Difficulty>,
    /// Direction of the last accepted runner move.
    pub last_move: Option<Direction>,
}

impl RoomState {
    /// Creates the placeholder state of a registered room without a game.
    #[must_use]
    pub fn waiting(viewers: u32) -> Self {
        Self {
            player: Player {
                cell: START_CELL,
                health: 0,
                speed: 1.0,
                score: 0,
            },
            enemies: Vec::new(),
            obstacles: Vec::new(),
            goal: START_CELL,
            maze: MazeGrid::empty(),
            game_status: GameStatus::Waiting,
            time_left: 0,
            viewers,
            last_update: Timestamp::default(),
            player_wallet: None,
            difficulty: None,
            last_move: None,
        }
    }

    /// Reports whether the room accepts gameplay mutations.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.game_status == GameStatus::Playing
    }

    /// Reports whether an obstacle blocks the provided cell.
    #[must_use]
    pub fn has_obstacle(&self, cell: CellCoord) -> bool {
        self.obstacles.iter().any(|obstacle| obstacle.cell == cell)
    }

    /// Returns the enemy standing on the provided cell, if any.
    #[must_use]
    pub fn enemy_at(&self, cell: CellCoord) -> Option<EnemyId> {
        self.enemies
            .iter()
            .find(|enemy| enemy.cell == cell)
            .map(|enemy| enemy.id)
    }
}

/// Sabotage actions viewers can purchase against the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SabotageKind {
    /// Removes time from the countdown.
    Slow,
    /// Places an obstacle on the runner's path.
    Block,
    /// Removes health from the runner.
    Damage,
    /// Spawns an enemy ahead of the runner.
    Enemy,
}

impl SabotageKind {
    /// Every sabotage kind in catalog order.
    pub const ALL: [SabotageKind; 4] = [
        SabotageKind::Slow,
        SabotageKind::Block,
        SabotageKind::Damage,
        SabotageKind::Enemy,
    ];

    /// Lowercase identifier used on the wire.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Block => "block",
            Self::Damage => "damage",
            Self::Enemy => "enemy",
        }
    }

    /// Display name shown to viewers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Slow => "Slow Down",
            Self::Block => "Block Path",
            Self::Damage => "Damage",
            Self::Enemy => "Spawn Enemy",
        }
    }

    /// Short description shown to viewers and handed to classifiers.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Slow => "Remove time from the runner's clock",
            Self::Block => "Place obstacle near player",
            Self::Damage => "Reduce player health",
            Self::Enemy => "Spawn enemy near player",
        }
    }

    /// Token price charged by the ledger.
    #[must_use]
    pub const fn cost(self) -> u64 {
        match self {
            Self::Slow => 50,
            Self::Block => 75,
            Self::Damage => 100,
            Self::Enemy => 125,
        }
    }

    /// Minimum delay between two executions of this kind by one viewer.
    #[must_use]
    pub const fn cooldown(self) -> Duration {
        match self {
            Self::Slow => Duration::from_secs(10),
            Self::Block => Duration::from_secs(15),
            Self::Damage => Duration::from_secs(12),
            Self::Enemy => Duration::from_secs(20),
        }
    }

    /// Keyword match used when no external classifier is available.
    ///
    /// Keywords are checked in a fixed order so overlapping phrases resolve
    /// deterministically: `enemy`, `block`, `slow`, then `damage`/`health`.
    #[must_use]
    pub fn classify_keywords(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.contains("enemy") {
            Some(Self::Enemy)
        } else if text.contains("block") {
            Some(Self::Block)
        } else if text.contains("slow") {
            Some(Self::Slow)
        } else if text.contains("damage") || text.contains("health") {
            Some(Self::Damage)
        } else {
            None
        }
    }
}

impl fmt::Display for SabotageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SabotageKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownVariant(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, Difficulty, Direction, GameStatus, MazeDecodeError, MazeGrid, SabotageKind,
        Timestamp,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(33, 23));
    }

    #[test]
    fn status_and_kind_round_trip_through_bincode() {
        assert_round_trip(&GameStatus::Lost);
        assert_round_trip(&SabotageKind::Block);
        assert_round_trip(&Difficulty::Hard);
    }

    #[test]
    fn cell_coord_serializes_as_x_and_y() {
        let json = serde_json::to_value(CellCoord::new(3, 7)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "x": 3, "y": 7 }));
    }

    #[test]
    fn step_refuses_negative_coordinates() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(origin.step(Direction::North), None);
        assert_eq!(origin.step(Direction::West), None);
        assert_eq!(origin.step(Direction::East), Some(CellCoord::new(1, 0)));
        assert_eq!(origin.step(Direction::South), Some(CellCoord::new(0, 1)));
    }

    #[test]
    fn from_delta_accepts_only_unit_cardinal_steps() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(direction));
        }
        assert_eq!(Direction::from_delta(0, 0), None);
        assert_eq!(Direction::from_delta(1, 1), None);
        assert_eq!(Direction::from_delta(2, 0), None);
    }

    #[test]
    fn difficulty_presets_match_published_table() {
        let rows: Vec<_> = Difficulty::ALL
            .into_iter()
            .map(|difficulty| {
                let s = difficulty.settings();
                (
                    s.width,
                    s.height,
                    s.extra_connections,
                    s.enemy_count,
                    s.health,
                    s.time_limit_secs,
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                (25, 20, 25, 2, 150, 180),
                (35, 25, 18, 3, 100, 120),
                (40, 28, 12, 4, 75, 90),
            ]
        );
        assert_eq!(Difficulty::Medium.settings().goal(), CellCoord::new(33, 23));
    }

    #[test]
    fn unknown_difficulty_falls_back_to_medium() {
        assert_eq!(Difficulty::parse_or_default("HARD"), Difficulty::Hard);
        assert_eq!(Difficulty::parse_or_default("nightmare"), Difficulty::Medium);
    }

    #[test]
    fn maze_grid_serializes_as_rows_of_bits() {
        let mut grid = MazeGrid::walled(3, 2);
        grid.set(CellCoord::new(1, 0), super::Cell::Open);
        let json = serde_json::to_string(&grid).expect("serialize");
        assert_eq!(json, "[[1,0,1],[1,1,1]]");

        let decoded: MazeGrid = serde_json::from_str(&json).expect("decode");
        assert!(decoded.is_open(CellCoord::new(1, 0)));
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn ragged_maze_rows_are_rejected() {
        let rows: Vec<Vec<u8>> = vec![vec![1, 1, 1], vec![1, 0]];
        assert_eq!(
            MazeGrid::try_from(rows),
            Err(MazeDecodeError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn sabotage_catalog_exposes_costs_and_cooldowns() {
        let costs: Vec<_> = SabotageKind::ALL.iter().map(|kind| kind.cost()).collect();
        assert_eq!(costs, vec![50, 75, 100, 125]);
        assert_eq!(SabotageKind::Enemy.cooldown().as_secs(), 20);
        assert_eq!("BLOCK".parse::<SabotageKind>(), Ok(SabotageKind::Block));
        assert!("teleport".parse::<SabotageKind>().is_err());
    }

    #[test]
    fn keyword_classifier_prefers_enemy_over_block() {
        assert_eq!(
            SabotageKind::classify_keywords("Send an ENEMY to block them"),
            Some(SabotageKind::Enemy)
        );
        assert_eq!(
            SabotageKind::classify_keywords("hurt their health"),
            Some(SabotageKind::Damage)
        );
        assert_eq!(SabotageKind::classify_keywords("dance"), None);
    }

    #[test]
    fn whole_seconds_since_floors_partial_seconds() {
        let earlier = Timestamp::from_millis(10_000);
        assert_eq!(Timestamp::from_millis(12_999).whole_seconds_since(earlier), 2);
        assert_eq!(Timestamp::from_millis(9_000).whole_seconds_since(earlier), 0);
    }
}
