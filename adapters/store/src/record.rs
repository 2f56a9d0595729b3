//! Persisted room document layout.

use maze_sabotage_core::{
    CellCoord, Difficulty, Direction, Enemy, GameStatus, MazeGrid, Obstacle, Player, RoomState,
    Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Room document as stored in the backing store.
///
/// The maze is kept as a JSON-encoded string of rows; decoding it back into a
/// [`MazeGrid`] happens only in [`RoomRecord::into_state`]. Fields that a
/// waiting room does not have are optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Lifecycle status.
    pub game_status: GameStatus,
    /// Number of viewers.
    #[serde(default)]
    pub viewers: u32,
    /// The runner, absent until a game starts.
    #[serde(default)]
    pub player: Option<Player>,
    /// Enemies in stable order.
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    /// Obstacles in placement order.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Goal cell.
    #[serde(default)]
    pub goal: Option<CellCoord>,
    /// JSON-encoded maze rows.
    #[serde(default)]
    pub maze: Option<String>,
    /// Seconds remaining.
    #[serde(default)]
    pub time_left: u32,
    /// Wall-clock time of the last timer tick.
    #[serde(default)]
    pub last_update: Option<Timestamp>,
    /// Wallet address of the runner.
    #[serde(default)]
    pub player_wallet: Option<String>,
    /// Preset the game was started with.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Direction of the last accepted move.
    #[serde(default)]
    pub last_move: Option<Direction>,
    /// Time the room document was first written.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl RoomRecord {
    /// Document for a freshly registered room.
    #[must_use]
    pub fn waiting(viewers: u32, created_at: Timestamp) -> Self {
        Self {
            game_status: GameStatus::Waiting,
            viewers,
            player: None,
            enemies: Vec::new(),
            obstacles: Vec::new(),
            goal: None,
            maze: None,
            time_left: 0,
            last_update: None,
            player_wallet: None,
            difficulty: None,
            last_move: None,
            created_at: Some(created_at),
        }
    }

    /// Encodes a full room state.
    pub fn from_state(state: &RoomState) -> Result<Self, StoreError> {
        if state.game_status == GameStatus::Waiting && state.difficulty.is_none() {
            return Ok(Self {
                created_at: None,
                ..Self::waiting(state.viewers, state.last_update)
            });
        }

        let maze =
            serde_json::to_string(&state.maze).map_err(|error| StoreError::Corrupt(error.to_string()))?;
        Ok(Self {
            game_status: state.game_status,
            viewers: state.viewers,
            player: Some(state.player.clone()),
            enemies: state.enemies.clone(),
            obstacles: state.obstacles.clone(),
            goal: Some(state.goal),
            maze: Some(maze),
            time_left: state.time_left,
            last_update: Some(state.last_update),
            player_wallet: state.player_wallet.clone(),
            difficulty: state.difficulty,
            last_move: state.last_move,
            created_at: None,
        })
    }

    /// Decodes the document into a room state.
    ///
    /// Documents without a maze decode to a waiting room. A document that
    /// carries a maze but lacks the runner or goal is corrupt.
    pub fn into_state(self) -> Result<RoomState, StoreError> {
        let Some(encoded) = self.maze else {
            return Ok(RoomState::waiting(self.viewers));
        };

        let maze: MazeGrid = serde_json::from_str(&encoded)
            .map_err(|error| StoreError::Corrupt(format!("maze: {error}")))?;
        let player = self
            .player
            .ok_or_else(|| StoreError::Corrupt("missing player".to_owned()))?;
        let goal = self
            .goal
            .ok_or_else(|| StoreError::Corrupt("missing goal".to_owned()))?;

        Ok(RoomState {
            player,
            enemies: self.enemies,
            obstacles: self.obstacles,
            goal,
            maze,
            game_status: self.game_status,
            time_left: self.time_left,
            viewers: self.viewers,
            last_update: self.last_update.unwrap_or_default(),
            player_wallet: self.player_wallet,
            difficulty: self.difficulty,
            last_move: self.last_move,
        })
    }

    /// Applies the present fields of a patch.
    pub fn merge(&mut self, patch: &RoomPatch) {
        if let Some(player) = &patch.player {
            self.player = Some(player.clone());
        }
        if let Some(enemies) = &patch.enemies {
            self.enemies = enemies.clone();
        }
        if let Some(obstacles) = &patch.obstacles {
            self.obstacles = obstacles.clone();
        }
        if let Some(status) = patch.game_status {
            self.game_status = status;
        }
        if let Some(viewers) = patch.viewers {
            self.viewers = viewers;
        }
        if let Some(time_left) = patch.time_left {
            self.time_left = time_left;
        }
        if let Some(last_update) = patch.last_update {
            self.last_update = Some(last_update);
        }
        if let Some(last_move) = patch.last_move {
            self.last_move = Some(last_move);
        }
    }
}

/// Partial update of a room document. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    /// Replacement runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
    /// Replacement enemy list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<Enemy>>,
    /// Replacement obstacle list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacles: Option<Vec<Obstacle>>,
    /// Replacement status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_status: Option<GameStatus>,
    /// Replacement viewer count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewers: Option<u32>,
    /// Replacement countdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    /// Replacement timer anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<Timestamp>,
    /// Replacement last move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<Direction>,
}

impl RoomPatch {
    /// Patch carrying every field gameplay may change.
    #[must_use]
    pub fn gameplay(state: &RoomState) -> Self {
        Self {
            player: Some(state.player.clone()),
            enemies: Some(state.enemies.clone()),
            obstacles: Some(state.obstacles.clone()),
            game_status: Some(state.game_status),
            viewers: None,
            time_left: Some(state.time_left),
            last_update: Some(state.last_update),
            last_move: state.last_move,
        }
    }

    /// Patch carrying only the countdown and status.
    #[must_use]
    pub fn timer(state: &RoomState) -> Self {
        Self {
            game_status: Some(state.game_status),
            time_left: Some(state.time_left),
            last_update: Some(state.last_update),
            ..Self::default()
        }
    }

    /// Patch carrying only the viewer count.
    #[must_use]
    pub fn viewers(viewers: u32) -> Self {
        Self {
            viewers: Some(viewers),
            ..Self::default()
        }
    }
}
