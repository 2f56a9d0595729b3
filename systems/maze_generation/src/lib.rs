#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maze generation system producing solvable grids and initial enemy spawns.
//!
//! Generation runs a randomized depth-first backtracker over odd-indexed
//! cells, carves the corridor cells of the first row and the last column so
//! the goal always joins the spanning tree, and then knocks out extra walls
//! to add loops. All randomness flows through the caller's [`Rng`].

use maze_sabotage_core::{Cell, CellCoord, Difficulty, MazeGrid, MazeLayout, START_CELL};
use rand::Rng;

const CARVE_OFFSETS: [(i64, i64); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];
const EXTRA_CONNECTION_ATTEMPT_FACTOR: u32 = 10;

/// Configuration parameters controlling enemy placement.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    placement_attempts: u32,
    enemy_spread: u32,
}

impl Config {
    /// Creates a configuration with the provided attempt budget per enemy and
    /// the per-axis separation two enemies must exceed.
    #[must_use]
    pub const fn new(placement_attempts: u32, enemy_spread: u32) -> Self {
        Self {
            placement_attempts,
            enemy_spread,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(50, 3)
    }
}

/// Pure system that generates mazes and places the initial enemies.
#[derive(Debug, Default)]
pub struct MazeGenerator {
    config: Config,
}

impl MazeGenerator {
    /// Creates a generator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Generates the full layout for a new game at the given difficulty.
    pub fn generate_layout<R: Rng + ?Sized>(
        &self,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> MazeLayout {
        let settings = difficulty.settings();
        let grid = generate(
            settings.width,
            settings.height,
            settings.extra_connections,
            rng,
        );
        let goal = settings.goal();
        let enemies = self.place_enemies(&grid, START_CELL, goal, settings.enemy_count, rng);

        MazeLayout {
            grid,
            start: START_CELL,
            goal,
            enemies,
        }
    }

    /// Picks up to `count` open interior cells for enemies.
    ///
    /// Candidates must avoid the start and goal and must not sit within
    /// `enemy_spread` cells of an already placed enemy on both axes.
    /// Placement is best effort: an enemy whose attempts run out is skipped.
    pub fn place_enemies<R: Rng + ?Sized>(
        &self,
        grid: &MazeGrid,
        start: CellCoord,
        goal: CellCoord,
        count: usize,
        rng: &mut R,
    ) -> Vec<CellCoord> {
        let mut placed: Vec<CellCoord> = Vec::with_capacity(count);
        if grid.width() < 5 || grid.height() < 5 {
            return placed;
        }

        let columns = 2..grid.width() - 2;
        let rows = 2..grid.height() - 2;
        for _ in 0..count {
            for _ in 0..self.config.placement_attempts {
                let candidate =
                    CellCoord::new(rng.gen_range(columns.clone()), rng.gen_range(rows.clone()));
                if self.accepts(grid, start, goal, &placed, candidate) {
                    placed.push(candidate);
                    break;
                }
            }
        }
        placed
    }

    fn accepts(
        &self,
        grid: &MazeGrid,
        start: CellCoord,
        goal: CellCoord,
        placed: &[CellCoord],
        candidate: CellCoord,
    ) -> bool {
        let spread = self.config.enemy_spread;
        grid.is_open(candidate)
            && candidate != start
            && candidate != goal
            && placed.iter().all(|other| {
                other.column().abs_diff(candidate.column()) >= spread
                    || other.row().abs_diff(candidate.row()) >= spread
            })
    }
}

/// Generates a solvable maze of the given dimensions.
///
/// The outer border is always wall, `(1, 1)` and `(width - 2, height - 2)` are
/// always open, and the two are connected. Up to `extra_connections` interior
/// walls separating two open cells on opposite sides are removed afterwards.
pub fn generate<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    extra_connections: u32,
    rng: &mut R,
) -> MazeGrid {
    let mut grid = MazeGrid::walled(width, height);
    if width < 3 || height < 3 {
        return grid;
    }

    carve_passages(&mut grid, rng);

    let goal = CellCoord::new(width - 2, height - 2);
    grid.set(START_CELL, Cell::Open);
    grid.set(goal, Cell::Open);
    for column in (1..width - 2).step_by(2) {
        grid.set(CellCoord::new(column, 1), Cell::Open);
    }
    for row in (1..height - 2).step_by(2) {
        grid.set(CellCoord::new(width - 2, row), Cell::Open);
    }

    add_connections(&mut grid, extra_connections, rng);
    grid
}

fn carve_passages<R: Rng + ?Sized>(grid: &mut MazeGrid, rng: &mut R) {
    let width = i64::from(grid.width());
    let height = i64::from(grid.height());
    let mut visited = vec![false; grid.cell_count()];
    let mut stack: Vec<CellCoord> = Vec::new();

    let mut current = START_CELL;
    grid.set(current, Cell::Open);
    mark(grid, &mut visited, current);

    loop {
        let mut candidates = [None; 4];
        let mut count = 0;
        for (dx, dy) in CARVE_OFFSETS {
            let column = i64::from(current.column()) + dx;
            let row = i64::from(current.row()) + dy;
            if column <= 0 || column >= width - 1 || row <= 0 || row >= height - 1 {
                continue;
            }
            let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                continue;
            };
            let next = CellCoord::new(column, row);
            if is_visited(grid, &visited, next) {
                continue;
            }
            candidates[count] = Some(next);
            count += 1;
        }

        if count > 0 {
            let Some(next) = candidates[rng.gen_range(0..count)] else {
                break;
            };
            let between = CellCoord::new(
                (current.column() + next.column()) / 2,
                (current.row() + next.row()) / 2,
            );
            grid.set(between, Cell::Open);
            grid.set(next, Cell::Open);
            mark(grid, &mut visited, next);
            stack.push(current);
            current = next;
        } else if let Some(previous) = stack.pop() {
            current = previous;
        } else {
            break;
        }
    }
}

fn add_connections<R: Rng + ?Sized>(grid: &mut MazeGrid, extra_connections: u32, rng: &mut R) {
    let width = grid.width();
    let height = grid.height();
    let attempts = extra_connections.saturating_mul(EXTRA_CONNECTION_ATTEMPT_FACTOR);
    let mut added = 0;
    let mut tries = 0;

    while added < extra_connections && tries < attempts {
        tries += 1;
        let cell = CellCoord::new(rng.gen_range(1..width - 1), rng.gen_range(1..height - 1));
        if grid.is_open(cell) {
            continue;
        }

        let open = |column: u32, row: u32| grid.is_open(CellCoord::new(column, row));
        let (column, row) = (cell.column(), cell.row());
        let bridges_horizontally = open(column - 1, row) && open(column + 1, row);
        let bridges_vertically = open(column, row - 1) && open(column, row + 1);

        if bridges_horizontally || bridges_vertically {
            grid.set(cell, Cell::Open);
            added += 1;
        }
    }
}

fn mark(grid: &MazeGrid, visited: &mut [bool], cell: CellCoord) {
    if let Some(slot) = grid.index(cell).and_then(|index| visited.get_mut(index)) {
        *slot = true;
    }
}

fn is_visited(grid: &MazeGrid, visited: &[bool], cell: CellCoord) -> bool {
    grid.index(cell)
        .and_then(|index| visited.get(index).copied())
        .unwrap_or(true)
}
