//! Breadth-first path finding over maze grids.

use std::collections::VecDeque;

use maze_sabotage_core::{CellCoord, MazeGrid};

/// Finds a shortest 4-connected path between two cells.
///
/// Walls are always impassable; `is_blocked` marks additional impassable
/// cells such as obstacles or enemies. The returned path excludes `from` and
/// ends with `to`, so it is empty when the two cells coincide. `None` is
/// returned when either endpoint lies outside the grid or no route exists.
///
/// Neighbours are expanded east, west, south, north. Among equally short
/// routes the first one discovered in that order wins, which keeps results
/// reproducible for sabotage placement.
pub fn shortest_path<F>(
    grid: &MazeGrid,
    from: CellCoord,
    to: CellCoord,
    mut is_blocked: F,
) -> Option<Vec<CellCoord>>
where
    F: FnMut(CellCoord) -> bool,
{
    let width = grid.width();
    let height = grid.height();
    if !grid.contains(from) || !grid.contains(to) {
        return None;
    }
    if from == to {
        return Some(Vec::new());
    }

    let width_usize = usize::try_from(width).ok()?;
    let cell_count = width_usize.checked_mul(usize::try_from(height).ok()?)?;
    let mut parents: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut visited = vec![false; cell_count];

    let mut queue = VecDeque::new();
    visited[index(width_usize, from)?] = true;
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        for neighbor in neighbors(cell, width, height) {
            if !grid.is_open(neighbor) || is_blocked(neighbor) {
                continue;
            }

            let Some(neighbor_index) = index(width_usize, neighbor) else {
                continue;
            };
            if visited[neighbor_index] {
                continue;
            }

            visited[neighbor_index] = true;
            parents[neighbor_index] = Some(cell);

            if neighbor == to {
                return Some(trace_back(&parents, width_usize, from, to));
            }

            queue.push_back(neighbor);
        }
    }

    None
}

/// Reports whether any route connects `from` with `to`.
pub fn is_reachable<F>(grid: &MazeGrid, from: CellCoord, to: CellCoord, is_blocked: F) -> bool
where
    F: FnMut(CellCoord) -> bool,
{
    shortest_path(grid, from, to, is_blocked).is_some()
}

fn trace_back(
    parents: &[Option<CellCoord>],
    width: usize,
    from: CellCoord,
    to: CellCoord,
) -> Vec<CellCoord> {
    let mut path = vec![to];
    let mut cursor = to;
    while let Some(parent) = index(width, cursor).and_then(|offset| parents[offset]) {
        if parent == from {
            break;
        }
        path.push(parent);
        cursor = parent;
    }
    path.reverse();
    path
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
