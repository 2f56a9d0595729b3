//! Plain-text rendering of generated layouts.

use std::fmt::Write as _;

use maze_sabotage_core::{CellCoord, MazeLayout};

const WALL: char = '#';
const OPEN: char = ' ';
const START: char = 'S';
const GOAL: char = 'G';
const ENEMY: char = 'E';

/// Renders `layout` as one text line per maze row.
pub(crate) fn render_layout(layout: &MazeLayout) -> String {
    let grid = &layout.grid;
    let mut out = String::with_capacity(grid.cell_count() + grid.height() as usize);
    for row in 0..grid.height() {
        for column in 0..grid.width() {
            let cell = CellCoord::new(column, row);
            let glyph = if cell == layout.start {
                START
            } else if cell == layout.goal {
                GOAL
            } else if layout.enemies.contains(&cell) {
                ENEMY
            } else if grid.is_open(cell) {
                OPEN
            } else {
                WALL
            };
            out.push(glyph);
        }
        let _ = writeln!(out);
    }
    out
}
