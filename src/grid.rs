//! Occupancy grid and placement search.
//!
//! Converts the committed card set into a boolean occupancy matrix, answers
//! "can this footprint go here" queries, and finds the nearest free placement
//! by breadth-first expansion. Everything here is rebuilt per evaluation and
//! never persisted.

use std::collections::{HashSet, VecDeque};

use crate::constants::{BFS_ROW_OVERSCAN, BFS_STEP_LIMIT, OCCUPANCY_HEADROOM_ROWS};
use crate::types::{Card, GridPos, GridRect, Units};

/// Maps a pixel offset inside the grid to the cell it falls in, clamped to
/// non-negative indices.
pub fn to_grid_xy(left: f32, top: f32, unit: f32, gap: f32) -> GridPos {
    let cell = unit + gap;
    let x = (left / cell).floor().max(0.0) as i32;
    let y = (top / cell).floor().max(0.0) as i32;
    GridPos::new(x, y)
}

/// A boolean occupancy matrix over grid cells.
///
/// Rows beyond the matrix are implicitly free: the grid extends downward
/// without bound, so lookups past the last row treat those cells as empty.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cells: Vec<Vec<bool>>,
    columns: i32,
}

impl OccupancyGrid {
    /// Builds the matrix from a set of cards. Rows span the tallest occupied
    /// row plus headroom; an empty card set yields a single free row.
    pub fn build(cards: &[Card], columns: i32) -> Self {
        Self::build_refs(&cards.iter().collect::<Vec<_>>(), columns)
    }

    /// [`build`](Self::build) over borrowed cards, for callers that filter
    /// the committed list first.
    pub fn build_refs(cards: &[&Card], columns: i32) -> Self {
        let columns = columns.max(1);
        let mut max_y = 0;
        for card in cards {
            max_y = max_y.max(card.rect().bottom());
        }
        let rows = (max_y + OCCUPANCY_HEADROOM_ROWS).max(1) as usize;
        let mut grid = Self {
            cells: vec![vec![false; columns as usize]; rows],
            columns,
        };
        for card in cards {
            grid.mark_rect(card.rect());
        }
        grid
    }

    /// Number of rows currently materialized.
    pub fn rows(&self) -> i32 {
        self.cells.len() as i32
    }

    /// Column count.
    pub fn columns(&self) -> i32 {
        self.columns
    }

    /// Marks every cell of `rect` that falls inside the matrix as occupied.
    /// Cells outside the matrix are ignored rather than grown into.
    pub fn mark_rect(&mut self, rect: GridRect) {
        for dy in 0..rect.h {
            let gy = rect.y + dy;
            if gy < 0 {
                continue;
            }
            let Some(row) = self.cells.get_mut(gy as usize) else {
                continue;
            };
            for dx in 0..rect.w {
                let gx = rect.x + dx;
                if gx >= 0 && gx < self.columns {
                    row[gx as usize] = true;
                }
            }
        }
    }

    /// Tests whether a `w`x`h` footprint fits at `(x, y)`.
    ///
    /// Fails for negative coordinates or footprints that cross the right
    /// edge. Rows below the matrix count as free, so placements may extend
    /// the grid downward.
    pub fn can_place(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        if x < 0 || y < 0 || x + w > self.columns {
            return false;
        }
        for dy in 0..h {
            let Some(row) = self.cells.get((y + dy) as usize) else {
                continue;
            };
            for dx in 0..w {
                if row[(x + dx) as usize] {
                    return false;
                }
            }
        }
        true
    }

    /// Convenience form of [`can_place`](Self::can_place) taking a rectangle.
    pub fn can_place_rect(&self, rect: GridRect) -> bool {
        self.can_place(rect.x, rect.y, rect.w, rect.h)
    }

    /// Finds the closest free placement for `size` starting from `start`,
    /// expanding over the 4-neighborhood in up/down/left/right order.
    ///
    /// The search probes up to [`BFS_ROW_OVERSCAN`] rows past the matrix and
    /// gives up after `limit` dequeues, returning `None` when no reachable
    /// placement exists within the budget.
    pub fn bfs_nearest(&self, start: GridPos, size: Units, limit: usize) -> Option<GridPos> {
        let mut queue: VecDeque<GridPos> = VecDeque::new();
        let mut seen: HashSet<(i32, i32)> = HashSet::new();
        queue.push_back(start);
        seen.insert((start.x, start.y));

        let row_bound = self.rows() + BFS_ROW_OVERSCAN;
        let mut steps = 0;
        while let Some(cur) = queue.pop_front() {
            if steps >= limit {
                return None;
            }
            steps += 1;
            if self.can_place(cur.x, cur.y, size.w, size.h) {
                return Some(cur);
            }
            let neighbors = [
                GridPos::new(cur.x, cur.y - 1),
                GridPos::new(cur.x, cur.y + 1),
                GridPos::new(cur.x - 1, cur.y),
                GridPos::new(cur.x + 1, cur.y),
            ];
            for n in neighbors {
                if n.x >= 0
                    && n.x < self.columns
                    && n.y >= 0
                    && n.y < row_bound
                    && seen.insert((n.x, n.y))
                {
                    queue.push_back(n);
                }
            }
        }
        None
    }

    /// `bfs_nearest` with the default step budget.
    pub fn bfs_nearest_default(&self, start: GridPos, size: Units) -> Option<GridPos> {
        self.bfs_nearest(start, size, BFS_STEP_LIMIT)
    }
}
