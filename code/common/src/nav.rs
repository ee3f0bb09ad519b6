use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;

use crate::geometry::{Obstacle, Rect};

/// Side length of one nav cell in world units.
pub const NAV_CELL_SIZE: f32 = 32.0;
/// How far (in cells) an unwalkable goal is moved to the nearest walkable cell.
pub const GOAL_SEARCH_RADIUS: i32 = 3;
/// Node expansions allowed per search before giving up.
pub const MAX_EXPANSIONS: usize = 4000;

const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// Uniform walkability grid for one map. Read-only after construction.
#[derive(Debug, Clone)]
pub struct NavGrid {
    cell_size: f32,
    cols: i32,
    rows: i32,
    walkable: Vec<bool>,
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
struct Cell {
    x: i32,
    y: i32,
}

impl Cell {
    fn distance(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, PartialEq)]
struct OpenNode {
    priority: f32,
    index: usize,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the lowest priority first.
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl NavGrid {
    /// Marks a cell walkable when its center lies in a zone and an agent of `agent_radius`
    /// standing there overlaps no obstacle.
    pub fn build(
        width: f32,
        height: f32,
        cell_size: f32,
        agent_radius: f32,
        zones: &[Rect],
        obstacles: &[Obstacle],
    ) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as i32;
        let rows = (height / cell_size).ceil().max(1.0) as i32;
        let mut walkable = vec![false; (cols * rows) as usize];

        for y in 0..rows {
            for x in 0..cols {
                let center = Vec2::new(
                    x as f32 * cell_size + cell_size / 2.0,
                    y as f32 * cell_size + cell_size / 2.0,
                );
                let in_zone = zones.iter().any(|zone| zone.contains(center));
                let blocked = obstacles
                    .iter()
                    .any(|obstacle| obstacle.overlaps_circle(center, agent_radius));
                walkable[(y * cols + x) as usize] = in_zone && !blocked;
            }
        }

        Self {
            cell_size,
            cols,
            rows,
            walkable,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn is_walkable_at(&self, point: Vec2) -> bool {
        let cell = self.cell_of(point);
        self.walkable[self.index(cell)]
    }

    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|w| **w).count()
    }

    fn cell_of(&self, point: Vec2) -> Cell {
        Cell {
            x: ((point.x / self.cell_size).floor() as i32).clamp(0, self.cols - 1),
            y: ((point.y / self.cell_size).floor() as i32).clamp(0, self.rows - 1),
        }
    }

    fn index(&self, cell: Cell) -> usize {
        (cell.y * self.cols + cell.x) as usize
    }

    fn cell_at(&self, index: usize) -> Cell {
        let index = index as i32;
        Cell {
            x: index % self.cols,
            y: index / self.cols,
        }
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.cols && cell.y >= 0 && cell.y < self.rows
    }

    fn walkable_cell(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && self.walkable[self.index(cell)]
    }

    fn center_of(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            cell.x as f32 * self.cell_size + self.cell_size / 2.0,
            cell.y as f32 * self.cell_size + self.cell_size / 2.0,
        )
    }

    /// Nearest walkable cell to `goal`, searched ring by ring out to [`GOAL_SEARCH_RADIUS`].
    fn nearest_walkable(&self, goal: Cell) -> Option<Cell> {
        for ring in 1..=GOAL_SEARCH_RADIUS {
            let mut best: Option<(i32, Cell)> = None;
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let candidate = Cell {
                        x: goal.x + dx,
                        y: goal.y + dy,
                    };
                    if !self.walkable_cell(candidate) {
                        continue;
                    }
                    let dist = dx * dx + dy * dy;
                    if best.is_none_or(|(best_dist, _)| dist < best_dist) {
                        best = Some((dist, candidate));
                    }
                }
            }
            if let Some((_, cell)) = best {
                return Some(cell);
            }
        }
        None
    }

    /// Grid A* from `start` to `goal`.
    ///
    /// Returns `Some(vec![])` when both points share a cell, `Some(waypoints)` with cell centers
    /// (start cell excluded, goal cell included) when a route exists, and `None` when the goal is
    /// unreachable or the search ran out of expansions.
    pub fn find_path(&self, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
        let start_cell = self.cell_of(start);
        let mut goal_cell = self.cell_of(goal);

        if start_cell == goal_cell {
            return Some(Vec::new());
        }

        if !self.walkable_cell(goal_cell) {
            goal_cell = self.nearest_walkable(goal_cell)?;
        }

        let cell_count = self.walkable.len();
        let start_index = self.index(start_cell);
        let goal_index = self.index(goal_cell);

        let mut g_score = vec![f32::INFINITY; cell_count];
        let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
        let mut closed = vec![false; cell_count];
        let mut open = BinaryHeap::new();

        g_score[start_index] = 0.0;
        open.push(OpenNode {
            priority: start_cell.distance(goal_cell),
            index: start_index,
        });

        let mut expansions = 0;
        while let Some(OpenNode { index, .. }) = open.pop() {
            if closed[index] {
                continue;
            }
            if index == goal_index {
                return Some(self.reconstruct(&came_from, index));
            }

            expansions += 1;
            if expansions > MAX_EXPANSIONS {
                return None;
            }
            closed[index] = true;

            let current = self.cell_at(index);
            for (dx, dy) in [
                (0, -1),
                (0, 1),
                (-1, 0),
                (1, 0),
                (-1, -1),
                (1, -1),
                (-1, 1),
                (1, 1),
            ] {
                let next = Cell {
                    x: current.x + dx,
                    y: current.y + dy,
                };
                if !self.walkable_cell(next) {
                    continue;
                }
                let next_index = self.index(next);
                if closed[next_index] {
                    continue;
                }

                let step = if dx != 0 && dy != 0 { DIAGONAL_COST } else { 1.0 };
                let tentative = g_score[index] + step;
                if tentative < g_score[next_index] {
                    g_score[next_index] = tentative;
                    came_from[next_index] = Some(index);
                    open.push(OpenNode {
                        priority: tentative + next.distance(goal_cell),
                        index: next_index,
                    });
                }
            }
        }

        None
    }

    fn reconstruct(&self, came_from: &[Option<usize>], goal_index: usize) -> Vec<Vec2> {
        let mut path = Vec::new();
        let mut current = goal_index;
        while let Some(previous) = came_from[current] {
            path.push(self.center_of(self.cell_at(current)));
            current = previous;
        }
        path.reverse();
        path
    }
}
