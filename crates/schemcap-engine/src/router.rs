//! A* wire router
//!
//! Routes a dynamic wire between two nodes on the schematic grid while
//! avoiding cells occupied by other nodes, then reduces the cell path to the
//! corner points a wire actually needs.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::geometry::Position;

/// Default grid width in cells.
pub const GRID_WIDTH: i32 = 36;
/// Default grid height in cells.
pub const GRID_HEIGHT: i32 = 22;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("No path from {start} to {end}")]
    NoPath { start: GridCell, end: GridCell },

    #[error("Cell {cell} is outside the {width}x{height} routing grid")]
    OutOfBounds {
        cell: GridCell,
        width: i32,
        height: i32,
    },
}

/// Grid cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Nearest cell to a position.
    pub fn nearest(position: Position) -> Self {
        Self {
            x: position.x.round() as i32,
            y: position.y.round() as i32,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(f64::from(self.x), f64::from(self.y))
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub width: i32,
    pub height: i32,
    /// Heuristic for cells sharing a row or column with the goal.
    pub aligned_cost: u32,
    /// Heuristic for every other cell. Large, so the search strongly
    /// prefers straight runs into the goal.
    pub misaligned_cost: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            aligned_cost: 1,
            misaligned_cost: 10_000,
        }
    }
}

/// A node in the A* search
#[derive(Debug, Clone, PartialEq, Eq)]
struct AStarNode {
    cell: GridCell,
    g_cost: u32,
    h_cost: u32,
    /// Push order, used to break ties.
    order: u64,
}

impl AStarNode {
    fn f_cost(&self) -> u32 {
        self.g_cost + self.h_cost
    }
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; earlier pushes win ties.
        other
            .f_cost()
            .cmp(&self.f_cost())
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pathfinder over a fixed grid with a set of blocked cells.
#[derive(Debug, Clone)]
pub struct WireSolver {
    config: RouterConfig,
    occupied: HashSet<GridCell>,
}

impl Default for WireSolver {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl WireSolver {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            occupied: HashSet::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.config.width
    }

    pub fn height(&self) -> i32 {
        self.config.height
    }

    /// Block the cell nearest each position. Positions off the grid are
    /// ignored.
    pub fn occupy<I: IntoIterator<Item = Position>>(&mut self, positions: I) {
        for position in positions {
            let cell = GridCell::nearest(position);
            if self.in_bounds(cell) {
                self.occupied.insert(cell);
            }
        }
    }

    pub fn block(&mut self, cell: GridCell) {
        self.occupied.insert(cell);
    }

    pub fn is_occupied(&self, cell: GridCell) -> bool {
        self.occupied.contains(&cell)
    }

    pub fn in_bounds(&self, cell: GridCell) -> bool {
        cell.x >= 0 && cell.x < self.config.width && cell.y >= 0 && cell.y < self.config.height
    }

    /// Find a path between two cells using A*. The path includes both
    /// endpoints; the endpoints themselves may be occupied.
    pub fn solve(&self, start: GridCell, end: GridCell) -> Result<Vec<GridCell>, RouteError> {
        for cell in [start, end] {
            if !self.in_bounds(cell) {
                return Err(RouteError::OutOfBounds {
                    cell,
                    width: self.config.width,
                    height: self.config.height,
                });
            }
        }
        if start == end {
            return Ok(vec![start]);
        }

        let mut open_set = BinaryHeap::new();
        let mut closed_set = HashSet::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        let mut g_scores: HashMap<GridCell, u32> = HashMap::new();
        let mut order = 0u64;

        g_scores.insert(start, 0);
        open_set.push(AStarNode {
            cell: start,
            g_cost: 0,
            h_cost: self.heuristic(start, end),
            order,
        });

        while let Some(current) = open_set.pop() {
            if current.cell == end {
                let path = reconstruct_path(&came_from, current.cell);
                debug!("Routed {} -> {} in {} cells", start, end, path.len());
                return Ok(path);
            }

            if !closed_set.insert(current.cell) {
                continue;
            }

            for neighbor in self.neighbors(current.cell, end) {
                if closed_set.contains(&neighbor) {
                    continue;
                }

                let tentative_g_score = current.g_cost + 1;
                if g_scores
                    .get(&neighbor)
                    .map_or(true, |&g| tentative_g_score < g)
                {
                    came_from.insert(neighbor, current.cell);
                    g_scores.insert(neighbor, tentative_g_score);
                    order += 1;
                    open_set.push(AStarNode {
                        cell: neighbor,
                        g_cost: tentative_g_score,
                        h_cost: self.heuristic(neighbor, end),
                        order,
                    });
                }
            }
        }

        Err(RouteError::NoPath { start, end })
    }

    /// In-bounds, unoccupied neighbours in the order up, down, left, right.
    /// The goal may be occupied and is still returned.
    fn neighbors(&self, cell: GridCell, goal: GridCell) -> impl Iterator<Item = GridCell> + '_ {
        [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .into_iter()
            .map(move |(dx, dy)| GridCell::new(cell.x + dx, cell.y + dy))
            .filter(move |&next| {
                self.in_bounds(next) && (next == goal || !self.occupied.contains(&next))
            })
    }

    fn heuristic(&self, cell: GridCell, goal: GridCell) -> u32 {
        if cell.x == goal.x || cell.y == goal.y {
            self.config.aligned_cost
        } else {
            self.config.misaligned_cost
        }
    }
}

fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, mut current: GridCell) -> Vec<GridCell> {
    let mut path = vec![current];

    while let Some(&parent) = came_from.get(&current) {
        current = parent;
        path.push(current);
    }

    path.reverse();
    path
}

/// Keep the endpoints and every corner of a cell path.
pub fn simplify_path(path: &[GridCell]) -> Vec<GridCell> {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Vec::new();
    };
    if path.len() < 3 {
        return path.to_vec();
    }

    let mut simplified = vec![first];
    simplified.extend(
        path.iter()
            .tuple_windows()
            .filter(|(prev, cur, next)| {
                (prev.x != cur.x || cur.x != next.x) && (prev.y != cur.y || cur.y != next.y)
            })
            .map(|(_, cur, _)| *cur),
    );
    simplified.push(last);
    simplified
}
