//! Grid coordinates and directions.
//!
//! The simulation runs on a finite 2D integer grid. `North` points toward
//! decreasing `y` and `South` toward increasing `y`, matching screen
//! coordinates. `Up`/`Down` exist for the full direction vocabulary but do
//! not move on the 2D grid.

use serde::{Deserialize, Serialize};

/// A facing or travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing `y`.
    North,
    /// Toward increasing `x`.
    East,
    /// Toward increasing `y`.
    South,
    /// Toward decreasing `x`.
    West,
    /// Out of the grid plane; no 2D offset.
    Up,
    /// Into the grid plane; no 2D offset.
    Down,
}

impl Direction {
    /// The four in-plane directions, in the order neighbor updates fan out.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset on the grid. `Up`/`Down` do not move.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::Up | Direction::Down => (0, 0),
        }
    }

    /// The opposing direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Quarter turn counter-clockwise. `Up`/`Down` are unchanged.
    pub fn left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
            other => other,
        }
    }

    /// Quarter turn clockwise. `Up`/`Down` are unchanged.
    pub fn right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            other => other,
        }
    }
}

/// A cell coordinate on the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    /// Column, `0..width`.
    pub x: i32,
    /// Row, `0..height`.
    pub y: i32,
}

impl GridPos {
    /// Build a position from raw coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step toward `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four cardinal neighbors, in fan-out order.
    pub fn neighbors(self) -> [GridPos; 4] {
        [
            self.step(Direction::North),
            self.step(Direction::East),
            self.step(Direction::South),
            self.step(Direction::West),
        ]
    }
}
