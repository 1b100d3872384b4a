//! Grid movement rules shared by the server and any client-side prediction.
//!
//! Positions live on an integer grid where `y` grows to the south and `x`
//! grows to the west, so `North` decrements `y` and `East` decrements `x`.

use crate::protocol::Direction;

pub const WORLD_WIDTH: i32 = 800;
pub const WORLD_HEIGHT: i32 = 600;

/// Integer world position of a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive world rectangle `[0, width] × [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldBounds {
    width: i32,
    height: i32,
}

impl WorldBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..=self.width).contains(&position.x) && (0..=self.height).contains(&position.y)
    }

    /// Clamps each axis independently into the world rectangle.
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            x: position.x.clamp(0, self.width),
            y: position.y.clamp(0, self.height),
        }
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

/// Unit grid delta for a compass direction.
pub fn delta(direction: Direction) -> (i32, i32) {
    match direction {
        Direction::North => (0, -1),
        Direction::NorthEast => (-1, -1),
        Direction::East => (-1, 0),
        Direction::SouthEast => (-1, 1),
        Direction::South => (0, 1),
        Direction::SouthWest => (1, 1),
        Direction::West => (1, 0),
        Direction::NorthWest => (1, -1),
    }
}

/// Moves one unit in `direction` and clamps the result into `bounds`.
///
/// Stepping against a wall is not an error: the player simply stays on the
/// boundary. Arithmetic saturates, so out-of-range inputs cannot wrap.
pub fn step(position: Position, direction: Direction, bounds: &WorldBounds) -> Position {
    let (dx, dy) = delta(direction);
    bounds.clamp(Position {
        x: position.x.saturating_add(dx),
        y: position.y.saturating_add(dy),
    })
}
