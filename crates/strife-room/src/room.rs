//! Rooms and the tiles they are made of.
//!
//! A room is a rectangular grid indexed `[x][y]`. Every cell holds a
//! [`Tile`]; the grid is always fully populated, so `tile(x, y)` answers
//! for any in-bounds position.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RoomError;

// ---------------------------------------------------------------------------
// Vector2
// ---------------------------------------------------------------------------

/// An integer grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: i32,
    pub y: i32,
}

impl Vector2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

/// The 8-bit tile type code carried on the wire.
///
/// Stored as the raw code so unknown types sent by a client survive a
/// round trip untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileType(pub u8);

impl TileType {
    pub const WALL: Self = Self(0);
    /// Floor. The background type; never transmitted explicitly.
    pub const DIRT: Self = Self(1);
    pub const PORTAL: Self = Self(2);
    pub const AIR: Self = Self(3);

    /// Returns `true` for the background floor type.
    pub fn is_default(self) -> bool {
        self == Self::DIRT
    }
}

impl Default for TileType {
    fn default() -> Self {
        Self::DIRT
    }
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileType,
    pub passable: bool,
    pub position: Vector2,
}

impl Tile {
    /// A passable floor tile at `position`.
    pub fn floor(position: Vector2) -> Self {
        Self {
            kind: TileType::DIRT,
            passable: true,
            position,
        }
    }

    /// An impassable wall tile at `position`.
    pub fn wall(position: Vector2) -> Self {
        Self {
            kind: TileType::WALL,
            passable: false,
            position,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry / exit
// ---------------------------------------------------------------------------

/// Where players arrive in a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryPoint {
    pub password: Option<String>,
    pub location: Vector2,
}

/// Where players leave a room, and the rooms they can go to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExitPoint {
    pub location: Vector2,
    pub destinations: Vec<Uuid>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Default description given to generated rooms.
pub const DEFAULT_DESCRIPTION: &str = "A generic room";

/// A rectangular world area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub entry: EntryPoint,
    pub exit: ExitPoint,
    pub starting: bool,
    pub active: bool,
    width: u32,
    height: u32,
    tiles: Vec<Vec<Tile>>,
}

impl Room {
    /// Creates a room whose every cell is passable floor.
    pub fn filled(id: Uuid, width: u32, height: u32) -> Self {
        let tiles = (0..width as i32)
            .map(|x| {
                (0..height as i32)
                    .map(|y| Tile::floor(Vector2::new(x, y)))
                    .collect()
            })
            .collect();

        Self {
            id,
            name: format!("room_{id}"),
            description: DEFAULT_DESCRIPTION.to_string(),
            entry: EntryPoint {
                password: None,
                location: Vector2::new(1, 1),
            },
            exit: ExitPoint {
                location: Vector2::new(4, 4),
                destinations: Vec::new(),
            },
            starting: false,
            active: true,
            width,
            height,
            tiles,
        }
    }

    /// Generates a fresh room with a random identifier.
    pub fn generate(width: u32, height: u32) -> Self {
        Self::generate_with_id(Uuid::new_v4(), width, height)
    }

    /// Generates a walled room: every border cell is an impassable wall,
    /// every interior cell is passable floor. Identical dimensions always
    /// give identical wall placement.
    pub fn generate_with_id(id: Uuid, width: u32, height: u32) -> Self {
        let mut room = Self::filled(id, width, height);
        let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);
        for column in &mut room.tiles {
            for tile in column.iter_mut() {
                let Vector2 { x, y } = tile.position;
                if x == 0 || y == 0 || x == max_x || y == max_y {
                    *tile = Tile::wall(tile.position);
                }
            }
        }
        room
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `true` if `(x, y)` lies inside the grid.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// The tile at `(x, y)`, or `None` if out of bounds.
    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        if !self.contains(x, y) {
            return None;
        }
        Some(&self.tiles[x as usize][y as usize])
    }

    /// Every tile, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten()
    }

    /// Tiles that differ from the background floor type.
    pub fn non_default_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles().filter(|t| !t.kind.is_default())
    }

    /// Replaces the tile at `tile.position`.
    pub fn set_tile(&mut self, tile: Tile) -> Result<(), RoomError> {
        self.check_bounds(tile.position)?;
        let Vector2 { x, y } = tile.position;
        self.tiles[x as usize][y as usize] = tile;
        Ok(())
    }

    /// Applies a batch of tile edits. Either every tile is in bounds and
    /// the whole batch lands, or nothing changes.
    pub fn apply_tiles(&mut self, tiles: &[Tile]) -> Result<usize, RoomError> {
        for tile in tiles {
            self.check_bounds(tile.position)?;
        }
        for tile in tiles {
            self.set_tile(*tile)?;
        }
        tracing::debug!(room_id = %self.id, count = tiles.len(), "tiles updated");
        Ok(tiles.len())
    }

    fn check_bounds(&self, position: Vector2) -> Result<(), RoomError> {
        if self.contains(position.x, position.y) {
            Ok(())
        } else {
            Err(RoomError::OutOfBounds {
                x: position.x,
                y: position.y,
                width: self.width,
                height: self.height,
            })
        }
    }
}
