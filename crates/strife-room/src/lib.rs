//! Rooms for Strife.
//!
//! A room is a rectangular tile grid with an identity, a name, a
//! description, and entry/exit points. This crate owns the model and the
//! two byte formats rooms travel in:
//!
//! - [`encode_room`] / [`decode_room`]: the sparse wire encoding sent to
//!   clients (floor tiles omitted).
//! - [`encode_index`] / [`decode_index`]: the compact on-disk index that
//!   survives restarts.
//!
//! # Key types
//!
//! - [`Room`], [`Tile`], [`TileType`], [`Vector2`]: the model
//! - [`RoomRegistry`]: every room, keyed by UUID
//! - [`RoomBounds`], [`RoomData`]: generation settings

mod codec;
mod config;
mod error;
mod index;
mod registry;
mod room;

pub use codec::{decode_room, encode_room, read_position};
pub use config::{RoomBounds, RoomData, MAX_SIDE, MIN_SIDE};
pub use error::RoomError;
pub use index::{
    decode_index, encode_index, load_index, save_index, RoomIndexEntry,
    INDEX_FILE_NAME,
};
pub use registry::RoomRegistry;
pub use room::{
    EntryPoint, ExitPoint, Room, Tile, TileType, Vector2, DEFAULT_DESCRIPTION,
};
