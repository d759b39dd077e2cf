//! Error types for the room layer.

use strife_protocol::ProtocolError;
use uuid::Uuid;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room with this identifier is registered.
    #[error("room {0} not found")]
    NotFound(Uuid),

    /// A tile position falls outside the room's grid.
    #[error("tile ({x}, {y}) is outside a {width}x{height} room")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    /// Generation bounds or dimensions that cannot produce a room.
    #[error("invalid room dimensions: {0}")]
    InvalidDimensions(String),

    /// Encoding or decoding room bytes failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the room index file failed.
    #[error("room index i/o: {0}")]
    Io(#[from] std::io::Error),
}
