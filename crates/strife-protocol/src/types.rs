//! Identity and message-kind types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player attached to a connection.
///
/// Newtype wrapper so a player id can never be confused with any other
/// integer travelling through the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The 16-bit code at the head of every frame body.
///
/// The numeric values are stable wire constants. Codes `4` and `5` are
/// reserved and intentionally have no variant here; a peer sending them
/// gets the same treatment as any other unknown code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    /// Placeholder code; never sent on purpose.
    Null = 0,
    /// Either direction: "are you still there?"
    PingRequest = 1,
    /// Either direction: answer to a [`MessageType::PingRequest`].
    PingResponse = 2,
    /// Server → client greeting sent straight after accept.
    Welcome = 3,
    /// Client → server: send me every room.
    RoomCountRequest = 6,
    /// Server → client: one room snapshot.
    RoomCountResponse = 7,
    /// Client → server: rename a room.
    RoomUpdateName = 1000,
    /// Client → server: batch of tile edits for a room.
    RoomUpdatePayload = 1001,
    /// Server → client: acknowledgement of a tile batch.
    RoomUpdatePayloadAck = 1002,
    /// Client → server: toggle a room's active flag.
    RoomUpdateStatus = 1003,
    /// Client → server: change one of a room's secondary fields.
    RoomMiscUpdate = 1004,
}

impl MessageType {
    /// Number of variants. Sizes enum-indexed lookup tables.
    pub const COUNT: usize = 11;

    /// Every variant, in [`MessageType::index`] order.
    pub const ALL: [MessageType; Self::COUNT] = [
        Self::Null,
        Self::PingRequest,
        Self::PingResponse,
        Self::Welcome,
        Self::RoomCountRequest,
        Self::RoomCountResponse,
        Self::RoomUpdateName,
        Self::RoomUpdatePayload,
        Self::RoomUpdatePayloadAck,
        Self::RoomUpdateStatus,
        Self::RoomMiscUpdate,
    ];

    /// Returns the wire code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Dense position of this variant inside [`MessageType::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Null => 0,
            Self::PingRequest => 1,
            Self::PingResponse => 2,
            Self::Welcome => 3,
            Self::RoomCountRequest => 4,
            Self::RoomCountResponse => 5,
            Self::RoomUpdateName => 6,
            Self::RoomUpdatePayload => 7,
            Self::RoomUpdatePayloadAck => 8,
            Self::RoomUpdateStatus => 9,
            Self::RoomMiscUpdate => 10,
        }
    }
}

impl TryFrom<u16> for MessageType {
    /// The unrecognised code is handed back unchanged.
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Null,
            1 => Self::PingRequest,
            2 => Self::PingResponse,
            3 => Self::Welcome,
            6 => Self::RoomCountRequest,
            7 => Self::RoomCountResponse,
            1000 => Self::RoomUpdateName,
            1001 => Self::RoomUpdatePayload,
            1002 => Self::RoomUpdatePayloadAck,
            1003 => Self::RoomUpdateStatus,
            1004 => Self::RoomMiscUpdate,
            other => return Err(other),
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}
