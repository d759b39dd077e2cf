//! Typed payloads for the messages the server sends and understands.
//!
//! Each type knows its [`MessageType`] and how to read and write its body.
//! Handlers decode with [`WireMessage::from_packet`]; replies and test
//! clients build packets with [`WireMessage::to_packet`].

use strife_protocol::{ByteBuffer, MessageType, Packet, ProtocolError};
use strife_room::{read_position, Tile, TileType, Vector2};
use uuid::Uuid;

/// A payload with a fixed message type and a binary body layout.
pub trait WireMessage: Sized {
    /// The type code this payload travels under.
    const KIND: MessageType;

    /// Appends the body to `buf`.
    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError>;

    /// Reads the body from `buf`.
    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError>;

    /// Builds a complete packet.
    fn to_packet(&self) -> Result<Packet, ProtocolError> {
        let mut packet = Packet::new(Self::KIND);
        self.write(packet.body_mut())?;
        Ok(packet)
    }

    /// Reads the payload out of a received packet.
    fn from_packet(packet: &mut Packet) -> Result<Self, ProtocolError> {
        Self::read(packet.body_mut())
    }
}

// ---------------------------------------------------------------------------
// Welcome
// ---------------------------------------------------------------------------

/// Server greeting: `[u16 len][text]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub greeting: String,
}

impl WireMessage for Welcome {
    const KIND: MessageType = MessageType::Welcome;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.write_string(&self.greeting)?;
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            greeting: buf.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Room updates
// ---------------------------------------------------------------------------

/// Rename a room: `[36-byte UUID text][name: every remaining byte]`.
///
/// Neither field carries a length prefix. The name is still capped at
/// `u16::MAX` bytes, the most a room snapshot can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRename {
    pub room_id: Uuid,
    pub name: String,
}

impl WireMessage for RoomRename {
    const KIND: MessageType = MessageType::RoomUpdateName;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.write_raw_uuid(&self.room_id)
            .write_bytes(self.name.as_bytes());
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let room_id = buf.read_raw_uuid()?;
        let raw = buf.read_remaining();
        if raw.len() > usize::from(u16::MAX) {
            return Err(ProtocolError::EncodingRange {
                value: raw.len() as i64,
                width: "u16",
            });
        }
        let name = String::from_utf8(raw.to_vec()).map_err(|e| {
            ProtocolError::FrameCorruption(format!("room name is not utf-8: {e}"))
        })?;
        Ok(Self { room_id, name })
    }
}

/// Update kind byte for a tile batch. The only kind defined so far.
pub const TILE_UPDATE_KIND: u8 = 0;

/// Batch of tile edits:
/// `[u8 kind][u16 len][UUID][u16 N]` then N × `[type][passable][x][y]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUpdate {
    pub room_id: Uuid,
    pub tiles: Vec<Tile>,
}

impl WireMessage for TileUpdate {
    const KIND: MessageType = MessageType::RoomUpdatePayload;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        let mut scratch = ByteBuffer::new();
        scratch
            .write_u8(TILE_UPDATE_KIND)
            .write_uuid(&self.room_id)
            .write_int_u16(self.tiles.len() as i64)?;
        for tile in &self.tiles {
            scratch
                .write_u8(tile.kind.0)
                .write_bool(tile.passable)
                .write_int_u8(tile.position.x)?
                .write_int_u8(tile.position.y)?;
        }
        buf.write_bytes(scratch.as_bytes());
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let kind = buf.read_u8()?;
        if kind != TILE_UPDATE_KIND {
            return Err(ProtocolError::InvalidMessage(format!(
                "unknown room update kind {kind}"
            )));
        }
        let room_id = buf.read_uuid()?;
        let count = buf.read_u16()?;
        let mut tiles = Vec::with_capacity(count as usize);
        for _ in 0..count {
            tiles.push(Tile {
                kind: TileType(buf.read_u8()?),
                passable: buf.read_bool()?,
                position: read_position(buf)?,
            });
        }
        Ok(Self { room_id, tiles })
    }
}

/// Acknowledges a tile batch: `[u16 len][UUID][u16 applied]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUpdateAck {
    pub room_id: Uuid,
    pub applied: u16,
}

impl WireMessage for TileUpdateAck {
    const KIND: MessageType = MessageType::RoomUpdatePayloadAck;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.write_uuid(&self.room_id).write_u16(self.applied);
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_id: buf.read_uuid()?,
            applied: buf.read_u16()?,
        })
    }
}

/// Toggle a room's active flag: `[u16 len][UUID][u8 active]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub room_id: Uuid,
    pub active: bool,
}

impl WireMessage for RoomStatus {
    const KIND: MessageType = MessageType::RoomUpdateStatus;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.write_uuid(&self.room_id).write_bool(self.active);
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_id: buf.read_uuid()?,
            active: buf.read_bool()?,
        })
    }
}

/// One secondary room field, selected by a leading byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiscField {
    /// `0`: `[u16 len][text]`
    Description(String),
    /// `1`: `[u8 flag]`
    Starting(bool),
    /// `2`: `[u8 x][u8 y]`
    Entry(Vector2),
    /// `3`: `[u8 x][u8 y]`
    Exit(Vector2),
}

/// Change one secondary field: `[u16 len][UUID][u8 field][value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMisc {
    pub room_id: Uuid,
    pub field: MiscField,
}

impl WireMessage for RoomMisc {
    const KIND: MessageType = MessageType::RoomMiscUpdate;

    fn write(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        let mut scratch = ByteBuffer::new();
        scratch.write_uuid(&self.room_id);
        match &self.field {
            MiscField::Description(text) => {
                scratch.write_u8(0).write_string(text)?;
            }
            MiscField::Starting(flag) => {
                scratch.write_u8(1).write_bool(*flag);
            }
            MiscField::Entry(at) => {
                scratch.write_u8(2).write_int_u8(at.x)?.write_int_u8(at.y)?;
            }
            MiscField::Exit(at) => {
                scratch.write_u8(3).write_int_u8(at.x)?.write_int_u8(at.y)?;
            }
        }
        buf.write_bytes(scratch.as_bytes());
        Ok(())
    }

    fn read(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let room_id = buf.read_uuid()?;
        let field = match buf.read_u8()? {
            0 => MiscField::Description(buf.read_string()?),
            1 => MiscField::Starting(buf.read_bool()?),
            2 => MiscField::Entry(read_position(buf)?),
            3 => MiscField::Exit(read_position(buf)?),
            other => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "unknown misc field {other}"
                )));
            }
        };
        Ok(Self { room_id, field })
    }
}
