//! On-disk room index.
//!
//! ```text
//! [u16 room count]
//!   per room: [36-byte UUID text][u16 len][description][u8 active]
//! ```
//!
//! Only identity, description, and the active flag are persisted. Tile
//! grids and dimensions are not part of this format.

use std::path::Path;

use bytes::Bytes;
use strife_protocol::{ByteBuffer, ProtocolError};
use uuid::Uuid;

use crate::{Room, RoomError};

/// File name of the index inside the data directory.
pub const INDEX_FILE_NAME: &str = "rooms.blob";

/// What the index remembers about one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomIndexEntry {
    pub id: Uuid,
    pub description: String,
    pub active: bool,
}

impl From<&Room> for RoomIndexEntry {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            description: room.description.clone(),
            active: room.active,
        }
    }
}

/// Encodes the index for a set of rooms.
pub fn encode_index<'a>(
    rooms: impl IntoIterator<Item = &'a Room>,
) -> Result<Bytes, ProtocolError> {
    let rooms: Vec<&Room> = rooms.into_iter().collect();
    let mut buf = ByteBuffer::new();
    buf.write_int_u16(rooms.len() as i64)?;
    for room in rooms {
        buf.write_raw_uuid(&room.id)
            .write_string(&room.description)?
            .write_bool(room.active);
    }
    Ok(buf.into_bytes())
}

/// Decodes an index written by [`encode_index`].
pub fn decode_index(data: &[u8]) -> Result<Vec<RoomIndexEntry>, ProtocolError> {
    let mut buf = ByteBuffer::from(data);
    let count = buf.read_u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(RoomIndexEntry {
            id: buf.read_raw_uuid()?,
            description: buf.read_string()?,
            active: buf.read_bool()?,
        });
    }
    if buf.unread_len() > 0 {
        return Err(ProtocolError::FrameCorruption(format!(
            "{} trailing bytes after room index",
            buf.unread_len()
        )));
    }
    Ok(entries)
}

/// Writes the index for `rooms` to `path`, replacing any existing file.
pub async fn save_index<'a>(
    path: &Path,
    rooms: impl IntoIterator<Item = &'a Room>,
) -> Result<(), RoomError> {
    let bytes = encode_index(rooms)?;
    tokio::fs::write(path, &bytes).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "room index saved");
    Ok(())
}

/// Reads the index at `path`. Returns `Ok(None)` if the file does not exist.
pub async fn load_index(
    path: &Path,
) -> Result<Option<Vec<RoomIndexEntry>>, RoomError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RoomError::Io(e)),
    };
    Ok(Some(decode_index(&data)?))
}
