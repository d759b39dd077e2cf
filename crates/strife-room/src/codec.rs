//! Binary encoding of a room for the wire.
//!
//! ```text
//! [u16 len][36-byte room UUID text]
//! [u16 len][name]
//! [u16 len][description]
//! [u8 width][u8 height]
//! [u16 tile count N]
//!   N × [u8 type][u8 passable][u8 x][u8 y]
//! [u8 exit.x][u8 exit.y][u8 entry.x][u8 entry.y]
//! ```
//!
//! Floor tiles are left out of the list. A decoder fills every cell that is
//! not listed with passable floor.

use strife_protocol::{ByteBuffer, ProtocolError};

use crate::{Room, Tile, TileType, Vector2};

/// Appends the wire encoding of `room` to `out`.
///
/// The room is encoded into a scratch buffer first, so a value that does
/// not fit its field leaves `out` exactly as it was.
pub fn encode_room(room: &Room, out: &mut ByteBuffer) -> Result<(), ProtocolError> {
    let mut scratch = ByteBuffer::new();
    scratch
        .write_uuid(&room.id)
        .write_string(&room.name)?
        .write_string(&room.description)?
        .write_int_u8(room.width())?
        .write_int_u8(room.height())?;

    let tiles: Vec<&Tile> = room.non_default_tiles().collect();
    scratch.write_int_u16(tiles.len() as i64)?;
    for tile in tiles {
        scratch
            .write_u8(tile.kind.0)
            .write_bool(tile.passable)
            .write_int_u8(tile.position.x)?
            .write_int_u8(tile.position.y)?;
    }

    scratch
        .write_int_u8(room.exit.location.x)?
        .write_int_u8(room.exit.location.y)?
        .write_int_u8(room.entry.location.x)?
        .write_int_u8(room.entry.location.y)?;

    out.write_bytes(scratch.as_bytes());
    Ok(())
}

/// Reads a room previously written by [`encode_room`].
///
/// Fields the wire does not carry (entry password, exit destinations,
/// starting/active flags) come back as [`Room::filled`] defaults.
pub fn decode_room(buf: &mut ByteBuffer) -> Result<Room, ProtocolError> {
    let id = buf.read_uuid()?;
    let name = buf.read_string()?;
    let description = buf.read_string()?;
    let width = u32::from(buf.read_u8()?);
    let height = u32::from(buf.read_u8()?);

    let mut room = Room::filled(id, width, height);
    room.name = name;
    room.description = description;

    let count = buf.read_u16()?;
    for _ in 0..count {
        let tile = Tile {
            kind: TileType(buf.read_u8()?),
            passable: buf.read_bool()?,
            position: read_position(buf)?,
        };
        room.set_tile(tile).map_err(|e| {
            ProtocolError::FrameCorruption(format!("room tile rejected: {e}"))
        })?;
    }

    room.exit.location = read_position(buf)?;
    room.entry.location = read_position(buf)?;
    Ok(room)
}

/// Reads an `[u8 x][u8 y]` pair.
pub fn read_position(buf: &mut ByteBuffer) -> Result<Vector2, ProtocolError> {
    let x = i32::from(buf.read_u8()?);
    let y = i32::from(buf.read_u8()?);
    Ok(Vector2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn encoded(room: &Room) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        encode_room(room, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_five_by_five_lists_exactly_the_border_walls() {
        let room = Room::generate(5, 5);
        let mut buf = encoded(&room);

        assert_eq!(buf.read_uuid().unwrap(), room.id);
        assert_eq!(buf.read_string().unwrap(), room.name);
        assert_eq!(buf.read_string().unwrap(), room.description);
        assert_eq!(buf.read_u8().unwrap(), 5);
        assert_eq!(buf.read_u8().unwrap(), 5);

        let count = buf.read_u16().unwrap();
        assert_eq!(count, 16);

        let mut positions = Vec::new();
        for _ in 0..count {
            assert_eq!(buf.read_u8().unwrap(), TileType::WALL.0);
            assert!(!buf.read_bool().unwrap());
            let x = buf.read_u8().unwrap();
            let y = buf.read_u8().unwrap();
            positions.push((x, y));
        }
        let mut expected: Vec<(u8, u8)> = (0..5u8)
            .flat_map(|x| (0..5u8).map(move |y| (x, y)))
            .filter(|&(x, y)| x == 0 || x == 4 || y == 0 || y == 4)
            .collect();
        positions.sort_unstable();
        expected.sort_unstable();
        assert_eq!(positions, expected);

        // exit then entry
        assert_eq!(buf.read_bytes(4).unwrap(), &[4, 4, 1, 1]);
        assert_eq!(buf.unread_len(), 0);
    }

    #[test]
    fn test_sparse_round_trip_restores_grid() {
        let mut room = Room::generate(8, 6);
        room.name = "Hall".into();
        room.description = "Dusty".into();
        room.set_tile(Tile {
            kind: TileType::PORTAL,
            passable: true,
            position: Vector2::new(3, 2),
        })
        .unwrap();
        room.set_tile(Tile {
            kind: TileType::AIR,
            passable: false,
            position: Vector2::new(4, 4),
        })
        .unwrap();
        room.exit.location = Vector2::new(6, 4);

        let decoded = decode_room(&mut encoded(&room)).unwrap();

        assert_eq!(decoded.id, room.id);
        assert_eq!(decoded.name, "Hall");
        assert_eq!(decoded.description, "Dusty");
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.exit.location, Vector2::new(6, 4));
        assert_eq!(decoded.entry.location, room.entry.location);
        let original: Vec<&Tile> = room.tiles().collect();
        let restored: Vec<&Tile> = decoded.tiles().collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_unlisted_cells_decode_as_passable_floor() {
        let mut buf = ByteBuffer::new();
        buf.write_uuid(&Uuid::new_v4());
        buf.write_string("n").unwrap();
        buf.write_string("d").unwrap();
        buf.write_u8(3).write_u8(2);
        buf.write_u16(1);
        buf.write_u8(0).write_bool(false).write_u8(2).write_u8(1);
        buf.write_bytes(&[0, 0, 0, 0]);

        let room = decode_room(&mut buf).unwrap();
        for tile in room.tiles() {
            if tile.position == Vector2::new(2, 1) {
                assert_eq!(tile.kind, TileType::WALL);
                assert!(!tile.passable);
            } else {
                assert_eq!(tile.kind, TileType::DIRT);
                assert!(tile.passable);
            }
        }
    }

    #[test]
    fn test_oversized_room_is_rejected_without_output() {
        let room = Room::filled(Uuid::new_v4(), 300, 5);
        let mut out = ByteBuffer::new();
        out.write_u8(0xEE);

        let err = encode_room(&room, &mut out).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::EncodingRange { value: 300, .. }
        ));
        assert_eq!(out.as_bytes(), &[0xEE]);
    }

    #[test]
    fn test_negative_entry_point_is_rejected() {
        let mut room = Room::generate(5, 5);
        room.entry.location = Vector2::new(-1, 0);
        let mut out = ByteBuffer::new();
        assert!(encode_room(&room, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_tile_outside_declared_grid_is_corruption() {
        let mut buf = ByteBuffer::new();
        buf.write_uuid(&Uuid::new_v4());
        buf.write_string("n").unwrap();
        buf.write_string("d").unwrap();
        buf.write_u8(2).write_u8(2);
        buf.write_u16(1);
        buf.write_u8(0).write_bool(false).write_u8(5).write_u8(0);
        buf.write_bytes(&[0, 0, 0, 0]);

        assert!(matches!(
            decode_room(&mut buf),
            Err(ProtocolError::FrameCorruption(_))
        ));
    }

    #[test]
    fn test_truncated_room_is_corruption() {
        let buf = encoded(&Room::generate(5, 5));
        let mut short = ByteBuffer::from(&buf.as_bytes()[..buf.len() - 3]);
        assert!(matches!(
            decode_room(&mut short),
            Err(ProtocolError::FrameCorruption(_))
        ));
    }
}
