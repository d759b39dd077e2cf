//! Handlers for room queries and edits.
//!
//! Every edit names its room by id. An id with no room behind it fails the
//! message with [`RoomError::NotFound`]; no placeholder room is created.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strife_protocol::{MessageType, Packet};
use strife_room::{encode_room, RoomError};

use crate::context::ServerContext;
use crate::dispatch::MessageHandler;
use crate::messages::{
    MiscField, RoomMisc, RoomRename, RoomStatus, TileUpdate, TileUpdateAck,
    WireMessage,
};
use crate::registry::ConnectionHandle;
use crate::StrifeError;

/// Sends the requester one room-count response per room.
///
/// A room that cannot be encoded is skipped with a warning and the rest are
/// still sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomCountHandler;

impl MessageHandler for RoomCountHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        _packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            let rooms = ctx.rooms.lock().await;
            let mut sent = 0usize;
            for room in rooms.iter() {
                let mut reply = Packet::new(MessageType::RoomCountResponse);
                if let Err(e) = encode_room(room, reply.body_mut()) {
                    tracing::warn!(room_id = %room.id, error = %e, "room does not fit the wire format");
                    continue;
                }
                conn.send(&reply)?;
                sent += 1;
            }
            tracing::debug!(conn_id = %conn.id(), sent, "sent room list");
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoomRenameHandler;

impl MessageHandler for RoomRenameHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        mut packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            let msg = RoomRename::from_packet(&mut packet)?;
            let mut rooms = ctx.rooms.lock().await;
            let room = rooms.get_mut(&msg.room_id)?;
            tracing::info!(conn_id = %conn.id(), room_id = %msg.room_id, name = %msg.name, "room renamed");
            room.name = msg.name;
            Ok(())
        }
        .boxed()
    }
}

/// Applies a batch of tile edits and acknowledges how many landed.
///
/// The batch is all-or-nothing: one out-of-grid tile rejects the whole
/// message and no ack is sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileUpdateHandler;

impl MessageHandler for TileUpdateHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        mut packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            let msg = TileUpdate::from_packet(&mut packet)?;
            let applied = {
                let mut rooms = ctx.rooms.lock().await;
                rooms.get_mut(&msg.room_id)?.apply_tiles(&msg.tiles)?
            };
            tracing::debug!(conn_id = %conn.id(), room_id = %msg.room_id, applied, "tile batch applied");

            let ack = TileUpdateAck {
                room_id: msg.room_id,
                applied: u16::try_from(applied).unwrap_or(u16::MAX),
            };
            conn.send(&ack.to_packet()?)
        }
        .boxed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoomStatusHandler;

impl MessageHandler for RoomStatusHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        mut packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            let msg = RoomStatus::from_packet(&mut packet)?;
            let mut rooms = ctx.rooms.lock().await;
            rooms.get_mut(&msg.room_id)?.active = msg.active;
            tracing::info!(conn_id = %conn.id(), room_id = %msg.room_id, active = msg.active, "room status changed");
            Ok(())
        }
        .boxed()
    }
}

/// Updates one secondary room field. Entry and exit points must lie inside
/// the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomMiscHandler;

impl MessageHandler for RoomMiscHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        mut packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            let msg = RoomMisc::from_packet(&mut packet)?;
            let mut rooms = ctx.rooms.lock().await;
            let room = rooms.get_mut(&msg.room_id)?;

            match msg.field {
                MiscField::Description(text) => room.description = text,
                MiscField::Starting(flag) => room.starting = flag,
                MiscField::Entry(at) | MiscField::Exit(at)
                    if !room.contains(at.x, at.y) =>
                {
                    return Err(RoomError::OutOfBounds {
                        x: at.x,
                        y: at.y,
                        width: room.width(),
                        height: room.height(),
                    }
                    .into());
                }
                MiscField::Entry(at) => room.entry.location = at,
                MiscField::Exit(at) => room.exit.location = at,
            }
            tracing::debug!(conn_id = %conn.id(), room_id = %msg.room_id, "room field updated");
            Ok(())
        }
        .boxed()
    }
}
