//! Built-in message handlers.

mod ping;
mod room;

pub use ping::{PingRequestHandler, PingResponseHandler};
pub use room::{
    RoomCountHandler, RoomMiscHandler, RoomRenameHandler, RoomStatusHandler,
    TileUpdateHandler,
};

use strife_protocol::MessageType;

use crate::dispatch::HandlerTable;

pub(crate) fn register_defaults(table: &mut HandlerTable) {
    table
        .register(MessageType::PingRequest, PingRequestHandler)
        .register(MessageType::PingResponse, PingResponseHandler)
        .register(MessageType::RoomCountRequest, RoomCountHandler)
        .register(MessageType::RoomUpdateName, RoomRenameHandler)
        .register(MessageType::RoomUpdatePayload, TileUpdateHandler)
        .register(MessageType::RoomUpdateStatus, RoomStatusHandler)
        .register(MessageType::RoomMiscUpdate, RoomMiscHandler);
}
