//! # Strife
//!
//! Network transport and message dispatch for a multiplayer world server.
//!
//! Clients talk to the server over plain TCP using length-prefixed binary
//! frames. Each frame carries a 16-bit message type; the server routes it
//! through a [`HandlerTable`] to a [`MessageHandler`], which may reply to
//! the sender, broadcast to every connection, or edit the shared
//! [`RoomRegistry`](strife_room::RoomRegistry).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strife::prelude::*;
//!
//! # async fn start() -> Result<(), StrifeError> {
//! let config = ServerConfig::default();
//! let rooms = RoomRegistry::generate(&config.room_data, &mut rand::rng())?;
//!
//! let server = StrifeServer::builder()
//!     .config(config)
//!     .rooms(rooms)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod connection;
mod context;
mod dispatch;
mod error;
pub mod handlers;
pub mod messages;
mod registry;
mod server;

pub use config::{ServerConfig, DEFAULT_WELCOME};
pub use context::ServerContext;
pub use dispatch::{HandlerTable, MessageHandler};
pub use error::StrifeError;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use server::{StrifeServer, StrifeServerBuilder};

/// Convenience re-exports for common types.
pub mod prelude {
    pub use crate::messages::{
        MiscField, RoomMisc, RoomRename, RoomStatus, TileUpdate, TileUpdateAck,
        Welcome, WireMessage,
    };
    pub use crate::{
        ConnectionHandle, HandlerTable, MessageHandler, ServerConfig,
        ServerContext, StrifeError, StrifeServer,
    };
    pub use strife_protocol::{
        ByteBuffer, FrameDecoder, MessageType, Packet, PlayerId, ProtocolError,
    };
    pub use strife_room::{Room, RoomData, RoomRegistry, Tile, TileType, Vector2};
    pub use strife_transport::ConnectionId;
}
