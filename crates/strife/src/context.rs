//! Shared server state.
//!
//! One [`ServerContext`] is built before the listener starts and handed by
//! `Arc` to the accept loop, the keep-alive task and every connection task.

use std::sync::Arc;

use strife_protocol::Packet;
use strife_room::RoomRegistry;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::dispatch::HandlerTable;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::StrifeError;

/// Everything a handler may read or mutate.
///
/// Both collections sit behind tokio mutexes. Handlers must not hold one
/// lock while awaiting the other in the opposite order: the convention is
/// `rooms` first, then `connections`.
pub struct ServerContext {
    config: ServerConfig,
    handlers: HandlerTable,
    pub connections: Mutex<ConnectionRegistry>,
    pub rooms: Mutex<RoomRegistry>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        rooms: RoomRegistry,
        handlers: HandlerTable,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            handlers,
            connections: Mutex::new(ConnectionRegistry::new()),
            rooms: Mutex::new(rooms),
        })
    }

    /// Read-only configuration, fixed at startup.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Routes one packet to its handler.
    pub async fn dispatch(
        &self,
        conn: &ConnectionHandle,
        packet: Packet,
    ) -> Result<(), StrifeError> {
        self.handlers.dispatch(self, conn, packet).await
    }

    /// Sends `packet` to every registered connection.
    ///
    /// The connection list stays locked for the whole pass, so no connection
    /// is added or removed mid-broadcast. Returns the number of connections
    /// the frame was queued on.
    pub async fn broadcast(&self, packet: &Packet) -> Result<usize, StrifeError> {
        let frame = packet.to_frame()?;
        let connections = self.connections.lock().await;
        Ok(connections.send_all(&frame))
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", &self.config)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
