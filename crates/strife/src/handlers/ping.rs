use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strife_protocol::{MessageType, Packet};

use crate::context::ServerContext;
use crate::dispatch::MessageHandler;
use crate::registry::ConnectionHandle;
use crate::StrifeError;

/// Answers a client ping with an empty ping response.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingRequestHandler;

impl MessageHandler for PingRequestHandler {
    fn handle<'a>(
        &'a self,
        _ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        _packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            tracing::trace!(conn_id = %conn.id(), "ping request");
            conn.send(&Packet::new(MessageType::PingResponse))
        }
        .boxed()
    }
}

/// Records a client's answer to a keep-alive ping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingResponseHandler;

impl MessageHandler for PingResponseHandler {
    fn handle<'a>(
        &'a self,
        _ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        _packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>> {
        async move {
            tracing::trace!(conn_id = %conn.id(), uptime = ?conn.uptime(), "ping response");
            Ok(())
        }
        .boxed()
    }
}
