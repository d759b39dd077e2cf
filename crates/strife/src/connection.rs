//! Per-connection lifecycle: register, greet, read until the stream ends.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], plus a writer task that drains the connection's
//! outbound queue. The flow is:
//!   1. Register the connection and start the writer
//!   2. Queue the welcome message
//!   3. Loop: read a chunk → feed the frame decoder → dispatch each frame
//!   4. On EOF, read error, idle timeout or a close request: deregister,
//!      give the writer a bounded time to drain, close

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use strife_protocol::FrameDecoder;
use strife_transport::{Connection, ConnectionId, TcpConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::ServerContext;
use crate::messages::{Welcome, WireMessage};
use crate::registry::ConnectionHandle;
use crate::StrifeError;

/// Removes the connection from the registry when the handler exits.
///
/// The normal path calls [`release`](Self::release). If the handler unwinds
/// instead, `Drop` spawns a task to do the same, since it cannot take the
/// async lock itself.
struct RegistrationGuard {
    conn_id: ConnectionId,
    ctx: Arc<ServerContext>,
    released: bool,
}

impl RegistrationGuard {
    async fn release(mut self) {
        self.ctx.connections.lock().await.remove(self.conn_id);
        self.released = true;
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let conn_id = self.conn_id;
        let ctx = Arc::clone(&self.ctx);
        runtime.spawn(async move {
            ctx.connections.lock().await.remove(conn_id);
        });
    }
}

/// Why a read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    PeerClosed,
    ReadFailed,
    IdleTimeout,
    /// A handler, or a full outbound queue, asked for the connection to go.
    Requested,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    ctx: Arc<ServerContext>,
) -> Result<(), StrifeError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::info!(%conn_id, %peer, "accepted connection");

    let (tx, rx) = mpsc::channel(ctx.config().outbound_queue_len());
    let handle = ConnectionHandle::new(conn_id, peer, tx);
    ctx.connections.lock().await.add(handle.clone());
    let guard = RegistrationGuard {
        conn_id,
        ctx: Arc::clone(&ctx),
        released: false,
    };

    let writer = spawn_writer(Arc::clone(&conn), rx);

    let welcome = Welcome {
        greeting: ctx.config().welcome_message.clone(),
    };
    let reason = match handle.send(&welcome.to_packet()?) {
        Ok(()) => read_loop(&conn, &ctx, &handle).await,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "could not queue welcome");
            Disconnect::Requested
        }
    };
    tracing::info!(%conn_id, %peer, ?reason, "connection closed");

    // Once the registry and this handle are gone, the queue closes and the
    // writer exits after flushing what is left, unless the peer has stopped
    // reading and the flush outlasts the drain timeout.
    guard.release().await;
    drop(handle);
    drain_writer(conn_id, writer, ctx.config().drain_timeout()).await;

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}

fn spawn_writer(
    conn: Arc<TcpConnection>,
    mut rx: mpsc::Receiver<Bytes>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            // A failed write is not fatal here; the read side sees the
            // broken stream and tears the connection down.
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            }
        }
    })
}

async fn drain_writer(conn_id: ConnectionId, mut writer: JoinHandle<()>, limit: Duration) {
    match tokio::time::timeout(limit, &mut writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "writer task ended abnormally"),
        Err(_) => {
            tracing::warn!(%conn_id, "peer is not reading, discarding unsent frames");
            writer.abort();
            let _ = writer.await;
        }
    }
}

async fn read_loop(
    conn: &TcpConnection,
    ctx: &ServerContext,
    handle: &ConnectionHandle,
) -> Disconnect {
    let conn_id = conn.id();
    let idle_timeout = ctx.config().idle_timeout();
    let mut decoder = FrameDecoder::new();

    loop {
        let next = async {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, conn.recv()).await.ok(),
                None => Some(conn.recv().await),
            }
        };
        let received = tokio::select! {
            () = handle.close_requested() => return Disconnect::Requested,
            next = next => match next {
                Some(received) => received,
                None => return Disconnect::IdleTimeout,
            },
        };

        let chunk = match received {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return Disconnect::PeerClosed,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Disconnect::ReadFailed;
            }
        };

        for frame in decoder.decode(&chunk) {
            let packet = match frame {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "dropping corrupt frame");
                    continue;
                }
            };

            let code = packet.code();
            tracing::trace!(%conn_id, code, len = packet.body().len(), "dispatching");
            if let Err(e) = ctx.dispatch(handle, packet).await {
                match e {
                    StrifeError::UnknownMessageType(_) => {
                        tracing::debug!(%conn_id, code, "no handler, message dropped")
                    }
                    e => tracing::warn!(%conn_id, code, error = %e, "message failed"),
                }
            }
            if handle.is_closing() {
                return Disconnect::Requested;
            }
        }
    }
}
