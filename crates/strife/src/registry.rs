//! Server-wide list of live connections.
//!
//! The registry is owned by [`crate::ServerContext`] behind a tokio mutex.
//! Every add, remove and iteration happens with that lock held, so a
//! broadcast can never observe a half-removed connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use strife_protocol::{Packet, PlayerId};
use strife_transport::{ConnectionId, TransportError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

use crate::StrifeError;

/// Per-connection state that changes after accept.
///
/// Shared by every clone of a [`ConnectionHandle`], so a flag set through
/// the registry is what the next handler on that connection sees.
#[derive(Debug, Default)]
struct SessionState {
    player: Mutex<Option<PlayerId>>,
    editor: AtomicBool,
    closing: AtomicBool,
    close_signal: Notify,
}

/// A cheap, cloneable handle to one connected client.
///
/// Sending never touches the socket directly. Frames are queued for the
/// connection's writer task, which writes each one whole. The queue is
/// bounded: a peer that lets it fill up is asked to disconnect.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    connected_at: Instant,
    state: Arc<SessionState>,
    outbound: mpsc::Sender<Bytes>,
}

impl ConnectionHandle {
    /// Creates a handle that delivers frames into `outbound`.
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            peer,
            connected_at: Instant::now(),
            state: Arc::new(SessionState::default()),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// How long this connection has been open.
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// The player bound to this connection, if any.
    pub fn player(&self) -> Option<PlayerId> {
        *self.state.player.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds (or with `None`, unbinds) a player.
    pub fn set_player(&self, player: Option<PlayerId>) {
        *self.state.player.lock().unwrap_or_else(PoisonError::into_inner) = player;
    }

    /// Whether the connection belongs to a world editor.
    pub fn is_editor(&self) -> bool {
        self.state.editor.load(Ordering::Acquire)
    }

    pub fn set_editor(&self, editor: bool) {
        self.state.editor.store(editor, Ordering::Release);
    }

    /// Asks the connection's read loop to stop and tear the connection down.
    pub fn request_close(&self) {
        self.state.closing.store(true, Ordering::Release);
        self.state.close_signal.notify_one();
    }

    pub fn is_closing(&self) -> bool {
        self.state.closing.load(Ordering::Acquire)
    }

    /// Completes once [`request_close`](Self::request_close) has been called.
    pub async fn close_requested(&self) {
        if self.is_closing() {
            return;
        }
        self.state.close_signal.notified().await;
    }

    /// Encodes `packet` and queues it for the writer task.
    ///
    /// # Errors
    /// [`StrifeError::Protocol`] if the packet cannot be framed,
    /// [`StrifeError::OutboundQueueFull`] if the peer has stopped reading, or
    /// [`StrifeError::Transport`] if the connection is already gone.
    pub fn send(&self, packet: &Packet) -> Result<(), StrifeError> {
        let frame = packet.to_frame()?;
        self.send_frame(frame)
    }

    /// Queues an already-encoded frame.
    ///
    /// A full queue also requests that the connection close.
    pub fn send_frame(&self, frame: Bytes) -> Result<(), StrifeError> {
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.request_close();
                Err(StrifeError::OutboundQueueFull(self.id))
            }
            Err(TrySendError::Closed(_)) => {
                Err(StrifeError::Transport(TransportError::ConnectionClosed(format!(
                    "{} writer has stopped",
                    self.id
                ))))
            }
        }
    }

    /// Whether the writer task is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// All currently registered connections, keyed by id.
///
/// Iteration order is unspecified and may change as connections come and go.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Re-adding an id replaces the old handle.
    pub fn add(&mut self, handle: ConnectionHandle) {
        tracing::debug!(conn_id = %handle.id, peer = %handle.peer, "registered connection");
        self.connections.insert(handle.id, handle);
    }

    /// Removes a connection, returning its handle if it was present.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        let removed = self.connections.remove(&id);
        if removed.is_some() {
            tracing::debug!(conn_id = %id, remaining = self.connections.len(), "deregistered connection");
        }
        removed
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.connections.values()
    }

    /// Binds a player to a registered connection.
    ///
    /// Returns `false` if the connection is not registered.
    pub fn associate_player(&mut self, id: ConnectionId, player: PlayerId) -> bool {
        match self.connections.get(&id) {
            Some(handle) => {
                handle.set_player(Some(player));
                true
            }
            None => false,
        }
    }

    /// Marks a registered connection as an editor (or not).
    pub fn set_editor(&mut self, id: ConnectionId, editor: bool) -> bool {
        match self.connections.get(&id) {
            Some(handle) => {
                handle.set_editor(editor);
                true
            }
            None => false,
        }
    }

    /// Queues `frame` on every registered connection.
    ///
    /// Connections whose writer has already stopped are skipped, and ones
    /// whose queue is full are asked to close. Returns how many connections
    /// accepted the frame.
    pub fn send_all(&self, frame: &Bytes) -> usize {
        let mut delivered = 0;
        for handle in self.connections.values() {
            match handle.send_frame(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e @ StrifeError::OutboundQueueFull(_)) => {
                    tracing::warn!(conn_id = %handle.id, error = %e, "dropping slow connection")
                }
                Err(e) => {
                    tracing::debug!(conn_id = %handle.id, error = %e, "skipping closed connection")
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strife_protocol::MessageType;

    fn handle(n: u64) -> (ConnectionHandle, mpsc::Receiver<Bytes>) {
        handle_with_capacity(n, 16)
    }

    fn handle_with_capacity(n: u64, capacity: usize) -> (ConnectionHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        (ConnectionHandle::new(ConnectionId::new(n), peer, tx), rx)
    }

    #[test]
    fn test_send_queues_a_whole_frame() {
        let (conn, mut rx) = handle(1);
        conn.send(&Packet::new(MessageType::PingRequest)).unwrap();
        let frame = rx.try_recv().unwrap();
        assert_eq!(&frame[..], &[2, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_send_after_receiver_dropped_fails() {
        let (conn, rx) = handle(1);
        drop(rx);
        assert!(!conn.is_open());
        let err = conn.send(&Packet::new(MessageType::PingRequest)).unwrap_err();
        assert!(matches!(err, StrifeError::Transport(_)));
    }

    #[test]
    fn test_add_remove() {
        let mut registry = ConnectionRegistry::new();
        let (a, _ra) = handle(1);
        let (b, _rb) = handle(2);
        registry.add(a);
        registry.add(b);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(ConnectionId::new(1)).is_some());
        assert!(registry.remove(ConnectionId::new(1)).is_none());
        assert!(!registry.contains(ConnectionId::new(1)));
        assert!(registry.contains(ConnectionId::new(2)));
    }

    #[test]
    fn test_player_and_editor_flags() {
        let mut registry = ConnectionRegistry::new();
        let (a, _ra) = handle(7);
        registry.add(a);

        assert!(registry.associate_player(ConnectionId::new(7), PlayerId(42)));
        assert!(registry.set_editor(ConnectionId::new(7), true));
        assert!(!registry.set_editor(ConnectionId::new(8), true));

        let got = registry.get(ConnectionId::new(7)).unwrap();
        assert_eq!(got.player(), Some(PlayerId(42)));
        assert!(got.is_editor());
    }

    #[test]
    fn test_flags_set_through_registry_reach_every_clone() {
        let mut registry = ConnectionRegistry::new();
        let (conn, _rx) = handle(3);
        registry.add(conn.clone());

        registry.associate_player(ConnectionId::new(3), PlayerId(9));
        registry.set_editor(ConnectionId::new(3), true);

        assert_eq!(conn.player(), Some(PlayerId(9)));
        assert!(conn.is_editor());

        conn.set_player(None);
        assert_eq!(registry.get(ConnectionId::new(3)).unwrap().player(), None);
    }

    #[test]
    fn test_full_queue_requests_close() {
        let (conn, _rx) = handle_with_capacity(4, 1);
        let ping = Packet::new(MessageType::PingRequest);
        conn.send(&ping).unwrap();
        assert!(!conn.is_closing());

        let err = conn.send(&ping).unwrap_err();
        assert!(matches!(err, StrifeError::OutboundQueueFull(id) if id == ConnectionId::new(4)));
        assert!(conn.is_closing());
    }

    #[tokio::test]
    async fn test_close_requested_completes_after_request() {
        let (conn, _rx) = handle(5);
        let waiter = conn.clone();
        let task = tokio::spawn(async move { waiter.close_requested().await });
        conn.request_close();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        // Already closing: returns at once.
        conn.close_requested().await;
    }

    #[test]
    fn test_send_all_skips_closed() {
        let mut registry = ConnectionRegistry::new();
        let (a, mut ra) = handle(1);
        let (b, rb) = handle(2);
        registry.add(a);
        registry.add(b);
        drop(rb);

        let frame = Packet::new(MessageType::PingRequest).to_frame().unwrap();
        assert_eq!(registry.send_all(&frame), 1);
        assert_eq!(ra.try_recv().unwrap(), frame);
    }
}
