//! Unified error type for the Strife server.

use strife_protocol::ProtocolError;
use strife_room::RoomError;
use strife_transport::{ConnectionId, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StrifeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (corrupt frame, value out of range).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unknown room, tile out of bounds).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The dispatch table has no handler for this type code.
    #[error("no handler registered for message type {0}")]
    UnknownMessageType(u16),

    /// A handler panicked while processing a message of this type.
    #[error("handler for message type {0} panicked")]
    HandlerPanicked(u16),

    /// The connection's outbound queue is full; the peer is not reading.
    #[error("outbound queue full for {0}")]
    OutboundQueueFull(ConnectionId),

    /// The configuration file could not be parsed or written.
    #[error("config: {0}")]
    Config(String),

    /// Filesystem failure during bootstrap.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
