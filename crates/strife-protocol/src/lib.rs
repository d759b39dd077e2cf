//! Wire protocol for Strife.
//!
//! This crate defines the bytes that clients and the server exchange:
//!
//! - **Buffers** ([`ByteBuffer`]): typed little-endian reads and writes
//!   over a single cursor-addressed byte run.
//! - **Packets** ([`Packet`], [`MessageType`]): one application message,
//!   and how it is framed on the stream.
//! - **Framing** ([`FrameDecoder`]): turns a fragmented byte stream back
//!   into whole packets.
//! - **Errors** ([`ProtocolError`]): what can go wrong in any of the above.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the server's
//! dispatch table. It knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → FrameDecoder → Packet → dispatch table
//! ```

mod buffer;
mod error;
mod frame;
mod packet;
mod types;

pub use buffer::{ByteBuffer, UUID_TEXT_LEN};
pub use error::ProtocolError;
pub use frame::{DecodeState, FrameDecoder, DEFAULT_MAX_FRAME_LEN};
pub use packet::{Packet, LENGTH_PREFIX_LEN, TYPE_CODE_LEN};
pub use types::{MessageType, PlayerId};
