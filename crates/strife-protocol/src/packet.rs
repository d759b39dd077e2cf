//! A single application message: a type code plus a body buffer.
//!
//! On the wire a packet is framed as
//!
//! ```text
//! u32 total_len (LE) | u16 type (LE) | payload (total_len - 2 bytes)
//! ```
//!
//! `total_len` covers the type field and the payload, never itself.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{ByteBuffer, MessageType, ProtocolError};

/// Size of the `u32` length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;
/// Size of the `u16` type code.
pub const TYPE_CODE_LEN: usize = 2;

/// An inbound or outbound application message.
///
/// The body holds only the payload; the type code lives beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    code: u16,
    body: ByteBuffer,
}

impl Packet {
    /// Starts an empty outbound packet of the given type.
    pub fn new(kind: MessageType) -> Self {
        Self::with_code(kind.code())
    }

    /// Starts an empty packet with a raw type code that may not be a
    /// known [`MessageType`].
    pub fn with_code(code: u16) -> Self {
        Self {
            code,
            body: ByteBuffer::new(),
        }
    }

    /// Parses one frame body (type code first, then payload) as produced by
    /// [`crate::FrameDecoder`].
    ///
    /// # Errors
    /// [`ProtocolError::FrameCorruption`] if the frame is too short to hold
    /// a type code.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < TYPE_CODE_LEN {
            return Err(ProtocolError::FrameCorruption(format!(
                "frame of {} bytes has no room for a type code",
                frame.len()
            )));
        }
        let (head, payload) = frame.split_at(TYPE_CODE_LEN);
        Ok(Self {
            code: u16::from_le_bytes([head[0], head[1]]),
            body: ByteBuffer::from(payload),
        })
    }

    /// The raw 16-bit type code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The message type, or `None` if the code is not one we know.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.code).ok()
    }

    /// Read access to the payload.
    pub fn body(&self) -> &ByteBuffer {
        &self.body
    }

    /// Mutable access to the payload, for reading fields or appending them.
    pub fn body_mut(&mut self) -> &mut ByteBuffer {
        &mut self.body
    }

    /// Encodes the packet as a complete frame ready to write to a stream.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingRange`] if the payload is too large for the
    /// `u32` length prefix.
    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        let payload = self.body.as_bytes();
        let total = payload.len() + TYPE_CODE_LEN;
        let declared = u32::try_from(total).map_err(|_| {
            ProtocolError::EncodingRange {
                value: total as i64,
                width: "u32",
            }
        })?;

        let mut out = BytesMut::with_capacity(LENGTH_PREFIX_LEN + total);
        out.put_u32_le(declared);
        out.put_u16_le(self.code);
        out.extend_from_slice(payload);
        Ok(out.freeze())
    }
}
