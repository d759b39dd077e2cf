//! Reassembles packets out of an arbitrarily fragmented byte stream.
//!
//! A stream read can return half a header, three frames glued together, or
//! anything in between. [`FrameDecoder`] accumulates whatever arrives and
//! hands back complete packets one at a time, in arrival order. Bytes that
//! do not yet form a whole frame stay buffered for the next read.
//!
//! The decoder is a two-state machine:
//!
//! ```text
//!            ≥4 bytes: take u32 length
//! AwaitingHeader ──────────────────────→ AwaitingBody(len)
//!       ↑                                      │
//!       └──────── ≥len bytes: emit frame ──────┘
//! ```
//!
//! A partial header is never interpreted as a length.

use bytes::{Buf, BytesMut};

use crate::packet::{LENGTH_PREFIX_LEN, TYPE_CODE_LEN};
use crate::{Packet, ProtocolError};

/// Largest frame accepted by default (8 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Capacity kept around while a connection sits idle.
const IDLE_CAPACITY: usize = 8 * 1024;

/// Where the decoder is inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Need at least four bytes to read the next length prefix.
    AwaitingHeader,
    /// Have a declared length; waiting for that many body bytes.
    AwaitingBody(usize),
}

/// Stateful per-connection frame reassembler.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    state: DecodeState,
    max_frame_len: usize,
    stalled: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(IDLE_CAPACITY),
            state: DecodeState::AwaitingHeader,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            stalled: false,
        }
    }

    /// Caps the declared length a frame may carry.
    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max.max(TYPE_CODE_LEN);
        self
    }

    /// Current state of the machine.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Bytes received but not yet handed out as part of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        if !chunk.is_empty() {
            self.buf.extend_from_slice(chunk);
            self.stalled = false;
        }
    }

    /// Pulls the next complete packet out of the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Call in a loop after
    /// every [`extend`](Self::extend) until it stops yielding.
    ///
    /// # Errors
    /// [`ProtocolError::FrameCorruption`] if a frame is too short to carry a
    /// type code or declares more than the configured maximum. The bad frame
    /// is discarded; an oversized declaration also drops everything buffered
    /// since there is no way to find the next frame boundary.
    pub fn next_frame(&mut self) -> Result<Option<Packet>, ProtocolError> {
        if self.stalled {
            return Ok(None);
        }

        loop {
            match self.state {
                DecodeState::AwaitingHeader => {
                    if self.buf.len() < LENGTH_PREFIX_LEN {
                        return Ok(None);
                    }
                    let declared = self.buf.get_u32_le() as usize;

                    if declared == 0 {
                        // Never produced by a real peer. Skip it and wait
                        // for more bytes before looking again.
                        tracing::trace!("skipping zero length prefix");
                        self.stalled = true;
                        self.shrink_if_idle();
                        return Ok(None);
                    }

                    if declared > self.max_frame_len {
                        let max = self.max_frame_len;
                        self.reset();
                        return Err(ProtocolError::FrameCorruption(format!(
                            "declared length {declared} exceeds maximum {max}"
                        )));
                    }

                    self.state = DecodeState::AwaitingBody(declared);
                }
                DecodeState::AwaitingBody(len) => {
                    if self.buf.len() < len {
                        return Ok(None);
                    }
                    let frame = self.buf.split_to(len);
                    self.state = DecodeState::AwaitingHeader;
                    self.shrink_if_idle();
                    return Packet::from_frame(&frame).map(Some);
                }
            }
        }
    }

    /// Convenience wrapper: [`extend`](Self::extend) with `chunk`, then drain
    /// every result [`next_frame`](Self::next_frame) produces.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Result<Packet, ProtocolError>> {
        self.extend(chunk);
        let mut out = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(packet)) => out.push(Ok(packet)),
                Ok(None) => break,
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    /// Drops all buffered bytes and returns to [`DecodeState::AwaitingHeader`].
    pub fn reset(&mut self) {
        self.buf = BytesMut::with_capacity(IDLE_CAPACITY);
        self.state = DecodeState::AwaitingHeader;
        self.stalled = false;
    }

    fn shrink_if_idle(&mut self) {
        if self.buf.is_empty() && self.buf.capacity() > IDLE_CAPACITY {
            self.buf = BytesMut::with_capacity(IDLE_CAPACITY);
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageType;

    fn frame(kind: MessageType, payload: &[u8]) -> Vec<u8> {
        let mut packet = Packet::new(kind);
        packet.body_mut().write_bytes(payload);
        packet.to_frame().unwrap().to_vec()
    }

    fn ok_packets(results: Vec<Result<Packet, ProtocolError>>) -> Vec<Packet> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_single_frame_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let packets = ok_packets(decoder.decode(&frame(MessageType::PingRequest, &[])));
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].message_type(), Some(MessageType::PingRequest));
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.state(), DecodeState::AwaitingHeader);
    }

    #[test]
    fn test_ping_response_split_three_two_one() {
        let bytes = frame(MessageType::PingResponse, &[]);
        assert_eq!(bytes.len(), 6);

        let mut decoder = FrameDecoder::new();
        let mut seen = Vec::new();
        seen.extend(decoder.decode(&bytes[0..3]));
        assert!(seen.is_empty());
        seen.extend(decoder.decode(&bytes[3..5]));
        assert!(seen.is_empty());
        assert_eq!(decoder.state(), DecodeState::AwaitingBody(2));
        seen.extend(decoder.decode(&bytes[5..6]));

        let packets = ok_packets(seen);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].code(), 2);
        assert_eq!(packets[0].body().unread_len(), 0);
    }

    #[test]
    fn test_coalesced_frames_come_out_in_order() {
        let mut stream = frame(MessageType::PingRequest, &[]);
        stream.extend(frame(MessageType::RoomUpdateName, b"abc"));
        stream.extend(frame(MessageType::PingResponse, &[]));

        let mut decoder = FrameDecoder::new();
        let packets = ok_packets(decoder.decode(&stream));
        let codes: Vec<u16> = packets.iter().map(Packet::code).collect();
        assert_eq!(codes, vec![1, 1000, 2]);
        assert_eq!(packets[1].body().remaining(), b"abc");
    }

    #[test]
    fn test_fragmentation_invariance_for_every_chunk_size() {
        let mut stream = Vec::new();
        for i in 0..5u8 {
            let payload: Vec<u8> = (0..i * 7).collect();
            stream.extend(frame(MessageType::RoomMiscUpdate, &payload));
        }

        let mut whole = FrameDecoder::new();
        let expected = ok_packets(whole.decode(&stream));
        assert_eq!(expected.len(), 5);

        for chunk_size in 1..=stream.len() {
            let mut decoder = FrameDecoder::new();
            let mut got = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                got.extend(ok_packets(decoder.decode(chunk)));
            }
            assert_eq!(got, expected, "chunk size {chunk_size}");
            assert_eq!(decoder.buffered_len(), 0);
        }
    }

    #[test]
    fn test_partial_trailing_frame_is_kept() {
        let first = frame(MessageType::PingRequest, &[]);
        let second = frame(MessageType::Welcome, b"hello");
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second[..3]);

        let mut decoder = FrameDecoder::new();
        assert_eq!(ok_packets(decoder.decode(&chunk)).len(), 1);
        assert_eq!(decoder.buffered_len(), 3);

        let packets = ok_packets(decoder.decode(&second[3..]));
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].body().remaining(), b"hello");
    }

    #[test]
    fn test_zero_prefix_stalls_until_more_bytes_arrive() {
        let mut chunk = vec![0, 0, 0, 0];
        chunk.extend(frame(MessageType::PingRequest, &[]));

        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode(&chunk).is_empty());
        // Nothing new arrived, so nothing moves.
        assert!(decoder.next_frame().unwrap().is_none());

        let packets = ok_packets(decoder.decode(&frame(MessageType::PingResponse, &[])));
        let codes: Vec<u16> = packets.iter().map(Packet::code).collect();
        assert_eq!(codes, vec![1, 2]);
    }

    #[test]
    fn test_frame_without_type_code_is_corruption_then_resyncs() {
        let mut chunk = vec![1, 0, 0, 0, 0xFF];
        chunk.extend(frame(MessageType::PingRequest, &[]));

        let mut decoder = FrameDecoder::new();
        let results = decoder.decode(&chunk);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(ProtocolError::FrameCorruption(_))));
        assert_eq!(results[1].as_ref().unwrap().code(), 1);
    }

    #[test]
    fn test_oversized_declaration_drops_buffer() {
        let mut decoder = FrameDecoder::new().max_frame_len(16);
        let results = decoder.decode(&[100, 0, 0, 0, 1, 2, 3]);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ProtocolError::FrameCorruption(_))));
        assert_eq!(decoder.buffered_len(), 0);

        let packets = ok_packets(decoder.decode(&frame(MessageType::PingRequest, &[])));
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn test_large_payload_split_across_reads() {
        let payload = vec![0xA5u8; 100_000];
        let bytes = frame(MessageType::RoomCountResponse, &payload);

        let mut decoder = FrameDecoder::new();
        let mut got = Vec::new();
        for chunk in bytes.chunks(4096) {
            got.extend(ok_packets(decoder.decode(chunk)));
        }
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].body().len(), 100_000);
    }
}
