//! Cursor-addressed byte buffer used to build and pick apart packet bodies.
//!
//! A [`ByteBuffer`] is one growable run of bytes plus a read cursor.
//! Writes always append to the end; reads always start at the cursor and
//! move it forward. There is no write cursor, so a buffer can be filled,
//! handed over, and read back without any bookkeeping in between.
//!
//! Every multi-byte integer is little-endian. Strings carry a `u16` length
//! prefix. Room identifiers are written as 36-character hyphenated UUID
//! text, either length-prefixed ([`ByteBuffer::write_uuid`]) or bare
//! ([`ByteBuffer::write_raw_uuid`]).

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::ProtocolError;

/// Length of a hyphenated UUID in text form.
pub const UUID_TEXT_LEN: usize = 36;

/// A growable byte buffer with a monotonically advancing read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    buf: BytesMut,
    cursor: usize,
}

impl ByteBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Total number of bytes held, read or not.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has ever been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of bytes already consumed by reads.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes still available to read, floored at zero.
    pub fn unread_len(&self) -> usize {
        self.buf.len().saturating_sub(self.cursor)
    }

    /// The whole buffer, including bytes already read.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The unread tail of the buffer. Does not move the cursor.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.cursor.min(self.buf.len())..]
    }

    /// Moves the read cursor back to the start.
    pub fn rewind(&mut self) -> &mut Self {
        self.cursor = 0;
        self
    }

    /// Freezes the buffer into an immutable [`Bytes`].
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Appends a single byte.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    /// Appends a boolean as one byte (`1` or `0`).
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64_le(value);
        self
    }

    /// Appends raw bytes with no length prefix.
    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Appends an arbitrary integer as a single byte.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingRange`] if `value` is outside `0..=255`.
    /// The buffer is left untouched in that case.
    pub fn write_int_u8(
        &mut self,
        value: impl Into<i64>,
    ) -> Result<&mut Self, ProtocolError> {
        let value = value.into();
        let byte = u8::try_from(value).map_err(|_| {
            ProtocolError::EncodingRange { value, width: "u8" }
        })?;
        Ok(self.write_u8(byte))
    }

    /// Appends an arbitrary integer as a little-endian `u16`.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingRange`] if `value` is outside `0..=65535`.
    pub fn write_int_u16(
        &mut self,
        value: impl Into<i64>,
    ) -> Result<&mut Self, ProtocolError> {
        let value = value.into();
        let word = u16::try_from(value).map_err(|_| {
            ProtocolError::EncodingRange { value, width: "u16" }
        })?;
        Ok(self.write_u16(word))
    }

    /// Appends a `u16` length followed by the UTF-8 bytes of `value`.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingRange`] if the text is longer than
    /// 65535 bytes.
    pub fn write_string(
        &mut self,
        value: &str,
    ) -> Result<&mut Self, ProtocolError> {
        self.write_int_u16(value.len() as i64)?;
        Ok(self.write_bytes(value.as_bytes()))
    }

    /// Appends a length-prefixed, 36-character UUID text field.
    pub fn write_uuid(&mut self, id: &Uuid) -> &mut Self {
        self.write_u16(UUID_TEXT_LEN as u16).write_raw_uuid(id)
    }

    /// Appends 36 bytes of UUID text with no length prefix.
    pub fn write_raw_uuid(&mut self, id: &Uuid) -> &mut Self {
        let mut text = [0u8; UUID_TEXT_LEN];
        id.hyphenated().encode_lower(&mut text);
        self.write_bytes(&text)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Consumes exactly `n` unread bytes.
    ///
    /// # Errors
    /// [`ProtocolError::FrameCorruption`] if fewer than `n` bytes remain.
    /// The cursor does not move on failure.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8], ProtocolError> {
        let available = self.unread_len();
        if n > available {
            return Err(ProtocolError::truncated(n, available));
        }
        let start = self.cursor;
        self.cursor += n;
        Ok(&self.buf[start..self.cursor])
    }

    /// Consumes every unread byte.
    pub fn read_remaining(&mut self) -> &[u8] {
        let start = self.cursor.min(self.buf.len());
        self.cursor = self.buf.len();
        &self.buf[start..]
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads one byte as a boolean; any non-zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a `u16`-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u16()? as usize;
        let raw = self.read_bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| {
            ProtocolError::FrameCorruption(format!("string is not utf-8: {e}"))
        })
    }

    /// Reads a length-prefixed UUID text field.
    ///
    /// # Errors
    /// [`ProtocolError::FrameCorruption`] if the declared length is not 36
    /// or the text is not a UUID.
    pub fn read_uuid(&mut self) -> Result<Uuid, ProtocolError> {
        let len = self.read_u16()? as usize;
        if len != UUID_TEXT_LEN {
            return Err(ProtocolError::FrameCorruption(format!(
                "identifier declared {len} bytes, expected {UUID_TEXT_LEN}"
            )));
        }
        self.read_raw_uuid()
    }

    /// Reads 36 bytes of UUID text with no length prefix.
    pub fn read_raw_uuid(&mut self) -> Result<Uuid, ProtocolError> {
        let raw = self.read_bytes(UUID_TEXT_LEN)?;
        std::str::from_utf8(raw)
            .ok()
            .and_then(|text| Uuid::try_parse(text).ok())
            .ok_or_else(|| {
                ProtocolError::FrameCorruption(
                    "identifier is not uuid text".into(),
                )
            })
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(data),
            cursor: 0,
        }
    }
}

impl From<Bytes> for ByteBuffer {
    fn from(data: Bytes) -> Self {
        Self::from(data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_little_endian_and_chainable() {
        let mut buf = ByteBuffer::new();
        buf.write_u8(0xAB)
            .write_u16(0x0102)
            .write_u32(0x0304_0506)
            .write_bool(true);
        assert_eq!(
            buf.as_bytes(),
            &[0xAB, 0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x01]
        );
    }

    #[test]
    fn test_reads_advance_cursor() {
        let mut buf = ByteBuffer::new();
        buf.write_u16(7).write_u64(u64::MAX).write_bool(false);

        assert_eq!(buf.read_u16().unwrap(), 7);
        assert_eq!(buf.cursor(), 2);
        assert_eq!(buf.read_u64().unwrap(), u64::MAX);
        assert!(!buf.read_bool().unwrap());
        assert_eq!(buf.unread_len(), 0);
    }

    #[test]
    fn test_read_bytes_past_end_is_frame_corruption() {
        let mut buf = ByteBuffer::from(&[1u8, 2, 3][..]);
        let err = buf.read_bytes(4).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameCorruption(_)));
        // A failed read leaves the cursor where it was.
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.read_bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_read_u32_on_short_buffer_fails() {
        let mut buf = ByteBuffer::from(&[1u8, 2][..]);
        assert!(matches!(
            buf.read_u32(),
            Err(ProtocolError::FrameCorruption(_))
        ));
    }

    #[test]
    fn test_write_int_u8_rejects_256_without_touching_buffer() {
        let mut buf = ByteBuffer::new();
        buf.write_u8(9);
        let err = buf.write_int_u8(256).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::EncodingRange {
                value: 256,
                width: "u8"
            }
        );
        assert_eq!(buf.as_bytes(), &[9]);
    }

    #[test]
    fn test_write_int_u8_rejects_negative() {
        let mut buf = ByteBuffer::new();
        assert!(buf.write_int_u8(-1).is_err());
        assert!(buf.is_empty());
        buf.write_int_u8(255).unwrap();
        assert_eq!(buf.as_bytes(), &[255]);
    }

    #[test]
    fn test_string_round_trip() {
        for text in ["", "a", "Welcome to the server", "ünïcødé ✓"] {
            let mut buf = ByteBuffer::new();
            buf.write_string(text).unwrap();
            assert_eq!(buf.read_string().unwrap(), text);
            assert_eq!(buf.unread_len(), 0);
        }
    }

    #[test]
    fn test_string_at_max_length_round_trips() {
        let text = "x".repeat(u16::MAX as usize);
        let mut buf = ByteBuffer::new();
        buf.write_string(&text).unwrap();
        assert_eq!(buf.read_string().unwrap().len(), u16::MAX as usize);
    }

    #[test]
    fn test_string_longer_than_u16_is_rejected() {
        let text = "x".repeat(u16::MAX as usize + 1);
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.write_string(&text),
            Err(ProtocolError::EncodingRange { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_string_with_short_body_is_frame_corruption() {
        let mut buf = ByteBuffer::new();
        buf.write_u16(10).write_bytes(b"abc");
        assert!(matches!(
            buf.read_string(),
            Err(ProtocolError::FrameCorruption(_))
        ));
    }

    #[test]
    fn test_uuid_is_written_as_prefixed_text() {
        let id = Uuid::new_v4();
        let mut buf = ByteBuffer::new();
        buf.write_uuid(&id);
        assert_eq!(buf.len(), 2 + UUID_TEXT_LEN);
        assert_eq!(&buf.as_bytes()[..2], &[36, 0]);
        assert_eq!(&buf.as_bytes()[2..], id.to_string().as_bytes());
        assert_eq!(buf.read_uuid().unwrap(), id);
    }

    #[test]
    fn test_uuid_with_wrong_declared_length_is_rejected() {
        let id = Uuid::new_v4();
        let mut buf = ByteBuffer::new();
        buf.write_u16(35).write_raw_uuid(&id);
        assert!(matches!(
            buf.read_uuid(),
            Err(ProtocolError::FrameCorruption(_))
        ));
    }

    #[test]
    fn test_raw_uuid_with_garbage_text_is_rejected() {
        let mut buf = ByteBuffer::from(&[b'z'; UUID_TEXT_LEN][..]);
        assert!(buf.read_raw_uuid().is_err());
    }

    #[test]
    fn test_read_remaining_consumes_tail() {
        let mut buf = ByteBuffer::from(&b"headtail"[..]);
        buf.read_bytes(4).unwrap();
        assert_eq!(buf.remaining(), b"tail");
        assert_eq!(buf.read_remaining(), b"tail");
        assert_eq!(buf.unread_len(), 0);
        assert!(buf.read_remaining().is_empty());
    }
}
