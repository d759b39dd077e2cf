//! Error types for the protocol layer.
//!
//! Each crate in Strife defines its own error enum. A `ProtocolError`
//! always means the problem is in the bytes themselves: a frame that
//! does not hold what it claims to hold, or a value that cannot be
//! represented in the field it is being written to.

/// Errors that can occur while reading, writing, or framing packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes do not match their declared layout.
    ///
    /// Raised when a read asks for more bytes than remain unread, when a
    /// fixed-length identifier declares the wrong size, or when a frame
    /// header announces a length that cannot be a valid message. Only the
    /// current message is abandoned; the connection carries on.
    #[error("frame corruption: {0}")]
    FrameCorruption(String),

    /// An outbound value does not fit in its target field.
    ///
    /// The write is rejected before any byte is appended, so a caller
    /// never ends up holding a half-built message.
    #[error("value {value} does not fit in a {width} field")]
    EncodingRange {
        /// The value that was rejected.
        value: i64,
        /// Human-readable name of the target field width.
        width: &'static str,
    },

    /// The message decoded cleanly but its content breaks protocol rules,
    /// e.g. an unknown update kind.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    pub(crate) fn truncated(wanted: usize, available: usize) -> Self {
        Self::FrameCorruption(format!(
            "wanted {wanted} bytes but only {available} remain unread"
        ))
    }
}
