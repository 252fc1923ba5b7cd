//! Error types for the WebSocket engine.
//!
//! Read-side errors end the event stream of a connection, handshake errors
//! are returned to whichever side performs the upgrade, and queue errors are
//! returned synchronously at the call site.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Malformed frame or protocol violation (bad signature, bad mask
    /// length, reserved opcode, broken fragment sequence).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Declared frame length exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared payload length.
        size: u64,
        /// Maximum allowed length.
        max: u64,
    },

    /// Reassembled message exceeds the configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Fragment count reached.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Text message payload is not valid UTF-8.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// The stream ended before a complete frame was read.
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// The HTTP upgrade handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Handshake head exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes read so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Operation attempted on a closed connection.
    #[error("Connection reset")]
    ConnectionReset,

    /// The send queue holds the maximum number of pending frames.
    #[error("Send queue full: {depth} frames pending")]
    QueueFull {
        /// Number of frames waiting to be written.
        depth: usize,
    },

    /// Invalid close code.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Returns `true` for errors caused by malformed peer input.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_)
                | Error::FrameTooLarge { .. }
                | Error::MessageTooLarge { .. }
                | Error::TooManyFragments { .. }
                | Error::InvalidUtf8
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(err.to_string()),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8
    }
}
