//! Messages, close codes and the events delivered to a connection's reader.

use crate::error::{Error, Result};
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;

/// Maximum close reason length: control payload minus the 2-byte code.
pub const MAX_CLOSE_REASON: usize = MAX_CONTROL_FRAME_PAYLOAD - 2;

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000). The connection successfully completed.
    #[default]
    Normal,
    /// Going away (1001). Endpoint is going away (e.g., server shutdown).
    GoingAway,
    /// Protocol error (1002). Endpoint received a malformed frame or protocol violation.
    ProtocolError,
    /// Unsupported data (1003). Endpoint received data type it cannot handle.
    UnsupportedData,
    /// No status received (1005). Reported when a Close frame carries no code;
    /// never sent on the wire.
    NoStatusReceived,
    /// Invalid payload (1007). Endpoint received a message with invalid data.
    InvalidPayload,
    /// Policy violation (1008). Endpoint received a message that violates its policy.
    PolicyViolation,
    /// Message too big (1009). Endpoint received a message too large to process.
    MessageTooBig,
    /// Internal error (1011). Server encountered an unexpected condition.
    InternalError,
    /// Any other code (1010, 1012-1014, 3000-4999, or invalid values).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1005 => CloseCode::NoStatusReceived,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::NoStatusReceived => 1005,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code may be sent in a Close frame (RFC 6455 Section 7.4.1).
    ///
    /// Valid codes:
    /// - 1000-1003
    /// - 1007-1014
    /// - 3000-4999: reserved for libraries, frameworks and applications
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Status code and reason carried by a Close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// The numeric close status code.
    pub code: u16,
    /// Human-readable reason (UTF-8, at most 123 bytes).
    pub reason: String,
}

impl CloseEvent {
    /// Create a close event.
    #[must_use]
    pub fn new(code: impl Into<u16>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Parse a Close frame payload.
    ///
    /// - empty payload: code 1005, empty reason
    /// - one byte: code 1002 (a lone byte cannot hold a status code)
    /// - reason that is not UTF-8: code 1007, empty reason
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        match payload {
            [] => Self::new(CloseCode::NoStatusReceived, ""),
            [_] => Self::new(CloseCode::ProtocolError, ""),
            [hi, lo, reason @ ..] => match std::str::from_utf8(reason) {
                Ok(reason) => Self::new(u16::from_be_bytes([*hi, *lo]), reason),
                Err(_) => Self::new(CloseCode::InvalidPayload, ""),
            },
        }
    }

    /// The code as a [`CloseCode`].
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        CloseCode::from_u16(self.code)
    }

    /// Check that this event may be sent in a Close frame.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` if the code is reserved or out of range
    /// - `Error::Protocol` if the reason is longer than 123 bytes
    pub fn validate(&self) -> Result<()> {
        if !self.close_code().is_valid() {
            return Err(Error::InvalidCloseCode(self.code));
        }
        if self.reason.len() > MAX_CLOSE_REASON {
            return Err(Error::Protocol(format!(
                "close reason too long: {} bytes (max: {MAX_CLOSE_REASON})",
                self.reason.len()
            )));
        }
        Ok(())
    }
}

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Vec<u8>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Message::Text(s) => s.len(),
            Message::Binary(data) => data.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the text content, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Borrow the binary content, if this is a binary message.
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Message::Binary(data) => Some(data),
            Message::Text(_) => None,
        }
    }

    /// Consume and return the text content, if this is a text message.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Consume and return the raw payload bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Message::Text(s) => s.into_bytes(),
            Message::Binary(data) => data,
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Message::Binary(data.to_vec())
    }
}

/// Something that happened on the inbound side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete text or binary message.
    Message(Message),
    /// A Ping was received. The Pong reply has already been queued.
    Ping(Vec<u8>),
    /// A Pong was received.
    Pong(Vec<u8>),
    /// The peer closed the connection. Always the last event.
    Close(CloseEvent),
}

impl Event {
    /// Consume and return the message, if this is a message event.
    #[must_use]
    pub fn into_message(self) -> Option<Message> {
        match self {
            Event::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns `true` for [`Event::Close`].
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Event::Close(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        assert_eq!(Message::text("hello"), Message::Text("hello".into()));
        assert_eq!(Message::binary([4, 5, 6]), Message::Binary(vec![4, 5, 6]));
        assert_eq!(Message::from("hi"), Message::Text("hi".into()));
        assert_eq!(Message::from(vec![1u8]), Message::Binary(vec![1]));
    }

    #[test]
    fn test_message_accessors() {
        let text = Message::text("hello");
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.as_binary(), None);
        assert_eq!(text.len(), 5);

        let bin = Message::binary(vec![1, 2, 3]);
        assert!(bin.is_binary());
        assert_eq!(bin.as_binary(), Some([1, 2, 3].as_slice()));
        assert_eq!(bin.clone().into_text(), None);
        assert_eq!(bin.into_bytes(), vec![1, 2, 3]);

        assert!(Message::binary(Vec::new()).is_empty());
    }

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(1000), CloseCode::Normal);
        assert_eq!(CloseCode::from_u16(1001), CloseCode::GoingAway);
        assert_eq!(CloseCode::from_u16(1002), CloseCode::ProtocolError);
        assert_eq!(CloseCode::from_u16(1005), CloseCode::NoStatusReceived);
        assert_eq!(CloseCode::from_u16(1007), CloseCode::InvalidPayload);
        assert_eq!(CloseCode::from_u16(1011), CloseCode::InternalError);
        assert_eq!(CloseCode::from_u16(1010), CloseCode::Other(1010));
        assert_eq!(CloseCode::from_u16(4999), CloseCode::Other(4999));
    }

    #[test]
    fn test_close_code_validity() {
        for code in [1000, 1001, 1002, 1003, 1007, 1010, 1011, 1012, 1014, 3000, 4999] {
            assert!(CloseCode::from_u16(code).is_valid(), "{code} should be valid");
        }
        for code in [0, 999, 1004, 1005, 1006, 1015, 2999, 5000] {
            assert!(!CloseCode::from_u16(code).is_valid(), "{code} should be invalid");
        }
    }

    #[test]
    fn test_close_event_from_payload() {
        let mut payload = 1000u16.to_be_bytes().to_vec();
        payload.extend_from_slice(b"bye");
        assert_eq!(CloseEvent::from_payload(&payload), CloseEvent::new(1000u16, "bye"));

        assert_eq!(
            CloseEvent::from_payload(&4001u16.to_be_bytes()),
            CloseEvent::new(4001u16, "")
        );
    }

    #[test]
    fn test_close_event_from_short_payloads() {
        assert_eq!(CloseEvent::from_payload(&[]).code, 1005);
        assert_eq!(CloseEvent::from_payload(&[0x03]).code, 1002);
    }

    #[test]
    fn test_close_event_invalid_utf8_reason() {
        let event = CloseEvent::from_payload(&[0x03, 0xe8, 0xff, 0xfe]);
        assert_eq!(event.code, 1007);
        assert!(event.reason.is_empty());
    }

    #[test]
    fn test_close_event_validate() {
        assert!(CloseEvent::new(CloseCode::Normal, "bye").validate().is_ok());
        assert_eq!(
            CloseEvent::new(1005u16, "").validate(),
            Err(Error::InvalidCloseCode(1005))
        );

        let long = "x".repeat(MAX_CLOSE_REASON + 1);
        assert!(matches!(
            CloseEvent::new(CloseCode::Normal, long).validate(),
            Err(Error::Protocol(_))
        ));
        let exact = "x".repeat(MAX_CLOSE_REASON);
        assert!(CloseEvent::new(CloseCode::Normal, exact).validate().is_ok());
    }

    #[test]
    fn test_event_helpers() {
        let event = Event::Message(Message::text("hi"));
        assert!(!event.is_close());
        assert_eq!(event.into_message(), Some(Message::text("hi")));

        let close = Event::Close(CloseEvent::new(1000u16, ""));
        assert!(close.is_close());
        assert_eq!(close.into_message(), None);
    }
}
