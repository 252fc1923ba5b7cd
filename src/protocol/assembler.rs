//! Message reassembly for WebSocket (RFC 6455 Section 5.4).

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Reassembles data frames into messages.
///
/// Payloads are appended in arrival order. The message kind comes from the
/// initiating frame; continuations only extend it.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    fragment_count: usize,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    /// Create an assembler enforcing `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            fragment_count: 0,
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    ///
    /// Returns `Some(message)` when a frame with FIN set completes the
    /// message, `None` otherwise. Control frames are ignored.
    ///
    /// # Errors
    ///
    /// - `Error::Protocol` for a continuation with no message in progress or
    ///   a new Text/Binary frame while one is in progress
    /// - `Error::TooManyFragments` / `Error::MessageTooLarge` past the limits
    /// - `Error::InvalidUtf8` if a completed Text message is not UTF-8
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::Protocol("unexpected continuation frame".into()));
            }
            (OpCode::Continuation, Some(_)) => {}
            (opcode, None) => self.opcode = Some(opcode),
            (opcode, Some(current)) => {
                return Err(Error::Protocol(format!(
                    "expected continuation frame, got {opcode} while assembling {current}"
                )));
            }
        }

        self.limits.check_fragment_count(self.fragment_count + 1)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        self.buffer.extend_from_slice(frame.payload());
        self.fragment_count += 1;

        if !frame.fin {
            return Ok(None);
        }

        let payload = self.buffer.split().to_vec();
        let opcode = self.opcode.take();
        self.fragment_count = 0;

        match opcode {
            Some(OpCode::Text) => Ok(Some(Message::Text(String::from_utf8(payload)?))),
            _ => Ok(Some(Message::Binary(payload))),
        }
    }

    /// Returns `true` while a fragmented message is in progress.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Bytes buffered for the message in progress.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    fn small_limits() -> MessageAssembler {
        MessageAssembler::new(Limits::new(1024, 100, 3, 4096))
    }

    #[test]
    fn test_single_frame_message() {
        let mut assembler = assembler();
        let msg = assembler.push(Frame::text("Hello")).unwrap();
        assert_eq!(msg, Some(Message::text("Hello")));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_three_fragment_text() {
        let mut assembler = assembler();

        let f1 = Frame::new(false, OpCode::Text, b"He".to_vec());
        assert!(assembler.push(f1).unwrap().is_none());
        assert!(assembler.is_assembling());

        let f2 = Frame::new(false, OpCode::Continuation, b"ll".to_vec());
        assert!(assembler.push(f2).unwrap().is_none());
        assert_eq!(assembler.buffered(), 4);

        let f3 = Frame::new(true, OpCode::Continuation, b"o".to_vec());
        let msg = assembler.push(f3).unwrap();
        assert_eq!(msg, Some(Message::text("Hello")));
        assert!(!assembler.is_assembling());
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn test_binary_fragments_in_order() {
        let mut assembler = assembler();

        assert!(assembler.push(Frame::new(false, OpCode::Binary, vec![1, 2])).unwrap().is_none());
        assert!(
            assembler
                .push(Frame::new(false, OpCode::Continuation, vec![3, 4]))
                .unwrap()
                .is_none()
        );
        let msg = assembler
            .push(Frame::new(true, OpCode::Continuation, vec![5, 6]))
            .unwrap();
        assert_eq!(msg, Some(Message::Binary(vec![1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn test_interleaved_control_frame_ignored() {
        let mut assembler = assembler();

        assembler.push(Frame::new(false, OpCode::Text, b"Hel".to_vec())).unwrap();
        assert!(assembler.push(Frame::ping(b"ping".to_vec())).unwrap().is_none());
        assert!(assembler.is_assembling());

        let msg = assembler
            .push(Frame::new(true, OpCode::Continuation, b"lo".to_vec()))
            .unwrap();
        assert_eq!(msg, Some(Message::text("Hello")));
    }

    #[test]
    fn test_utf8_split_across_fragments() {
        let mut assembler = assembler();

        assembler.push(Frame::new(false, OpCode::Text, vec![0xf0, 0x9f])).unwrap();
        let msg = assembler
            .push(Frame::new(true, OpCode::Continuation, vec![0x8e, 0x89]))
            .unwrap();
        assert_eq!(msg, Some(Message::text("\u{1f389}")));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let mut assembler = assembler();
        let result = assembler.push(Frame::new(true, OpCode::Text, vec![0x80, 0x81]));
        assert_eq!(result, Err(Error::InvalidUtf8));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_binary_not_utf8_checked() {
        let mut assembler = assembler();
        let msg = assembler
            .push(Frame::new(true, OpCode::Binary, vec![0x80, 0x81, 0xff]))
            .unwrap();
        assert_eq!(msg, Some(Message::Binary(vec![0x80, 0x81, 0xff])));
    }

    #[test]
    fn test_continuation_without_start_fails() {
        let mut assembler = assembler();
        let result = assembler.push(Frame::new(true, OpCode::Continuation, b"data".to_vec()));
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_new_message_mid_sequence_fails() {
        let mut assembler = assembler();
        assembler.push(Frame::new(false, OpCode::Text, b"first".to_vec())).unwrap();

        let result = assembler.push(Frame::new(true, OpCode::Binary, b"second".to_vec()));
        assert!(matches!(result, Err(Error::Protocol(msg)) if msg.contains("continuation")));
    }

    #[test]
    fn test_max_message_size_exceeded() {
        let mut assembler = small_limits();
        let result = assembler.push(Frame::binary(vec![0u8; 150]));
        assert!(matches!(result, Err(Error::MessageTooLarge { size: 150, max: 100 })));
    }

    #[test]
    fn test_max_message_size_across_fragments() {
        let mut assembler = small_limits();
        assembler.push(Frame::new(false, OpCode::Binary, vec![0u8; 60])).unwrap();
        let result = assembler.push(Frame::new(true, OpCode::Continuation, vec![0u8; 60]));
        assert!(matches!(result, Err(Error::MessageTooLarge { .. })));
    }

    #[test]
    fn test_max_fragment_count_exceeded() {
        let mut assembler = small_limits();

        assert!(assembler.push(Frame::new(false, OpCode::Binary, vec![1])).is_ok());
        assert!(assembler.push(Frame::new(false, OpCode::Continuation, vec![2])).is_ok());
        assert!(assembler.push(Frame::new(false, OpCode::Continuation, vec![3])).is_ok());

        let result = assembler.push(Frame::new(true, OpCode::Continuation, vec![4]));
        assert!(matches!(result, Err(Error::TooManyFragments { .. })));
    }
}
