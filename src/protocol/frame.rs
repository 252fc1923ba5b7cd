//! WebSocket frame encoding and decoding (RFC 6455 Section 5.2).
//!
//! [`write_frame`] serializes one frame and flushes the writer;
//! [`read_frame`] decodes one frame from a buffered stream, reading exactly
//! the declared number of bytes or failing.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{apply_mask_fast, mask_key, unmask};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest payload encoded with the 7-bit length field.
const MAX_SHORT_LEN: usize = 125;

/// Largest payload encoded with the 16-bit length field.
const MAX_MEDIUM_LEN: usize = u16::MAX as usize;

/// A WebSocket frame as defined in RFC 6455.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// RSV bits are never set by this crate and are rejected on input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last frame of a message.
    pub fin: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    /// Masking key. Must be 4 bytes when present.
    pub mask: Option<Vec<u8>>,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            opcode,
            mask: None,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    ///
    /// Without a code the payload is empty and `reason` is ignored.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = if let Some(code) = code {
            let mut data = Vec::with_capacity(2 + reason.len());
            data.extend_from_slice(&code.to_be_bytes());
            data.extend_from_slice(reason.as_bytes());
            data
        } else {
            Vec::new()
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Set the masking key.
    #[must_use]
    pub fn with_mask(mut self, mask: impl Into<Vec<u8>>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Unmask the payload in place and drop the key.
    ///
    /// Frames returned by [`read_frame`] still carry the masked payload;
    /// call this before interpreting it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the key is not 4 bytes long.
    pub fn unmask(&mut self) -> Result<()> {
        unmask(&mut self.payload, self.mask.as_deref())?;
        self.mask = None;
        Ok(())
    }

    /// Check control frame rules (RFC 6455 Section 5.5).
    ///
    /// # Errors
    ///
    /// - `Error::Protocol` if a control frame is fragmented or its payload
    ///   exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::Protocol(format!(
                    "fragmented {} frame",
                    self.opcode
                )));
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::Protocol(format!(
                    "{} payload too large: {} bytes (max: {MAX_CONTROL_FRAME_PAYLOAD})",
                    self.opcode,
                    self.payload.len()
                )));
            }
        }
        Ok(())
    }

    /// Size of the encoded frame in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        let len = self.payload.len();
        let extended = if len <= MAX_SHORT_LEN {
            0
        } else if len <= MAX_MEDIUM_LEN {
            2
        } else {
            8
        };
        let mask = if self.mask.is_some() { 4 } else { 0 };
        2 + extended + mask + len
    }

    /// Append the wire encoding of this frame to `dst`.
    ///
    /// The payload is masked in `dst` when a key is present; `self` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the mask is not 4 bytes long. Nothing is
    /// appended in that case.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let mask = self.mask.as_deref().map(mask_key).transpose()?;
        let len = self.payload.len();

        dst.reserve(self.wire_size());

        let fin_bit = if self.fin { 0x80 } else { 0x00 };
        dst.put_u8(fin_bit | self.opcode.as_u8());

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        if len <= MAX_SHORT_LEN {
            dst.put_u8(mask_bit | len as u8);
        } else if len <= MAX_MEDIUM_LEN {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(len as u16);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(len as u64);
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask_fast(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }

        Ok(())
    }
}

/// Write one frame and flush.
///
/// `scratch` is cleared and reused to assemble header, mask and payload so
/// the frame reaches the writer in a single `write_all`.
///
/// # Errors
///
/// - `Error::Protocol` if the mask is not 4 bytes long (nothing is written)
/// - I/O errors from the writer
pub async fn write_frame<W>(frame: &Frame, writer: &mut W, scratch: &mut BytesMut) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    scratch.clear();
    frame.encode(scratch)?;
    writer.write_all(&scratch[..]).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// The returned frame carries the payload exactly as it appeared on the
/// wire; use [`Frame::unmask`] to undo masking.
///
/// # Errors
///
/// - `Error::Protocol("invalid signature")` if any RSV bit is set
/// - `Error::Protocol` for reserved opcodes
/// - `Error::FrameTooLarge` if the declared length exceeds `max_frame_size`
/// - `Error::UnexpectedEof` if the stream ends before the frame is complete
/// - I/O errors from the reader
pub async fn read_frame<R>(reader: &mut R, max_frame_size: u64) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let byte0 = reader.read_u8().await?;
    let fin = match byte0 & 0xF0 {
        0x80 => true,
        0x00 => false,
        _ => return Err(Error::Protocol("invalid signature".into())),
    };
    let opcode = OpCode::from_u8(byte0 & 0x0F)?;

    let byte1 = reader.read_u8().await?;
    let masked = (byte1 & 0x80) != 0;
    let len = match byte1 & 0x7F {
        126 => u64::from(reader.read_u16().await?),
        127 => reader.read_u64().await?,
        short => u64::from(short),
    };

    if len > max_frame_size {
        return Err(Error::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }
    let len = usize::try_from(len).map_err(|_| Error::FrameTooLarge {
        size: len,
        max: usize::MAX as u64,
    })?;

    let mask = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key.to_vec())
    } else {
        None
    };

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Frame {
        fin,
        opcode,
        mask,
        payload,
    })
}
