use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::Config;
use crate::connection::Role;
use crate::error::Result;
use crate::protocol::{Frame, read_frame, write_frame};

/// Generate a random seed for mask generation.
/// Falls back to system time if getrandom fails.
fn random_mask_seed() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_ok() {
        u32::from_le_bytes(buf)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x1234_5678)
    }
}

/// Per-connection masking key source for client-originated frames.
#[derive(Debug, Clone)]
pub struct MaskGenerator {
    counter: u32,
}

impl MaskGenerator {
    /// Create a generator with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: random_mask_seed(),
        }
    }

    /// Produce the next 4-byte key.
    pub fn next_mask(&mut self) -> [u8; 4] {
        self.counter = self.counter.wrapping_add(0x9E37_79B9);
        let a = self.counter;
        let b = a.wrapping_mul(0x85EB_CA6B);
        let c = b ^ (b >> 13);
        let d = c.wrapping_mul(0xC2B2_AE35);
        d.to_le_bytes()
    }
}

impl Default for MaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbound half: decodes frames from a buffered reader.
#[derive(Debug)]
pub struct FrameReader<R> {
    io: BufReader<R>,
    max_frame_size: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a raw reader, buffering with `config.read_buffer_size`.
    #[must_use]
    pub fn new(io: R, config: &Config) -> Self {
        Self::from_buffered(BufReader::with_capacity(config.read_buffer_size, io), config)
    }

    /// Wrap a reader that may already hold buffered bytes, e.g. data that
    /// arrived right behind the handshake head.
    #[must_use]
    pub fn from_buffered(io: BufReader<R>, config: &Config) -> Self {
        Self {
            io,
            max_frame_size: config.limits.max_frame_size,
        }
    }

    /// Read one frame, unmask it and check control frame rules.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedEof` if the stream ends inside a frame
    /// - `Error::Protocol` / `Error::FrameTooLarge` for malformed frames
    /// - I/O errors from the reader
    pub async fn read(&mut self) -> Result<Frame> {
        let mut frame = read_frame(&mut self.io, self.max_frame_size).await?;
        frame.unmask()?;
        frame.validate()?;
        Ok(frame)
    }
}

/// Outbound half: encodes frames, masking them for the client role.
#[derive(Debug)]
pub struct FrameWriter<W> {
    io: W,
    scratch: BytesMut,
    masks: Option<MaskGenerator>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a writer. Clients get a fresh mask on every frame.
    #[must_use]
    pub fn new(io: W, role: Role, config: &Config) -> Self {
        Self {
            io,
            scratch: BytesMut::with_capacity(config.write_buffer_size),
            masks: role.must_mask().then(MaskGenerator::new),
        }
    }

    /// Write one frame and flush.
    ///
    /// # Errors
    ///
    /// - `Error::Protocol` if the frame carries an invalid mask
    /// - I/O errors from the writer
    pub async fn write(&mut self, frame: Frame) -> Result<()> {
        let frame = match self.masks.as_mut() {
            Some(masks) => frame.with_mask(masks.next_mask()),
            None => frame,
        };
        write_frame(&frame, &mut self.io, &mut self.scratch).await
    }

    /// Shut down the underlying writer.
    ///
    /// # Errors
    ///
    /// I/O errors from the writer.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }

    /// Consume the writer and return the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.io
    }
}
