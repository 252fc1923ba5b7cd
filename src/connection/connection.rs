use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};

use crate::codec::{FrameReader, FrameWriter};
use crate::config::Config;
use crate::connection::queue::{Delivery, Sender};
use crate::connection::reader::{self, Events};
use crate::connection::{ConnectionState, Role};
use crate::message::Message;
use crate::protocol::Frame;

/// A WebSocket connection over an upgraded byte stream.
///
/// The stream is split in two. The write half belongs to a writer task that
/// drains the send queue; the read half is handed to a read loop the first
/// time [`Connection::events`] is called.
///
/// Must be created inside a Tokio runtime.
///
/// ## Example
///
/// ```rust,ignore
/// use wsqueue::{Config, Connection, Event, Role};
///
/// let mut conn = Connection::new(stream, Role::Server, Config::server());
/// let mut events = conn.events().unwrap();
///
/// while let Some(event) = events.recv().await {
///     if let Event::Message(msg) = event {
///         conn.send(msg).await?;
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Connection<T> {
    sender: Sender,
    reader: Option<FrameReader<ReadHalf<T>>>,
    role: Role,
    config: Config,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap a stream on which the handshake has already completed.
    #[must_use]
    pub fn new(io: T, role: Role, config: Config) -> Self {
        let (read, write) = tokio::io::split(io);
        let read = BufReader::with_capacity(config.read_buffer_size, read);
        Self::from_parts(read, write, role, config)
    }

    /// Build a connection from halves of a stream whose read side may still
    /// hold bytes buffered while reading the handshake.
    #[must_use]
    pub fn from_parts(
        read: BufReader<ReadHalf<T>>,
        write: WriteHalf<T>,
        role: Role,
        config: Config,
    ) -> Self {
        let (sender, writer) = Sender::channel(config.max_queue_depth);
        tokio::spawn(writer.run(FrameWriter::new(write, role, &config)));
        Self {
            sender,
            reader: Some(FrameReader::from_buffered(read, &config)),
            role,
            config,
        }
    }

    /// Start the read loop and return its events.
    ///
    /// Returns `None` after the first call: the event sequence cannot be
    /// restarted.
    pub fn events(&mut self) -> Option<Events> {
        let reader = self.reader.take()?;
        Some(reader::spawn(
            reader,
            self.sender.clone(),
            self.config.limits,
            self.config.event_capacity,
        ))
    }
}

impl<T> Connection<T> {
    /// Queue a Text or Binary message as a single frame.
    ///
    /// Fails with `Error::ConnectionReset` once the connection is closed.
    pub fn send(&self, message: impl Into<Message>) -> Delivery {
        self.sender.send(message)
    }

    /// Queue a Ping.
    pub fn ping(&self, data: impl Into<Vec<u8>>) -> Delivery {
        self.sender.ping(data)
    }

    /// Queue an arbitrary frame.
    ///
    /// # Errors
    ///
    /// See [`Sender::enqueue`].
    pub fn enqueue(&self, frame: Frame) -> crate::Result<Delivery> {
        self.sender.enqueue(frame)
    }

    /// Start the close handshake. See [`Sender::close`].
    pub fn close(&self, code: impl Into<u16>, reason: &str) -> Delivery {
        self.sender.close(code, reason)
    }

    /// Force-close the transport without a close handshake.
    pub fn abort(&self) {
        self.sender.abort();
    }

    /// A handle that other tasks can use to send on this connection.
    #[must_use]
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// Returns `true` until a Close frame has been sent or received.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// The side of the handshake this connection was created on.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Connection configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
