//! Ordered outbound send queue.
//!
//! Every outbound frame, whether an application send, an automatic Pong or a
//! Close echo, goes through one unbounded channel drained by a single writer
//! task. That task owns the write half, writes one frame at a time and
//! signals each caller once its frame has been flushed, so frames reach the
//! transport in enqueue order and never interleave.
//!
//! The open/closed check and the push onto the channel happen under one
//! lock, so nothing can be enqueued after the connection has been closed.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use log::{debug, trace, warn};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot, watch};

use crate::codec::FrameWriter;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseEvent, Message};
use crate::protocol::Frame;

enum Job {
    /// Write the frame and keep going.
    Write(Frame),
    /// Write the frame, then shut the transport down.
    Close(Frame),
    /// Shut the transport down without writing anything.
    Abort,
}

struct Entry {
    job: Job,
    done: oneshot::Sender<Result<()>>,
}

#[derive(Debug, Default)]
struct QueueState {
    state: ConnectionState,
    /// `Write` entries not yet picked up by the writer.
    pending: usize,
    /// Why the read loop stopped, if it stopped on an error.
    error: Option<Error>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    queue: Mutex<QueueState>,
    max_depth: usize,
    aborted: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, next: ConnectionState) {
        let mut queue = self.lock();
        queue.state = queue.state.advance(next);
    }

    pub(crate) fn subscribe_abort(&self) -> watch::Receiver<bool> {
        self.aborted.subscribe()
    }

    pub(crate) fn record_error(&self, err: Error) {
        self.lock().error.get_or_insert(err);
    }

    pub(crate) fn error(&self) -> Option<Error> {
        self.lock().error.clone()
    }
}

/// Completion handle for a queued frame.
///
/// Resolves once the frame has been written and flushed, or with the error
/// that prevented it. The frame stays queued if the handle is dropped.
#[must_use = "the frame is queued either way; await the delivery to observe write errors"]
#[derive(Debug)]
pub struct Delivery {
    inner: DeliveryInner,
}

#[derive(Debug)]
enum DeliveryInner {
    Queued(oneshot::Receiver<Result<()>>),
    Failed(Option<Error>),
}

impl Delivery {
    fn queued(rx: oneshot::Receiver<Result<()>>) -> Self {
        Self {
            inner: DeliveryInner::Queued(rx),
        }
    }

    fn failed(err: Error) -> Self {
        Self {
            inner: DeliveryInner::Failed(Some(err)),
        }
    }
}

impl Future for Delivery {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            DeliveryInner::Queued(rx) => Pin::new(rx)
                .poll(cx)
                .map(|res| res.unwrap_or(Err(Error::ConnectionReset))),
            DeliveryInner::Failed(err) => {
                Poll::Ready(Err(err.take().unwrap_or(Error::ConnectionReset)))
            }
        }
    }
}

/// Clonable handle onto a connection's send queue.
///
/// All clones share one queue, so frames from different tasks are written
/// in the order their `enqueue` calls happened.
#[derive(Debug, Clone)]
pub struct Sender {
    tx: mpsc::UnboundedSender<Entry>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let job = match &self.job {
            Job::Write(frame) => format!("Write({})", frame.opcode),
            Job::Close(_) => "Close".to_string(),
            Job::Abort => "Abort".to_string(),
        };
        f.debug_struct("Entry").field("job", &job).finish()
    }
}

impl Sender {
    /// Create a sender and the receiving end the writer task drains.
    pub(crate) fn channel(max_depth: usize) -> (Self, Writer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (aborted, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState::default()),
            max_depth,
            aborted,
        });
        let writer = Writer {
            rx,
            shared: Arc::clone(&shared),
        };
        (Self { tx, shared }, writer)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    fn push(&self, job: Job) -> oneshot::Receiver<Result<()>> {
        let (done, rx) = oneshot::channel();
        // A closed channel drops the entry, which resolves `rx` with
        // ConnectionReset.
        let _ = self.tx.send(Entry { job, done });
        rx
    }

    /// Queue a frame for writing.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionReset` if a Close frame was already sent or
    ///   received, or the transport is gone
    /// - `Error::QueueFull` if `max_queue_depth` frames are already waiting
    pub fn enqueue(&self, frame: Frame) -> Result<Delivery> {
        self.enqueue_with(frame, true)
    }

    /// Queue a protocol reply such as an automatic Pong. Not subject to
    /// `max_queue_depth`.
    pub(crate) fn enqueue_control(&self, frame: Frame) -> Result<Delivery> {
        self.enqueue_with(frame, false)
    }

    fn enqueue_with(&self, frame: Frame, bounded: bool) -> Result<Delivery> {
        let mut queue = self.shared.lock();
        if !queue.state.can_send() || self.tx.is_closed() {
            return Err(Error::ConnectionReset);
        }
        if bounded && queue.pending >= self.shared.max_depth {
            return Err(Error::QueueFull {
                depth: queue.pending,
            });
        }
        queue.pending += 1;
        let rx = self.push(Job::Write(frame));
        Ok(Delivery::queued(rx))
    }

    /// Queue a Text or Binary message as a single frame.
    pub fn send(&self, message: impl Into<Message>) -> Delivery {
        let frame = match message.into() {
            Message::Text(text) => Frame::text(text),
            Message::Binary(data) => Frame::binary(data),
        };
        self.enqueue(frame).unwrap_or_else(Delivery::failed)
    }

    /// Queue a Ping.
    pub fn ping(&self, data: impl Into<Vec<u8>>) -> Delivery {
        self.enqueue(Frame::ping(data)).unwrap_or_else(Delivery::failed)
    }

    /// Queue a Close frame and mark the connection closed.
    ///
    /// Once the Close frame has been written the transport is shut down and
    /// frames still waiting behind it fail with `Error::ConnectionReset`.
    /// If `code` is reserved or `reason` exceeds 123 bytes, no Close frame
    /// is sent: the transport is force-closed and the delivery fails with
    /// the validation error.
    pub fn close(&self, code: impl Into<u16>, reason: &str) -> Delivery {
        let event = CloseEvent::new(code, reason);
        match event.validate() {
            Ok(()) => self.close_with(Frame::close(Some(event.code), reason)),
            Err(err) => {
                self.abort();
                Delivery::failed(err)
            }
        }
    }

    /// Queue the reply to a Close frame received from the peer.
    ///
    /// An empty Close is answered with an empty Close, a valid code is
    /// echoed and anything else is answered with 1002.
    pub(crate) fn reply_close(&self, payload: &[u8], event: &CloseEvent) -> Delivery {
        let frame = if payload.is_empty() {
            Frame::close(None, "")
        } else if event.close_code().is_valid() {
            Frame::close(Some(event.code), "")
        } else {
            Frame::close(Some(CloseCode::ProtocolError.as_u16()), "")
        };
        self.close_with(frame)
    }

    fn close_with(&self, frame: Frame) -> Delivery {
        let mut queue = self.shared.lock();
        if !queue.state.can_send() {
            return Delivery::failed(Error::ConnectionReset);
        }
        queue.state = ConnectionState::Closing;
        Delivery::queued(self.push(Job::Close(frame)))
    }

    /// Force-close the transport without a close handshake.
    ///
    /// Frames still queued fail with `Error::ConnectionReset`.
    pub fn abort(&self) {
        {
            let mut queue = self.shared.lock();
            queue.state = queue.state.advance(ConnectionState::Closing);
            drop(self.push(Job::Abort));
        }
        self.shared.aborted.send_replace(true);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Returns `true` once a Close frame has been sent or received.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Number of frames waiting to be written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().pending
    }
}

/// Receiving end of the queue, consumed by [`Writer::run`].
#[derive(Debug)]
pub(crate) struct Writer {
    rx: mpsc::UnboundedReceiver<Entry>,
    shared: Arc<Shared>,
}

impl Writer {
    /// Drain the queue into `io` until a Close or Abort entry, a write
    /// error, or until every [`Sender`] is gone.
    ///
    /// A force-close interrupts the frame being written; its caller sees
    /// `Error::ConnectionReset` like every frame queued behind it.
    pub(crate) async fn run<W>(mut self, mut io: FrameWriter<W>)
    where
        W: AsyncWrite + Unpin,
    {
        let mut aborted = self.shared.subscribe_abort();
        let mut force = false;

        loop {
            let entry = tokio::select! {
                biased;
                _ = aborted.wait_for(|a| *a) => {
                    force = true;
                    break;
                }
                entry = self.rx.recv() => entry,
            };
            let Some(Entry { job, done }) = entry else {
                break;
            };

            let (frame, last) = match job {
                Job::Write(frame) => {
                    self.shared.lock().pending -= 1;
                    trace!(
                        "writing {} frame ({} bytes)",
                        frame.opcode,
                        frame.payload().len()
                    );
                    (frame, false)
                }
                Job::Close(frame) => {
                    debug!("writing close frame");
                    (frame, true)
                }
                Job::Abort => {
                    force = true;
                    let _ = done.send(Ok(()));
                    break;
                }
            };

            let written = tokio::select! {
                biased;
                _ = aborted.wait_for(|a| *a) => None,
                result = io.write(frame) => Some(result),
            };

            match written {
                Some(Ok(())) => {
                    let _ = done.send(Ok(()));
                    if last {
                        break;
                    }
                }
                Some(Err(err)) => {
                    warn!("frame write failed: {err}");
                    self.shared.record_error(err.clone());
                    let _ = done.send(Err(err));
                    force = true;
                    break;
                }
                None => {
                    debug!("write interrupted by force close");
                    let _ = done.send(Err(Error::ConnectionReset));
                    force = true;
                    break;
                }
            }
        }

        self.shared.advance(ConnectionState::Closed);
        if let Err(err) = io.shutdown().await {
            debug!("transport shutdown failed: {err}");
        }
        if force {
            self.shared.aborted.send_replace(true);
        }

        self.rx.close();
        let mut rejected = 0usize;
        while let Ok(entry) = self.rx.try_recv() {
            if matches!(entry.job, Job::Write(_)) {
                self.shared.lock().pending -= 1;
            }
            let _ = entry.done.send(Err(Error::ConnectionReset));
            rejected += 1;
        }
        debug!("writer stopped ({rejected} queued frames rejected)");
    }
}
