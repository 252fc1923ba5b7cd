//! Inbound read loop and the event stream it feeds.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use log::{debug, trace, warn};
use tokio::io::AsyncRead;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::codec::FrameReader;
use crate::config::Limits;
use crate::error::Error;
use crate::message::{CloseEvent, Event};
use crate::protocol::{Frame, MessageAssembler, OpCode};

use super::queue::{Sender, Shared};

/// Events produced by a connection's read loop.
///
/// The sequence ends after [`Event::Close`], or without one when the
/// transport fails or a peer violates the protocol; [`Events::error`] then
/// reports why. Dropping `Events` force-closes the connection.
#[derive(Debug)]
pub struct Events {
    rx: mpsc::Receiver<Event>,
    shared: Arc<Shared>,
}

impl Events {
    /// Receive the next event, or `None` once the read loop has stopped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// The error that stopped the read loop, if any.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.shared.error()
    }
}

impl Stream for Events {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

/// Start the read loop for `reader` and return its event stream.
pub(crate) fn spawn<R>(
    reader: FrameReader<R>,
    sender: Sender,
    limits: Limits,
    capacity: usize,
) -> Events
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::clone(sender.shared());
    tokio::spawn(read_loop(reader, sender, MessageAssembler::new(limits), tx));
    Events { rx, shared }
}

enum Step {
    Emit(Event),
    Skip,
    Finish(Event),
}

async fn read_loop<R>(
    mut reader: FrameReader<R>,
    sender: Sender,
    mut assembler: MessageAssembler,
    events: mpsc::Sender<Event>,
) where
    R: AsyncRead + Unpin,
{
    let mut aborted = sender.shared().subscribe_abort();

    loop {
        let read = tokio::select! {
            biased;
            _ = aborted.wait_for(|a| *a) => {
                debug!("read loop stopped: connection aborted");
                return;
            }
            _ = events.closed() => {
                debug!("event receiver dropped, aborting connection");
                sender.abort();
                return;
            }
            read = reader.read() => read,
        };

        let step = read.and_then(|frame| handle_frame(frame, &sender, &mut assembler));
        let event = match step {
            Ok(Step::Emit(event)) => event,
            Ok(Step::Skip) => continue,
            Ok(Step::Finish(event)) => {
                deliver(&events, &mut aborted, event).await;
                debug!("read loop finished after close");
                return;
            }
            Err(err) => {
                debug!("read loop failed: {err}");
                sender.shared().record_error(err);
                sender.abort();
                return;
            }
        };

        if !deliver(&events, &mut aborted, event).await {
            sender.abort();
            return;
        }
    }
}

/// Hand `event` to the consumer. Returns `false` if the receiver is gone or
/// the connection was force-closed while waiting for room in the channel.
async fn deliver(
    events: &mpsc::Sender<Event>,
    aborted: &mut watch::Receiver<bool>,
    event: Event,
) -> bool {
    let event = match events.try_send(event) {
        Ok(()) => return true,
        Err(TrySendError::Closed(_)) => return false,
        Err(TrySendError::Full(event)) => event,
    };
    tokio::select! {
        biased;
        _ = aborted.wait_for(|a| *a) => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

fn handle_frame(
    frame: Frame,
    sender: &Sender,
    assembler: &mut MessageAssembler,
) -> crate::Result<Step> {
    trace!(
        "received {} frame ({} bytes, fin={})",
        frame.opcode,
        frame.payload().len(),
        frame.fin
    );

    match frame.opcode {
        OpCode::Continuation | OpCode::Text | OpCode::Binary => Ok(assembler
            .push(frame)?
            .map_or(Step::Skip, |message| Step::Emit(Event::Message(message)))),
        OpCode::Close => {
            let event = CloseEvent::from_payload(frame.payload());
            debug!("peer closed connection: {} {:?}", event.code, event.reason);
            drop(sender.reply_close(frame.payload(), &event));
            Ok(Step::Finish(Event::Close(event)))
        }
        OpCode::Ping => {
            let payload = frame.into_payload();
            if let Err(err) = sender.enqueue_control(Frame::pong(payload.clone())) {
                warn!("pong not queued: {err}");
            }
            Ok(Step::Emit(Event::Ping(payload)))
        }
        OpCode::Pong => Ok(Step::Emit(Event::Pong(frame.into_payload()))),
    }
}
