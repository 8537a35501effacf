//! Request/acknowledgment transports.
//!
//! [`Transport`] is the controller side: send one request, wait a bounded
//! time for the reply carrying the same sequence number. [`EngineEndpoint`]
//! is the engine side. Two pairings are provided:
//!
//! - [`StreamTransport`] / [`StreamEndpoint`]: length-prefixed frames over
//!   any byte stream (child process pipes, a Unix socket). A reader thread
//!   decodes replies into a bounded channel so the controller's wait can
//!   time out without blocking on the stream.
//! - [`MemoryTransport`] / [`MemoryEndpoint`]: crossbeam channels between
//!   threads of one process.

use std::io::{Read, Write};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ticlink_core::ChannelError;

use crate::codec::{self, WireError};
use crate::protocol::{Envelope, Reply, Request};

/// Replies buffered between the reader thread and the controller.
const REPLY_QUEUE_DEPTH: usize = 8;

type ReplyItem = Result<Envelope<Reply>, ChannelError>;

// ── Controller side ─────────────────────────────────────────────

/// Controller side of the command channel.
pub trait Transport: Send {
    /// Send `request` and wait at most `timeout` for its reply.
    fn request(&mut self, request: Request, timeout: Duration) -> Result<Reply, ChannelError>;
}

/// Sequence numbering and stale-reply filtering shared by both transports.
#[derive(Debug)]
struct Pending {
    next_seq: u32,
}

impl Pending {
    fn new() -> Self {
        Self { next_seq: 1 }
    }

    fn issue(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    /// Wait for the reply to `seq`, dropping replies to earlier requests
    /// that arrived after their wait had already given up.
    fn await_reply(
        &self,
        replies: &Receiver<ReplyItem>,
        seq: u32,
        timeout: Duration,
    ) -> Result<Reply, ChannelError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match replies.recv_timeout(remaining) {
                Ok(Ok(envelope)) if envelope.seq == seq => return Ok(envelope.body),
                Ok(Ok(envelope)) => {
                    tracing::warn!(
                        expected = seq,
                        got = envelope.seq,
                        reply = envelope.body.name(),
                        "discarding stale reply"
                    );
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ChannelError::Timeout { waited: timeout })
                }
                Err(RecvTimeoutError::Disconnected) => return Err(ChannelError::Disconnected),
            }
        }
    }
}

fn wire_to_read_error(e: WireError) -> ChannelError {
    match e {
        WireError::Io(e) => ChannelError::Read(e),
        WireError::Malformed { detail } => ChannelError::Protocol { detail },
    }
}

fn wire_to_write_error(e: WireError) -> ChannelError {
    match e {
        WireError::Io(e) => ChannelError::Write(e),
        WireError::Malformed { detail } => ChannelError::Protocol { detail },
    }
}

/// Framed transport over a byte stream pair.
pub struct StreamTransport<W: Write + Send> {
    writer: W,
    replies: Receiver<ReplyItem>,
    pending: Pending,
    reader: Option<JoinHandle<()>>,
}

impl<W: Write + Send> StreamTransport<W> {
    /// Start the reply reader thread on `reader` and write requests to
    /// `writer`.
    pub fn spawn<R: Read + Send + 'static>(reader: R, writer: W) -> Result<Self, ChannelError> {
        let (tx, rx) = bounded(REPLY_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("ticlink-reply-reader".into())
            .spawn(move || read_replies(reader, tx))
            .map_err(|e| ChannelError::Open {
                reason: format!("cannot start reply reader: {e}"),
            })?;
        Ok(Self {
            writer,
            replies: rx,
            pending: Pending::new(),
            reader: Some(handle),
        })
    }
}

fn read_replies<R: Read>(mut reader: R, tx: Sender<ReplyItem>) {
    loop {
        let item = match codec::read_frame(&mut reader) {
            Ok(Some(body)) => codec::decode_reply(&body).map_err(wire_to_read_error),
            Ok(None) => {
                tracing::debug!("reply stream closed");
                return;
            }
            Err(e) => Err(wire_to_read_error(e)),
        };
        let fatal = item.is_err();
        if tx.send(item).is_err() || fatal {
            return;
        }
    }
}

impl<W: Write + Send> Transport for StreamTransport<W> {
    fn request(&mut self, request: Request, timeout: Duration) -> Result<Reply, ChannelError> {
        let seq = self.pending.issue();
        let name = request.name();
        let body = codec::encode_request(&Envelope { seq, body: request })
            .map_err(wire_to_write_error)?;
        codec::write_frame(&mut self.writer, &body).map_err(wire_to_write_error)?;
        tracing::trace!(seq, request = name, "request sent");
        self.pending.await_reply(&self.replies, seq, timeout)
    }
}

impl<W: Write + Send> Drop for StreamTransport<W> {
    fn drop(&mut self) {
        // The reader exits once the peer closes its end; only join a thread
        // that is already done so a wedged peer cannot hang teardown.
        if let Some(handle) = self.reader.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

/// In-process transport over crossbeam channels.
pub struct MemoryTransport {
    requests: Sender<Envelope<Request>>,
    replies: Receiver<ReplyItem>,
    pending: Pending,
}

impl Transport for MemoryTransport {
    fn request(&mut self, request: Request, timeout: Duration) -> Result<Reply, ChannelError> {
        let seq = self.pending.issue();
        let name = request.name();
        self.requests
            .send_timeout(Envelope { seq, body: request }, timeout)
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout { waited: timeout }
                } else {
                    ChannelError::Disconnected
                }
            })?;
        tracing::trace!(seq, request = name, "request sent");
        self.pending.await_reply(&self.replies, seq, timeout)
    }
}

/// Create a connected in-process transport/endpoint pair.
pub fn memory_pair() -> (MemoryTransport, MemoryEndpoint) {
    let (req_tx, req_rx) = bounded(1);
    let (rep_tx, rep_rx) = bounded(REPLY_QUEUE_DEPTH);
    (
        MemoryTransport {
            requests: req_tx,
            replies: rep_rx,
            pending: Pending::new(),
        },
        MemoryEndpoint {
            requests: req_rx,
            replies: rep_tx,
        },
    )
}

// ── Engine side ─────────────────────────────────────────────────

/// Engine side of the command channel.
pub trait EngineEndpoint {
    /// Block for the next request. `Ok(None)` means the controller is gone.
    fn recv(&mut self) -> Result<Option<Envelope<Request>>, ChannelError>;

    /// Send the reply to request `seq`.
    fn send(&mut self, seq: u32, reply: Reply) -> Result<(), ChannelError>;
}

/// Engine end of a [`memory_pair`].
pub struct MemoryEndpoint {
    requests: Receiver<Envelope<Request>>,
    replies: Sender<ReplyItem>,
}

impl EngineEndpoint for MemoryEndpoint {
    fn recv(&mut self) -> Result<Option<Envelope<Request>>, ChannelError> {
        Ok(self.requests.recv().ok())
    }

    fn send(&mut self, seq: u32, reply: Reply) -> Result<(), ChannelError> {
        self.replies
            .send(Ok(Envelope { seq, body: reply }))
            .map_err(|_| ChannelError::Disconnected)
    }
}

/// Engine end of a framed byte stream pair.
pub struct StreamEndpoint<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> StreamEndpoint<R, W> {
    /// Wrap the engine's input and output streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: Read, W: Write> EngineEndpoint for StreamEndpoint<R, W> {
    fn recv(&mut self) -> Result<Option<Envelope<Request>>, ChannelError> {
        match codec::read_frame(&mut self.reader).map_err(wire_to_read_error)? {
            Some(body) => codec::decode_request(&body)
                .map(Some)
                .map_err(wire_to_read_error),
            None => Ok(None),
        }
    }

    fn send(&mut self, seq: u32, reply: Reply) -> Result<(), ChannelError> {
        let body =
            codec::encode_reply(&Envelope { seq, body: reply }).map_err(wire_to_write_error)?;
        codec::write_frame(&mut self.writer, &body).map_err(wire_to_write_error)
    }
}
