//! Session driver and connection handles.
//!
//! Each hosted connection runs as one tokio task that owns its
//! [`Dispatcher`] and both halves of the WebSocket stream.
//!
//! # Event Loop
//!
//! ```text
//!  ConnectionHandle::shutdown ──watch──────┐ (checked first)
//!  ConnectionHandle::send ──OutOfBand queue┤
//!  WebSocket stream ──Frame/Close/errors───┼──► Dispatcher ──► sink
//!  idle timer ─────────────────────────────┘
//! ```
//!
//! - The stream is only read when the previous step's writes are done, so
//!   callbacks never overlap and a slow handler pushes back on the peer.
//! - Shutdown is checked first on every turn, but never interrupts a
//!   running callback.
//! - The idle timer is reset by frames received and frames sent.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace, warn};

use crate::dispatch::{Dispatcher, Event, Outbound, Step};
use crate::error::{Error, Result};
use crate::handler::{Handler, TerminationReason};
use crate::host::{HostProfile, TUNGSTENITE_PROFILE, UpgradeOptions};
use crate::identifiers::ConnectionId;
use crate::protocol::{CloseCode, CloseDetail, Frame};

// ============================================================================
// Types
// ============================================================================

/// Sender side of a connection's event queue.
type EventSender<M> = mpsc::UnboundedSender<Event<M>>;

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Cloneable handle to a running session.
///
/// Used by other tasks to deliver out-of-band messages and to shut the
/// connection down.
pub struct ConnectionHandle<M> {
    /// Connection id.
    id: ConnectionId,
    /// Out-of-band queue.
    events_tx: EventSender<M>,
    /// Shutdown signal.
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl<M> Clone for ConnectionHandle<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            events_tx: self.events_tx.clone(),
            shutdown_tx: Arc::clone(&self.shutdown_tx),
        }
    }
}

impl<M> ConnectionHandle<M> {
    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an out-of-band message for `handle_out_of_band`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session has ended.
    pub fn send(&self, message: M) -> Result<()> {
        self.events_tx
            .send(Event::OutOfBand(message))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests a host shutdown of this connection.
    ///
    /// The in-flight callback, if any, completes first. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Returns `true` once the session has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events_tx.is_closed()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Configuration for one hosted connection.
///
/// # Example
///
/// ```ignore
/// let ws = TungsteniteHost::new().attach(io, &options).await;
/// let (handle, done) = Session::new(Arc::new(Echo), options).spawn(ws, ());
///
/// handle.send("hello".to_string())?;
/// handle.shutdown();
/// assert_eq!(done.await?, TerminationReason::Shutdown);
/// ```
pub struct Session<H: Handler> {
    /// Connection id.
    id: ConnectionId,
    /// Shared handler.
    handler: Arc<H>,
    /// Upgrade options.
    options: UpgradeOptions,
    /// Host backend description.
    profile: &'static HostProfile,
}

impl<H: Handler> Session<H> {
    /// Creates a session for the tungstenite backend with a fresh id.
    #[must_use]
    pub fn new(handler: Arc<H>, options: UpgradeOptions) -> Self {
        Self {
            id: ConnectionId::next(),
            handler,
            options,
            profile: &TUNGSTENITE_PROFILE,
        }
    }

    /// Uses a pre-allocated connection id.
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: ConnectionId) -> Self {
        self.id = id;
        self
    }

    /// Uses another backend profile.
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: &'static HostProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Spawns the session task over an upgraded stream and calls `init`.
    ///
    /// The join handle resolves to the reason `terminate` received.
    pub fn spawn<S>(
        self,
        ws: S,
        init_arg: H::InitArg,
    ) -> (ConnectionHandle<H::Message>, JoinHandle<TerminationReason>)
    where
        S: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin
            + Send
            + 'static,
    {
        let Self {
            id,
            handler,
            options,
            profile,
        } = self;

        profile.report_ignored(id, &options);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = ConnectionHandle {
            id,
            events_tx,
            shutdown_tx: Arc::new(shutdown_tx),
        };

        let driver = Driver {
            dispatcher: Dispatcher::new(id, handler, &options),
            idle: options.idle_timeout(),
            profile,
            events_rx,
            shutdown_rx,
        };

        let task = tokio::spawn(driver.run(ws, init_arg));
        (handle, task)
    }
}

// ============================================================================
// Driver
// ============================================================================

/// State owned by the session task.
struct Driver<H: Handler> {
    dispatcher: Dispatcher<H>,
    idle: Option<Duration>,
    profile: &'static HostProfile,
    events_rx: mpsc::UnboundedReceiver<Event<H::Message>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<H: Handler> Driver<H> {
    /// Event loop that handles WebSocket I/O.
    async fn run<S>(mut self, ws: S, init_arg: H::InitArg) -> TerminationReason
    where
        S: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin
            + Send
            + 'static,
    {
        let id = self.dispatcher.id();
        let (sink, mut stream) = ws.split();
        let mut writer = Writer {
            sink,
            profile: self.profile,
            id,
        };

        let mut deadline = self.next_deadline();
        let step = self.dispatcher.start(init_arg);
        let mut finished = self.deliver(&mut writer, step, &mut deadline).await;

        while !finished {
            let event = tokio::select! {
                biased;

                () = shutdown_signal(&mut self.shutdown_rx) => Event::Shutdown,

                Some(event) = self.events_rx.recv() => event,

                message = stream.next() => match inbound_event(message) {
                    Some(event) => event,
                    None => continue,
                },

                () = idle_expired(deadline) => Event::IdleTimeout,
            };

            if event.is_traffic() {
                deadline = self.next_deadline();
            }

            let step = self.dispatcher.dispatch(event);
            finished = self.deliver(&mut writer, step, &mut deadline).await;
        }

        if let Err(e) = writer.sink.close().await {
            trace!(connection = %id, error = %e, "close after termination");
        }

        debug!(connection = %id, "session ended");
        self.dispatcher
            .reason()
            .cloned()
            .unwrap_or_else(|| TerminationReason::error("session ended without termination"))
    }

    /// Performs a step's writes. Returns `true` once the connection is done.
    async fn deliver<S>(
        &mut self,
        writer: &mut Writer<S>,
        step: Step,
        deadline: &mut Option<Instant>,
    ) -> bool
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        let finished = step.finished;
        match writer.write(step.outbound).await {
            Ok(true) => {
                *deadline = self.next_deadline();
                finished
            }
            Ok(false) => finished,
            Err(e) => {
                warn!(connection = %writer.id, error = %e, "write failed");
                if !finished {
                    let _ = self.dispatcher.dispatch(Event::TransportError(e.to_string()));
                }
                true
            }
        }
    }

    /// Idle deadline measured from now.
    fn next_deadline(&self) -> Option<Instant> {
        self.idle.map(|idle| Instant::now() + idle)
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Write half of the stream.
struct Writer<S> {
    sink: SplitSink<S, Message>,
    profile: &'static HostProfile,
    id: ConnectionId,
}

impl<S> Writer<S>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    /// Writes outbound entries in order. Returns `true` if any frame left.
    async fn write(&mut self, outbound: Vec<Outbound>) -> std::result::Result<bool, WsError> {
        let mut traffic = false;
        for out in outbound {
            match out {
                Outbound::Frame(frame) => {
                    let opcode = frame.opcode();
                    match frame.into_message() {
                        Ok(message) => {
                            self.sink.send(message).await?;
                            trace!(connection = %self.id, %opcode, "frame sent");
                            traffic = true;
                        }
                        Err(e) => {
                            warn!(connection = %self.id, error = %e, "dropping unencodable frame");
                        }
                    }
                }
                Outbound::AutoPong(payload) => {
                    if self.profile.auto_pong {
                        // the backend queued the pong while reading the ping
                        self.sink.flush().await?;
                    } else {
                        self.sink.send(Message::Pong(payload)).await?;
                    }
                    traffic = true;
                }
                Outbound::Close(detail) => {
                    // after a remote close the backend has already queued the
                    // echo and rejects this write; `close()` flushes the echo
                    let code = detail.code;
                    if let Err(e) = self.sink.send(Message::Close(detail.into_close_frame())).await {
                        trace!(connection = %self.id, %code, error = %e, "close frame not sent");
                    }
                }
            }
        }
        Ok(traffic)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Maps one read from the stream to a dispatcher event.
///
/// Returns `None` for raw frames the backend surfaces without a message.
fn inbound_event<M>(read: Option<std::result::Result<Message, WsError>>) -> Option<Event<M>> {
    let event = match read {
        Some(Ok(Message::Close(frame))) => {
            Event::RemoteClose(frame.as_ref().map(CloseDetail::from_close_frame))
        }
        Some(Ok(message)) => Event::Frame(Frame::from_message(message)?),
        Some(Err(WsError::Capacity(e))) => Event::ProtocolViolation {
            code: CloseCode::TOO_BIG,
            detail: e.to_string(),
        },
        Some(Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake))) | None => {
            Event::TransportError("connection closed without close frame".into())
        }
        Some(Err(WsError::Protocol(e))) => Event::ProtocolViolation {
            code: CloseCode::PROTOCOL,
            detail: e.to_string(),
        },
        Some(Err(e)) => Event::TransportError(e.to_string()),
    };
    Some(event)
}

// ============================================================================
// Signals
// ============================================================================

/// Resolves once shutdown is requested. Never resolves if every handle is gone.
async fn shutdown_signal(rx: &mut watch::Receiver<bool>) {
    let requested = rx.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}

/// Resolves at the idle deadline. Never resolves when idle timeout is off.
async fn idle_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
