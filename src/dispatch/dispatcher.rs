//! Per-connection state machine and effect interpreter.
//!
//! The [`Dispatcher`] performs no I/O. A driver feeds it [`Event`]s one at a
//! time and performs the writes listed in each returned [`Step`]. This keeps
//! the callback ordering, reason mapping and termination guarantees
//! independent of the transport.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::handler::{Effect, Handler, TerminationReason};
use crate::host::UpgradeOptions;
use crate::identifiers::ConnectionId;
use crate::protocol::{CloseCode, CloseDetail, Frame, FrameKind, Opcode};

use super::event::{Event, Outbound, Step};
use super::phase::Phase;

// ============================================================================
// Dispatcher
// ============================================================================

/// Drives one connection's handler through its lifecycle.
///
/// Guarantees:
///
/// - callbacks run one at a time, state flows from each into the next
/// - every received ping yields exactly one [`Outbound::AutoPong`]
/// - `terminate` runs at most once, and always once `start` has been called,
///   even if the dispatcher is dropped while live
/// - nothing is dispatched after `terminate`
pub struct Dispatcher<H: Handler> {
    /// Connection this dispatcher serves.
    id: ConnectionId,
    /// Shared handler.
    handler: Arc<H>,
    /// Current lifecycle phase.
    phase: Phase,
    /// State returned by the last callback. `None` outside `Live`.
    state: Option<H::State>,
    /// Capability flag, read from the handler once.
    handles_control: bool,
    /// Inbound frame size limit.
    max_frame_size: Option<usize>,
    /// Reason handed to `terminate`.
    reason: Option<TerminationReason>,
}

impl<H: Handler> Dispatcher<H> {
    /// Creates a dispatcher in [`Phase::Negotiating`].
    #[must_use]
    pub fn new(id: ConnectionId, handler: Arc<H>, options: &UpgradeOptions) -> Self {
        let handles_control = handler.handles_control();
        Self {
            id,
            handler,
            phase: Phase::Negotiating,
            state: None,
            handles_control,
            max_frame_size: options.max_frame_size,
            reason: None,
        }
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` while events are being dispatched.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase == Phase::Live
    }

    /// Returns `true` once `terminate` has run.
    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Returns whether the handler receives control frames.
    #[inline]
    #[must_use]
    pub const fn handles_control(&self) -> bool {
        self.handles_control
    }

    /// Returns the reason `terminate` was called with.
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&TerminationReason> {
        self.reason.as_ref()
    }
}

// ============================================================================
// Dispatcher - Events
// ============================================================================

impl<H: Handler> Dispatcher<H> {
    /// Completes negotiation and calls `init`.
    ///
    /// Has no effect unless the dispatcher is still negotiating.
    pub fn start(&mut self, arg: H::InitArg) -> Step {
        let mut step = Step::default();
        if self.phase != Phase::Negotiating {
            warn!(connection = %self.id, phase = %self.phase, "start called twice, ignored");
            return step;
        }

        self.phase = Phase::Live;
        debug!(connection = %self.id, "connection live");

        let handler = Arc::clone(&self.handler);
        match invoke("init", || handler.init(arg)) {
            Ok(effect) => self.apply(effect, &mut step),
            Err(detail) => {
                warn!(connection = %self.id, %detail, "init failed");
                self.finish(TerminationReason::Error(detail), None, &mut step);
            }
        }
        step
    }

    /// Dispatches one event.
    ///
    /// Events arriving outside [`Phase::Live`] are ignored.
    pub fn dispatch(&mut self, event: Event<H::Message>) -> Step {
        let mut step = Step::default();
        if self.phase != Phase::Live {
            trace!(connection = %self.id, event = event.name(), phase = %self.phase, "event ignored");
            return step;
        }

        match event {
            Event::Frame(frame) => self.on_frame(frame, &mut step),
            Event::RemoteClose(detail) => {
                let code = detail.map_or(CloseCode::NO_STATUS, |d| d.code);
                debug!(connection = %self.id, %code, "close frame received");
                self.finish(TerminationReason::Remote(code), None, &mut step);
            }
            Event::OutOfBand(message) => {
                trace!(connection = %self.id, "out-of-band message");
                self.call("handle_out_of_band", &mut step, |handler, state| {
                    handler.handle_out_of_band(message, state)
                });
            }
            Event::Shutdown => {
                debug!(connection = %self.id, "host shutdown");
                self.finish(TerminationReason::Shutdown, None, &mut step);
            }
            Event::IdleTimeout => {
                debug!(connection = %self.id, "idle timeout");
                self.finish(TerminationReason::Timeout, None, &mut step);
            }
            Event::ProtocolViolation { code, detail } => {
                warn!(connection = %self.id, %code, %detail, "protocol violation");
                let close = CloseDetail::new(code, "protocol violation");
                self.finish(TerminationReason::Error(detail), Some(close), &mut step);
            }
            Event::TransportError(detail) => {
                debug!(connection = %self.id, %detail, "transport failure");
                self.terminate(TerminationReason::Error(detail));
                step.finished = true;
            }
        }
        step
    }

    /// Classifies a frame and routes it.
    fn on_frame(&mut self, frame: Frame, step: &mut Step) {
        if let Some(max) = self.max_frame_size
            && frame.len() > max
        {
            let err = Error::frame_too_large(frame.len(), max);
            warn!(connection = %self.id, error = %err, "oversized frame");
            let close = CloseDetail::new(CloseCode::TOO_BIG, "frame too large");
            self.finish(TerminationReason::Error(err.to_string()), Some(close), step);
            return;
        }

        trace!(connection = %self.id, opcode = %frame.opcode(), len = frame.len(), "frame received");

        match frame.kind() {
            FrameKind::Data => {
                self.call("handle_data", step, |handler, state| {
                    handler.handle_data(frame, state)
                });
            }
            FrameKind::Control => {
                if frame.opcode() == Opcode::Ping {
                    step.outbound.push(Outbound::AutoPong(frame.payload().clone()));
                }
                if self.handles_control {
                    self.call("handle_control", step, |handler, state| {
                        handler.handle_control(frame, state)
                    });
                } else if frame.opcode() == Opcode::Pong {
                    trace!(connection = %self.id, "pong discarded");
                }
            }
        }
    }
}

// ============================================================================
// Dispatcher - Effects
// ============================================================================

impl<H: Handler> Dispatcher<H> {
    /// Runs a state-threading callback and applies its effect.
    fn call<F>(&mut self, callback: &'static str, step: &mut Step, f: F)
    where
        F: FnOnce(&H, H::State) -> Effect<H::State>,
    {
        let Some(state) = self.state.take() else {
            let detail = format!("{callback} dispatched without state");
            self.finish(TerminationReason::Error(detail), None, step);
            return;
        };

        let handler = Arc::clone(&self.handler);
        match invoke(callback, || f(&handler, state)) {
            Ok(effect) => self.apply(effect, step),
            Err(detail) => {
                warn!(connection = %self.id, %detail, "callback failed");
                self.finish(TerminationReason::Error(detail), None, step);
            }
        }
    }

    /// Interprets an effect descriptor.
    fn apply(&mut self, effect: Effect<H::State>, step: &mut Step) {
        match effect {
            Effect::Continue(state) => {
                self.state = Some(state);
            }
            Effect::Reply { frame, state } => {
                step.outbound.push(Outbound::Frame(frame));
                self.state = Some(state);
            }
            Effect::Push { frames, state } => {
                step.outbound.extend(frames.into_iter().map(Outbound::Frame));
                self.state = Some(state);
            }
            Effect::Stop {
                cause,
                close,
                state,
            } => {
                self.state = Some(state);
                self.finish(TerminationReason::from_cause(cause), close, step);
            }
        }
    }

    /// Queues the close frame and terminates.
    fn finish(&mut self, reason: TerminationReason, close: Option<CloseDetail>, step: &mut Step) {
        let close = close.unwrap_or_else(|| reason.close_detail());
        step.outbound.push(Outbound::Close(close));
        self.terminate(reason);
        step.finished = true;
    }

    /// Calls `terminate` once and moves to [`Phase::Terminated`].
    fn terminate(&mut self, reason: TerminationReason) {
        if matches!(self.phase, Phase::Terminated | Phase::Negotiating) {
            return;
        }
        self.phase = Phase::Closing;

        let state = self.state.take();
        let handler = Arc::clone(&self.handler);
        let handed = reason.clone();
        if let Err(detail) = invoke("terminate", || handler.terminate(handed, state)) {
            warn!(connection = %self.id, %detail, "terminate failed");
        }

        self.phase = Phase::Terminated;
        info!(connection = %self.id, %reason, "connection terminated");
        self.reason = Some(reason);
    }
}

impl<H: Handler> Drop for Dispatcher<H> {
    fn drop(&mut self) {
        if self.phase == Phase::Live {
            self.terminate(TerminationReason::error("connection dropped"));
        }
    }
}

// ============================================================================
// Panic Boundary
// ============================================================================

/// Runs a callback, converting a panic into an error detail.
fn invoke<T>(callback: &'static str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| format!("{callback} panicked: {}", panic_message(payload.as_ref())))
}

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ============================================================================
// Tests
// ============================================================================
