//! The handler contract.

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::Frame;

use super::effect::Effect;
use super::reason::TerminationReason;

// ============================================================================
// Handler
// ============================================================================

/// Callback set a host invokes for one WebSocket connection.
///
/// A handler holds no per-connection data of its own: everything that
/// changes over a connection's life lives in [`Handler::State`], which the
/// dispatcher moves into each callback and stores from the returned
/// [`Effect`]. The value returned from one callback is the value passed into
/// the next.
///
/// Callbacks run to completion and never overlap for the same connection.
/// They must not block; long work belongs on a separate task that reports
/// back through [`ConnectionHandle::send`](crate::transport::ConnectionHandle::send),
/// which arrives at [`Handler::handle_out_of_band`].
///
/// A panic inside a callback ends the connection with
/// [`TerminationReason::Error`]; `terminate` still runs.
///
/// # Example
///
/// ```ignore
/// use websock::{Cause, Effect, Frame, Handler, TerminationReason};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     type State = u64;
///     type InitArg = ();
///     type Message = String;
///
///     fn init(&self, _arg: ()) -> Effect<u64> {
///         Effect::ok(0)
///     }
///
///     fn handle_data(&self, frame: Frame, count: u64) -> Effect<u64> {
///         Effect::reply(frame, count + 1)
///     }
///
///     fn handle_out_of_band(&self, text: String, count: u64) -> Effect<u64> {
///         Effect::reply(Frame::text(text), count)
///     }
///
///     fn terminate(&self, reason: TerminationReason, count: Option<u64>) {
///         tracing::info!(%reason, ?count, "echo finished");
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Per-connection state, opaque to the host.
    type State: Send + 'static;

    /// Argument handed to [`Handler::init`].
    type InitArg: Send + 'static;

    /// Out-of-band message type.
    type Message: Send + 'static;

    /// Called once after the upgrade completes. May send frames or stop
    /// immediately, in which case no frame is ever dispatched.
    fn init(&self, arg: Self::InitArg) -> Effect<Self::State>;

    /// Called for each text or binary frame, in arrival order.
    fn handle_data(&self, frame: Frame, state: Self::State) -> Effect<Self::State>;

    /// Whether [`Handler::handle_control`] should receive ping and pong
    /// frames. Read once when the connection is set up.
    fn handles_control(&self) -> bool {
        false
    }

    /// Called for each ping or pong frame when [`Handler::handles_control`]
    /// is `true`.
    ///
    /// The host answers pings on its own; returning a pong here sends an
    /// additional, unsolicited one.
    fn handle_control(&self, frame: Frame, state: Self::State) -> Effect<Self::State> {
        let _ = frame;
        Effect::Continue(state)
    }

    /// Called for each message delivered through a connection handle.
    fn handle_out_of_band(
        &self,
        message: Self::Message,
        state: Self::State,
    ) -> Effect<Self::State>;

    /// Called exactly once, last.
    ///
    /// `state` is `None` only when the state was lost to a panicking
    /// callback, or `init` itself panicked.
    fn terminate(&self, reason: TerminationReason, state: Option<Self::State>);
}
