//! Dispatcher inputs and outputs.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;

use crate::protocol::{CloseCode, CloseDetail, Frame};

// ============================================================================
// Event
// ============================================================================

/// One input to a connection's dispatcher.
///
/// Frames, remote closes and transport failures come from reading the
/// stream; out-of-band messages come from connection handles. Shutdown and
/// idle timeout are raised by the session driver.
#[derive(Debug)]
pub enum Event<M> {
    /// A reassembled data or control frame.
    Frame(Frame),
    /// The client sent a close frame, with its detail if present.
    RemoteClose(Option<CloseDetail>),
    /// Message delivered from outside the frame stream.
    OutOfBand(M),
    /// The host is shutting this connection down.
    Shutdown,
    /// The idle window elapsed without frame traffic.
    IdleTimeout,
    /// The transport rejected inbound data, e.g. an oversized or malformed
    /// frame. The connection is closed with `code`.
    ProtocolViolation {
        /// Close code sent to the client.
        code: CloseCode,
        /// What was violated.
        detail: String,
    },
    /// Read or write failure, or the peer vanished without a close frame.
    TransportError(String),
}

impl<M> Event<M> {
    /// Returns `true` if this event is frame traffic received from the peer.
    #[inline]
    #[must_use]
    pub const fn is_traffic(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::RemoteClose(_))
    }

    /// Short event name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Frame(_) => "frame",
            Self::RemoteClose(_) => "remote_close",
            Self::OutOfBand(_) => "out_of_band",
            Self::Shutdown => "shutdown",
            Self::IdleTimeout => "idle_timeout",
            Self::ProtocolViolation { .. } => "protocol_violation",
            Self::TransportError(_) => "transport_error",
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// A write the transport must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Frame produced by a handler effect.
    Frame(Frame),
    /// Pong answering a received ping, carrying the ping's payload.
    AutoPong(Bytes),
    /// Close frame. Always the last write of a connection.
    Close(CloseDetail),
}

impl Outbound {
    /// Returns `true` for [`Outbound::Close`].
    #[inline]
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }
}

// ============================================================================
// Step
// ============================================================================

/// Result of feeding one event to the dispatcher.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[must_use = "outbound writes must be performed"]
pub struct Step {
    /// Writes to perform, in order.
    pub outbound: Vec<Outbound>,
    /// `true` once `terminate` has run; no further events are accepted.
    pub finished: bool,
}

impl Step {
    /// Returns the frames a handler asked to send, skipping pongs and close.
    #[must_use]
    pub fn frames(&self) -> Vec<&Frame> {
        self.outbound
            .iter()
            .filter_map(|out| match out {
                Outbound::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Returns the close detail if this step closes the connection.
    #[must_use]
    pub fn close(&self) -> Option<&CloseDetail> {
        self.outbound.iter().find_map(|out| match out {
            Outbound::Close(detail) => Some(detail),
            _ => None,
        })
    }

    /// Number of auto-pongs in this step.
    #[must_use]
    pub fn auto_pongs(&self) -> usize {
        self.outbound
            .iter()
            .filter(|out| matches!(out, Outbound::AutoPong(_)))
            .count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_events() {
        assert!(Event::<()>::Frame(Frame::text("x")).is_traffic());
        assert!(Event::<()>::RemoteClose(None).is_traffic());
        assert!(!Event::OutOfBand(()).is_traffic());
        assert!(!Event::<()>::IdleTimeout.is_traffic());
    }

    #[test]
    fn test_step_accessors() {
        let step = Step {
            outbound: vec![
                Outbound::AutoPong(Bytes::new()),
                Outbound::Frame(Frame::text("a")),
                Outbound::Close(CloseDetail::code(CloseCode::NORMAL)),
            ],
            finished: true,
        };
        assert_eq!(step.frames(), vec![&Frame::text("a")]);
        assert_eq!(step.auto_pongs(), 1);
        assert_eq!(step.close().map(|c| c.code), Some(CloseCode::NORMAL));
    }
}
