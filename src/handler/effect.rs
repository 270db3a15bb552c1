//! Effect descriptors returned by handler callbacks.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::{CloseDetail, Frame};

// ============================================================================
// Cause
// ============================================================================

/// Why a handler asked to stop.
///
/// `Normal` maps to [`TerminationReason::Normal`](super::TerminationReason::Normal);
/// anything else maps to `TerminationReason::Error` carrying the cause text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// Orderly, handler-initiated close.
    Normal,
    /// Any other cause.
    Custom(String),
}

impl Cause {
    /// Creates a custom cause.
    #[inline]
    #[must_use]
    pub fn custom(cause: impl Into<String>) -> Self {
        Self::Custom(cause.into())
    }

    /// Returns `true` for [`Cause::Normal`].
    #[inline]
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Custom(cause) => f.write_str(cause),
        }
    }
}

// ============================================================================
// Effect
// ============================================================================

/// What the dispatcher should do after a callback returns.
///
/// Every variant carries the state to pass into the next callback, or into
/// `terminate` for [`Effect::Stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an effect must be returned to the dispatcher"]
pub enum Effect<S> {
    /// Keep the connection open with updated state.
    Continue(S),

    /// Send one frame and keep the connection open.
    Reply {
        /// Frame to send.
        frame: Frame,
        /// Updated state.
        state: S,
    },

    /// Send frames in order and keep the connection open.
    Push {
        /// Frames to send, possibly empty.
        frames: Vec<Frame>,
        /// Updated state.
        state: S,
    },

    /// Close the connection.
    Stop {
        /// Why the handler is stopping.
        cause: Cause,
        /// Close frame to send instead of the default for `cause`.
        close: Option<CloseDetail>,
        /// Final state handed to `terminate`.
        state: S,
    },
}

impl<S> Effect<S> {
    /// Continues with updated state.
    #[inline]
    pub fn ok(state: S) -> Self {
        Self::Continue(state)
    }

    /// Sends one frame and continues.
    #[inline]
    pub fn reply(frame: Frame, state: S) -> Self {
        Self::Reply { frame, state }
    }

    /// Sends several frames and continues.
    #[inline]
    pub fn push(frames: impl IntoIterator<Item = Frame>, state: S) -> Self {
        Self::Push {
            frames: frames.into_iter().collect(),
            state,
        }
    }

    /// Stops with the given cause.
    #[inline]
    pub fn stop(cause: Cause, state: S) -> Self {
        Self::Stop {
            cause,
            close: None,
            state,
        }
    }

    /// Stops with the given cause and an explicit close frame.
    #[inline]
    pub fn stop_with(cause: Cause, close: CloseDetail, state: S) -> Self {
        Self::Stop {
            cause,
            close: Some(close),
            state,
        }
    }

    /// Returns `true` for [`Effect::Stop`].
    #[inline]
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }

    /// Returns the carried state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &S {
        match self {
            Self::Continue(state)
            | Self::Reply { state, .. }
            | Self::Push { state, .. }
            | Self::Stop { state, .. } => state,
        }
    }

    /// Maps the carried state, keeping the effect.
    #[inline]
    pub fn map_state<T>(self, f: impl FnOnce(S) -> T) -> Effect<T> {
        match self {
            Self::Continue(state) => Effect::Continue(f(state)),
            Self::Reply { frame, state } => Effect::Reply {
                frame,
                state: f(state),
            },
            Self::Push { frames, state } => Effect::Push {
                frames,
                state: f(state),
            },
            Self::Stop {
                cause,
                close,
                state,
            } => Effect::Stop {
                cause,
                close,
                state: f(state),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
