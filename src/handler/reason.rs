//! Termination reasons and their close-code mapping.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::{CloseCode, CloseDetail};

use super::effect::Cause;

// ============================================================================
// TerminationReason
// ============================================================================

/// Why a connection ended. Handed to `terminate` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The handler stopped with [`Cause::Normal`].
    Normal,
    /// The client sent a close frame. Carries its status code, or
    /// [`CloseCode::NO_STATUS`] when the frame had none.
    Remote(CloseCode),
    /// The host is shutting down.
    Shutdown,
    /// No frame traffic within the configured idle window.
    Timeout,
    /// Handler-signalled error, transport failure, protocol violation or
    /// a panicking callback.
    Error(String),
}

impl TerminationReason {
    /// Maps a handler stop cause to its reason.
    #[must_use]
    pub fn from_cause(cause: Cause) -> Self {
        match cause {
            Cause::Normal => Self::Normal,
            Cause::Custom(cause) => Self::Error(cause),
        }
    }

    /// Creates an error reason.
    #[inline]
    #[must_use]
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error(detail.into())
    }

    /// Returns the table key for this reason.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ReasonKind {
        match self {
            Self::Normal => ReasonKind::Normal,
            Self::Remote(_) => ReasonKind::Remote,
            Self::Shutdown => ReasonKind::Shutdown,
            Self::Timeout => ReasonKind::Timeout,
            Self::Error(_) => ReasonKind::Error,
        }
    }

    /// Returns `true` for [`TerminationReason::Error`].
    #[inline]
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Close frame to send to the client for this reason.
    ///
    /// Remote closes echo the client's code; everything else is looked up
    /// in [`CLOSE_CODES`].
    #[must_use]
    pub fn close_detail(&self) -> CloseDetail {
        match self {
            Self::Remote(code) => CloseDetail::code(*code),
            other => CloseDetail::code(close_code_for(other.kind())),
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Remote(code) => write!(f, "remote({code})"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Timeout => f.write_str("timeout"),
            Self::Error(detail) => write!(f, "error({detail})"),
        }
    }
}

// ============================================================================
// Close Code Table
// ============================================================================

/// Reason class, used as the key of [`CLOSE_CODES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    /// See [`TerminationReason::Normal`].
    Normal,
    /// See [`TerminationReason::Remote`].
    Remote,
    /// See [`TerminationReason::Shutdown`].
    Shutdown,
    /// See [`TerminationReason::Timeout`].
    Timeout,
    /// See [`TerminationReason::Error`].
    Error,
}

/// Close code sent to the client for each locally decided reason.
///
/// `Remote` echoes the client's code and is listed for completeness only.
pub const CLOSE_CODES: &[(ReasonKind, CloseCode)] = &[
    (ReasonKind::Normal, CloseCode::NORMAL),
    (ReasonKind::Remote, CloseCode::NORMAL),
    (ReasonKind::Shutdown, CloseCode::AWAY),
    (ReasonKind::Timeout, CloseCode::AWAY),
    (ReasonKind::Error, CloseCode::INTERNAL_ERROR),
];

/// Looks up the close code for a reason class.
#[must_use]
pub fn close_code_for(kind: ReasonKind) -> CloseCode {
    CLOSE_CODES
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(CloseCode::INTERNAL_ERROR, |(_, code)| *code)
}

// ============================================================================
// Tests
// ============================================================================
