//! Close status codes and close frame detail.
//!
//! Codes follow the RFC 6455 §7.4.1 registry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;

// ============================================================================
// CloseCode
// ============================================================================

/// WebSocket close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(u16);

impl CloseCode {
    /// 1000: normal closure.
    pub const NORMAL: Self = Self(1000);
    /// 1001: endpoint going away (server shutdown, idle).
    pub const AWAY: Self = Self(1001);
    /// 1002: protocol error.
    pub const PROTOCOL: Self = Self(1002);
    /// 1003: unsupported data.
    pub const UNSUPPORTED: Self = Self(1003);
    /// 1005: no status code was present. Never sent on the wire.
    pub const NO_STATUS: Self = Self(1005);
    /// 1006: abnormal closure. Never sent on the wire.
    pub const ABNORMAL: Self = Self(1006);
    /// 1007: invalid frame payload data.
    pub const INVALID_PAYLOAD: Self = Self(1007);
    /// 1008: policy violation.
    pub const POLICY: Self = Self(1008);
    /// 1009: message too big.
    pub const TOO_BIG: Self = Self(1009);
    /// 1011: unexpected server condition.
    pub const INTERNAL_ERROR: Self = Self(1011);

    /// Creates a close code from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns `true` if this code may appear in a close frame on the wire.
    #[inline]
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        !matches!(self.0, 1004 | 1005 | 1006 | 1015) && self.0 >= 1000 && self.0 < 5000
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<WsCloseCode> for CloseCode {
    fn from(code: WsCloseCode) -> Self {
        Self(u16::from(code))
    }
}

impl From<CloseCode> for WsCloseCode {
    fn from(code: CloseCode) -> Self {
        WsCloseCode::from(code.0)
    }
}

// ============================================================================
// CloseDetail
// ============================================================================

/// Status code and reason text carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDetail {
    /// Close status code.
    pub code: CloseCode,
    /// Human-readable reason, may be empty.
    pub reason: String,
}

impl CloseDetail {
    /// Creates a close detail with a reason text.
    #[inline]
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a close detail with an empty reason.
    #[inline]
    #[must_use]
    pub fn code(code: CloseCode) -> Self {
        Self::new(code, String::new())
    }

    /// Converts into a tungstenite close frame.
    ///
    /// Returns `None` for codes that must not be sent, which produces an
    /// empty close frame on the wire.
    #[must_use]
    pub fn into_close_frame(self) -> Option<CloseFrame> {
        if !self.code.is_sendable() {
            return None;
        }
        Some(CloseFrame {
            code: self.code.into(),
            reason: self.reason.into(),
        })
    }

    /// Builds a detail from a received close frame.
    #[must_use]
    pub fn from_close_frame(frame: &CloseFrame) -> Self {
        Self::new(frame.code.into(), frame.reason.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
