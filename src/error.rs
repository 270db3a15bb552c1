//! Error types for websock.
//!
//! This module defines all error types used throughout the crate.
//!
//! Handler failures are deliberately absent: a panicking callback never
//! surfaces as an [`Error`], it is normalized into
//! [`TerminationReason::Error`](crate::handler::TerminationReason::Error)
//! by the dispatcher.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::UnknownConnection`] |
//! | Protocol | [`Error::Protocol`], [`Error::FrameTooLarge`], [`Error::InvalidUtf8`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when upgrade options or the server builder are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be established or upgraded.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The connection has already terminated.
    ///
    /// Returned when delivering an out-of-band message to a finished session.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No live connection with this id.
    ///
    /// Returned by server lookups for ids that never existed or have ended.
    #[error("Unknown connection: {id}")]
    UnknownConnection {
        /// The missing connection id.
        id: ConnectionId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Inbound frame exceeds the configured `max_frame_size`.
    #[error("Frame of {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge {
        /// Payload size of the offending frame.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Text payload is not valid UTF-8.
    #[error("Text payload is not valid UTF-8")]
    InvalidUtf8,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown connection error.
    #[inline]
    pub fn unknown_connection(id: ConnectionId) -> Self {
        Self::UnknownConnection { id }
    }

    /// Creates a frame too large error.
    #[inline]
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::UnknownConnection { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error is a protocol violation.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::FrameTooLarge { .. } | Self::InvalidUtf8
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("upgrade refused");
        assert_eq!(err.to_string(), "Connection failed: upgrade refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing init factory");
        assert_eq!(err.to_string(), "Configuration error: missing init factory");
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = Error::frame_too_large(2048, 1024);
        assert_eq!(
            err.to_string(),
            "Frame of 2048 bytes exceeds maximum of 1024 bytes"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_unknown_connection_display() {
        let id = ConnectionId::from_u64(9).unwrap();
        assert_eq!(
            Error::unknown_connection(id).to_string(),
            "Unknown connection: conn-9"
        );
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::protocol("bad").is_protocol_error());
        assert!(Error::frame_too_large(2, 1).is_protocol_error());
        assert!(Error::InvalidUtf8.is_protocol_error());
        assert!(!Error::ConnectionClosed.is_protocol_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
