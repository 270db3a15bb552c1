//! Reassembled WebSocket frames.
//!
//! A [`Frame`] is one complete message after continuation reassembly. Close
//! frames are not represented here: closing is owned by the dispatcher and
//! travels as [`CloseDetail`](super::CloseDetail).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};

// ============================================================================
// Opcode
// ============================================================================

/// Frame opcode, excluding close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// UTF-8 text data frame.
    Text,
    /// Binary data frame.
    Binary,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
}

impl Opcode {
    /// Returns the frame class this opcode belongs to.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> FrameKind {
        match self {
            Self::Text | Self::Binary => FrameKind::Data,
            Self::Ping | Self::Pong => FrameKind::Control,
        }
    }

    /// Returns the opcode name as used in logs.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FrameKind
// ============================================================================

/// Classification used by the dispatcher to route frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Text or binary, routed to `handle_data`.
    Data,
    /// Ping or pong, routed to `handle_control`.
    Control,
}

// ============================================================================
// Frame
// ============================================================================

/// One reassembled frame: an opcode and its payload.
///
/// Text frames always carry valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: Opcode,
    payload: Bytes,
}

impl Frame {
    /// Creates a frame from an opcode and raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] for a text frame whose payload is not
    /// valid UTF-8.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if opcode == Opcode::Text && std::str::from_utf8(&payload).is_err() {
            return Err(Error::InvalidUtf8);
        }
        Ok(Self { opcode, payload })
    }

    /// Creates a text frame.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            opcode: Opcode::Text,
            payload: Bytes::from(text.into()),
        }
    }

    /// Creates a binary frame.
    #[inline]
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: Opcode::Binary,
            payload: payload.into(),
        }
    }

    /// Creates a ping frame.
    #[inline]
    #[must_use]
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: Opcode::Ping,
            payload: payload.into(),
        }
    }

    /// Creates a pong frame.
    #[inline]
    #[must_use]
    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: Opcode::Pong,
            payload: payload.into(),
        }
    }

    /// Returns the opcode.
    #[inline]
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the frame class.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.opcode.kind()
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the payload as text for text frames.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.opcode {
            Opcode::Text => std::str::from_utf8(&self.payload).ok(),
            _ => None,
        }
    }

    /// Consumes the frame, returning its payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

// ============================================================================
// Tungstenite Conversions
// ============================================================================

impl Frame {
    /// Converts this frame into a tungstenite message for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if a text payload is not UTF-8. Frames
    /// built through the constructors never fail.
    pub fn into_message(self) -> Result<Message> {
        let message = match self.opcode {
            Opcode::Text => {
                let text = std::str::from_utf8(&self.payload).map_err(|_| Error::InvalidUtf8)?;
                Message::Text(text.to_owned().into())
            }
            Opcode::Binary => Message::Binary(self.payload),
            Opcode::Ping => Message::Ping(self.payload),
            Opcode::Pong => Message::Pong(self.payload),
        };
        Ok(message)
    }

    /// Converts a tungstenite data or control message into a frame.
    ///
    /// Returns `None` for close and raw frame messages.
    #[must_use]
    pub fn from_message(message: Message) -> Option<Self> {
        let frame = match message {
            Message::Text(text) => Self::text(text.as_str()),
            Message::Binary(payload) => Self::binary(payload),
            Message::Ping(payload) => Self::ping(payload),
            Message::Pong(payload) => Self::pong(payload),
            Message::Close(_) | Message::Frame(_) => return None,
        };
        Some(frame)
    }
}

// ============================================================================
// Tests
// ============================================================================
