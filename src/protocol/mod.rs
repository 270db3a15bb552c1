//! Frame and close types shared by handlers and the dispatcher.
//!
//! Wire encoding is delegated to `tokio-tungstenite`; these types are the
//! reassembled view handlers work with.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Frame`] | Text, binary, ping or pong message |
//! | [`Opcode`] | Frame opcode, close excluded |
//! | [`FrameKind`] | Data vs control classification |
//! | [`CloseCode`] | RFC 6455 close status code |
//! | [`CloseDetail`] | Code plus reason text of a close frame |

// ============================================================================
// Submodules
// ============================================================================

/// Close codes and close detail.
pub mod close;

/// Reassembled frames.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::{CloseCode, CloseDetail};
pub use frame::{Frame, FrameKind, Opcode};
