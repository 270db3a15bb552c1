//! Handler contract: callbacks, effects and termination reasons.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Handler`] | Callback set implemented by applications |
//! | [`Effect`] | Tagged result of every callback except `terminate` |
//! | [`Cause`] | Why a handler stopped |
//! | [`TerminationReason`] | Why a connection ended |

// ============================================================================
// Submodules
// ============================================================================

/// The handler trait.
pub mod contract;

/// Effect descriptors.
pub mod effect;

/// Termination reasons and close-code table.
pub mod reason;

// ============================================================================
// Re-exports
// ============================================================================

pub use contract::Handler;
pub use effect::{Cause, Effect};
pub use reason::{CLOSE_CODES, ReasonKind, TerminationReason};
