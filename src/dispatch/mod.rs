//! Host dispatcher core.
//!
//! Transport-independent state machine that owns a connection's handler
//! state, invokes callbacks and turns their effects into writes.
//!
//! # Lifecycle
//!
//! 1. [`Dispatcher::new`] - created while the upgrade is negotiated
//! 2. [`Dispatcher::start`] - calls `init`, connection becomes live
//! 3. [`Dispatcher::dispatch`] - one [`Event`] at a time
//! 4. Any terminal event - `terminate` runs once, [`Step::finished`] is set
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dispatcher` | State machine and effect interpreter |
//! | `event` | Queue events, outbound writes, step result |
//! | `phase` | Lifecycle phases |

// ============================================================================
// Submodules
// ============================================================================

/// State machine and effect interpreter.
pub mod dispatcher;

/// Dispatcher inputs and outputs.
pub mod event;

/// Lifecycle phases.
pub mod phase;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::Dispatcher;
pub use event::{Event, Outbound, Step};
pub use phase::Phase;
