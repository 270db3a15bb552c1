//! Session driver and TCP server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Server         │         WebSocket            │                 │
//! │  → Session      │◄────────────────────────────►│  Client         │
//! │  → Dispatcher   │                              │                 │
//! │  → Handler      │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Server` accepts a TCP stream and upgrades it through its adapter
//! 2. `Session::spawn` starts the session task and calls `init`
//! 3. Frames, out-of-band messages and timers are dispatched one at a time
//! 4. A stop effect, remote close, shutdown, timeout or failure ends the
//!    session; `terminate` runs last
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Session task, event loop and connection handles |
//! | `server` | TCP listener and connection registry |

// ============================================================================
// Submodules
// ============================================================================

/// Session task and connection handles.
pub mod connection;

/// TCP server and connection registry.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionHandle, Session};
pub use server::{Server, ServerBuilder};
