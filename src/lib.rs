//! websock - host-independent WebSocket handlers.
//!
//! Application code implements [`Handler`] once and runs on any host that
//! provides a [`HostAdapter`]. The [`Dispatcher`] turns each connection's
//! frames, out-of-band messages and lifecycle events into handler callbacks,
//! threading the handler's state from one callback into the next.
//!
//! # Architecture
//!
//! ```text
//! TCP ──► HostAdapter::upgrade ──► Session task ──► Dispatcher ──► Handler
//!                                       ▲                │
//!           ConnectionHandle::send ─────┘                ▼
//!                                                   Effect<State>
//! ```
//!
//! - One session task per connection; callbacks never overlap
//! - Pings are answered exactly once, by the host
//! - `terminate` runs exactly once, last, even after a panicking callback
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::SocketAddr;
//!
//! use websock::{Effect, Frame, Handler, Result, Server, TerminationReason};
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     type State = ();
//!     type InitArg = ();
//!     type Message = String;
//!
//!     fn init(&self, _arg: ()) -> Effect<()> {
//!         Effect::ok(())
//!     }
//!
//!     fn handle_data(&self, frame: Frame, state: ()) -> Effect<()> {
//!         Effect::reply(frame, state)
//!     }
//!
//!     fn handle_out_of_band(&self, text: String, state: ()) -> Effect<()> {
//!         Effect::reply(Frame::text(text), state)
//!     }
//!
//!     fn terminate(&self, _reason: TerminationReason, _state: Option<()>) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::builder(Echo)
//!         .on_connect(|_, _| ())
//!         .bind(SocketAddr::from(([127, 0, 0, 1], 9001)))
//!         .await?;
//!
//!     println!("listening on {}", server.ws_url());
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`handler`] | [`Handler`] contract, [`Effect`] and [`TerminationReason`] |
//! | [`dispatch`] | Per-connection state machine |
//! | [`host`] | [`UpgradeOptions`] and host adapters |
//! | [`transport`] | Session task, [`Server`] and [`ConnectionHandle`] |
//! | [`protocol`] | [`Frame`] and close codes |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`ConnectionId`] |

// ============================================================================
// Modules
// ============================================================================

/// Per-connection dispatcher.
///
/// Sans-IO: feed it [`Event`]s, perform the writes in each [`Step`].
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// The handler contract.
pub mod handler;

/// Host backends and upgrade options.
pub mod host;

/// Type-safe identifiers.
pub mod identifiers;

/// Frames and close codes.
pub mod protocol;

/// Session driver and TCP server.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Handler contract
pub use handler::{Cause, Effect, Handler, TerminationReason};

// Dispatcher
pub use dispatch::{Dispatcher, Event, Outbound, Phase, Step};

// Host types
pub use host::{HostAdapter, HostProfile, TungsteniteHost, UpgradeOptions};

// Transport types
pub use transport::{ConnectionHandle, Server, ServerBuilder, Session};

// Protocol types
pub use protocol::{CloseCode, CloseDetail, Frame, Opcode};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;
