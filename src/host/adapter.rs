//! Host adapter strategy.
//!
//! A host adapter performs the HTTP upgrade for one specific server backend
//! and describes, as data, how that backend treats each upgrade option and
//! which protocol chores it already performs on its own.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::warn;

use crate::error::Result;
use crate::identifiers::ConnectionId;

use super::options::{OptionKey, UpgradeOptions};

// ============================================================================
// Support
// ============================================================================

/// How a host backend honors an upgrade option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Enforced by the backend itself.
    Native,
    /// Enforced by the session driver on the backend's behalf.
    Emulated,
    /// Accepted but has no effect.
    Ignored,
}

// ============================================================================
// HostProfile
// ============================================================================

/// Static description of a host backend.
#[derive(Debug)]
pub struct HostProfile {
    /// Backend name, used in logs.
    pub name: &'static str,
    /// The backend queues a pong for every ping it reads. The driver then
    /// flushes instead of writing its own pong, so the client still sees
    /// exactly one.
    pub auto_pong: bool,
    /// Per-option support. Options missing from the table are ignored.
    pub options: &'static [(OptionKey, Support)],
}

impl HostProfile {
    /// Returns how this host treats `key`.
    #[must_use]
    pub fn support(&self, key: OptionKey) -> Support {
        self.options
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(Support::Ignored, |(_, support)| *support)
    }

    /// Options set by the caller that this host ignores.
    pub fn ignored<'a>(&'a self, options: &'a UpgradeOptions) -> impl Iterator<Item = OptionKey> + 'a {
        OptionKey::ALL
            .into_iter()
            .filter(move |key| options.is_set(*key) && self.support(*key) == Support::Ignored)
    }

    /// Logs every ignored option for a connection.
    pub fn report_ignored(&self, id: ConnectionId, options: &UpgradeOptions) {
        for key in self.ignored(options) {
            warn!(
                connection = %id,
                host = self.name,
                option = key.as_str(),
                "Upgrade option not supported by host, ignored"
            );
        }
    }
}

// ============================================================================
// HostAdapter
// ============================================================================

/// Strategy that upgrades accepted TCP streams for one backend.
#[async_trait]
pub trait HostAdapter: Send + Sync + 'static {
    /// Upgraded message stream handed to the session.
    type Stream: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Unpin
        + Send
        + 'static;

    /// Returns the backend's profile.
    fn profile(&self) -> &'static HostProfile;

    /// Performs the WebSocket upgrade on an accepted stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) if the
    /// handshake fails.
    async fn upgrade(&self, stream: TcpStream, options: &UpgradeOptions) -> Result<Self::Stream>;
}

// ============================================================================
// Tests
// ============================================================================
