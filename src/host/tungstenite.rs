//! `tokio-tungstenite` host backend.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::{Role, WebSocketConfig};
use tracing::debug;

use crate::error::{Error, Result};

use super::adapter::{HostAdapter, HostProfile, Support};
use super::options::{OptionKey, UpgradeOptions};

// ============================================================================
// Profile
// ============================================================================

/// Profile of the tungstenite backend.
///
/// tungstenite queues pong replies itself and caps frame and message sizes
/// natively. It has no idle timer, and no permessage-deflate support.
pub static TUNGSTENITE_PROFILE: HostProfile = HostProfile {
    name: "tungstenite",
    auto_pong: true,
    options: &[
        (OptionKey::Timeout, Support::Emulated),
        (OptionKey::Compress, Support::Ignored),
        (OptionKey::MaxFrameSize, Support::Native),
        (OptionKey::FullsweepAfter, Support::Ignored),
    ],
};

// ============================================================================
// TungsteniteHost
// ============================================================================

/// Host adapter backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteHost;

impl TungsteniteHost {
    /// Creates the adapter.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Maps upgrade options onto tungstenite's configuration.
    ///
    /// `maxFrameSize` bounds both single frames and reassembled messages;
    /// unbounded lifts tungstenite's own defaults.
    #[must_use]
    pub fn config(options: &UpgradeOptions) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_frame_size(options.max_frame_size)
            .max_message_size(options.max_frame_size)
    }

    /// Wraps an already-upgraded byte stream as the server side.
    ///
    /// Used when the HTTP upgrade happened elsewhere, or over in-memory
    /// streams.
    pub async fn attach<S>(&self, io: S, options: &UpgradeOptions) -> WebSocketStream<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        WebSocketStream::from_raw_socket(io, Role::Server, Some(Self::config(options))).await
    }
}

#[async_trait]
impl HostAdapter for TungsteniteHost {
    type Stream = WebSocketStream<TcpStream>;

    fn profile(&self) -> &'static HostProfile {
        &TUNGSTENITE_PROFILE
    }

    async fn upgrade(&self, stream: TcpStream, options: &UpgradeOptions) -> Result<Self::Stream> {
        let peer = stream.peer_addr().ok();
        let ws_stream =
            tokio_tungstenite::accept_async_with_config(stream, Some(Self::config(options)))
                .await
                .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        debug!(?peer, "WebSocket upgrade completed");
        Ok(ws_stream)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_table() {
        let profile = TungsteniteHost::new().profile();
        assert_eq!(profile.name, "tungstenite");
        assert!(profile.auto_pong);
        assert_eq!(profile.support(OptionKey::Timeout), Support::Emulated);
        assert_eq!(profile.support(OptionKey::MaxFrameSize), Support::Native);
        assert_eq!(profile.support(OptionKey::Compress), Support::Ignored);
    }

    #[test]
    fn test_config_maps_frame_size() {
        let config = TungsteniteHost::config(&UpgradeOptions::new().with_max_frame_size(2048));
        assert_eq!(config.max_frame_size, Some(2048));
        assert_eq!(config.max_message_size, Some(2048));
    }

    #[test]
    fn test_config_unbounded_by_default() {
        let config = TungsteniteHost::config(&UpgradeOptions::new());
        assert!(config.max_frame_size.is_none());
        assert!(config.max_message_size.is_none());
    }
}
