//! TCP server hosting one handler.
//!
//! Accepts TCP connections, upgrades each through a [`HostAdapter`] and runs
//! it as a [`Session`]. Live connections are kept in a registry keyed by
//! [`ConnectionId`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Server                   │
//! │             (single port)                │
//! │  ┌────────────────────────────────────┐  │
//! │  │ conn-1 → ConnectionHandle → task   │  │
//! │  │ conn-2 → ConnectionHandle → task   │  │
//! │  │ conn-3 → ConnectionHandle → task   │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let server = Server::builder(Chat::default())
//!     .with_options(UpgradeOptions::new().with_timeout_ms(30_000))
//!     .on_connect(|id, addr| Login { id, addr })
//!     .bind("127.0.0.1:0".parse()?)
//!     .await?;
//!
//! println!("listening on {}", server.ws_url());
//! server.broadcast(ChatMessage::System("welcome".into()));
//! server.shutdown().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::host::{HostAdapter, TungsteniteHost, UpgradeOptions};
use crate::identifiers::ConnectionId;

use super::connection::{ConnectionHandle, Session};

// ============================================================================
// Constants
// ============================================================================

/// Time allowed for a client to complete the HTTP upgrade.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Produces the `init` argument for a newly accepted connection.
type InitFactory<A> = Arc<dyn Fn(ConnectionId, SocketAddr) -> A + Send + Sync>;

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for [`Server`].
pub struct ServerBuilder<H: Handler, A: HostAdapter = TungsteniteHost> {
    handler: H,
    adapter: A,
    options: UpgradeOptions,
    init: Option<InitFactory<H::InitArg>>,
}

impl<H: Handler> ServerBuilder<H> {
    /// Creates a builder using the tungstenite backend and default options.
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            adapter: TungsteniteHost::new(),
            options: UpgradeOptions::new(),
            init: None,
        }
    }
}

impl<H: Handler, A: HostAdapter> ServerBuilder<H, A> {
    /// Sets the upgrade options applied to every connection.
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: UpgradeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the host adapter.
    #[must_use]
    pub fn with_adapter<B: HostAdapter>(self, adapter: B) -> ServerBuilder<H, B> {
        ServerBuilder {
            handler: self.handler,
            adapter,
            options: self.options,
            init: self.init,
        }
    }

    /// Sets the factory producing each connection's `init` argument.
    #[must_use]
    pub fn on_connect<F>(mut self, factory: F) -> Self
    where
        F: Fn(ConnectionId, SocketAddr) -> H::InitArg + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(factory));
        self
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// Use port 0 to let the OS pick a free port.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if options are invalid or `on_connect` was not set
    /// - [`Error::Io`] if binding fails
    pub async fn bind(self, addr: SocketAddr) -> Result<Arc<Server<H, A>>> {
        self.options.validate()?;
        let init = self
            .init
            .ok_or_else(|| Error::config("on_connect factory is required"))?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);

        let server = Arc::new(Server {
            local_addr,
            handler: Arc::new(self.handler),
            adapter: self.adapter,
            options: self.options,
            init,
            connections: RwLock::new(FxHashMap::default()),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            shutdown: AtomicBool::new(false),
            stop: stop_tx,
        });

        tokio::spawn(Arc::clone(&server).accept_loop(listener, stop_rx));

        info!(%local_addr, host = server.adapter.profile().name, "server started");
        Ok(server)
    }
}

// ============================================================================
// Server
// ============================================================================

/// Hosts one handler over TCP.
///
/// Thread-safe; all methods take `&self`.
pub struct Server<H: Handler, A: HostAdapter = TungsteniteHost> {
    /// Bound address.
    local_addr: SocketAddr,
    /// Shared handler.
    handler: Arc<H>,
    /// Upgrade strategy.
    adapter: A,
    /// Options applied to every connection.
    options: UpgradeOptions,
    /// `init` argument factory.
    init: InitFactory<H::InitArg>,
    /// Live connections by id.
    connections: RwLock<FxHashMap<ConnectionId, ConnectionHandle<H::Message>>>,
    /// Accepted connections whose task has not finished.
    in_flight: AtomicUsize,
    /// Signaled whenever a connection task finishes.
    drained: Notify,
    /// Shutdown flag.
    shutdown: AtomicBool,
    /// Stops the accept loop.
    stop: watch::Sender<bool>,
}

impl<H: Handler> Server<H> {
    /// Starts building a server for `handler`.
    #[must_use]
    pub fn builder(handler: H) -> ServerBuilder<H> {
        ServerBuilder::new(handler)
    }
}

// ============================================================================
// Server - Public API
// ============================================================================

impl<H: Handler, A: HostAdapter> Server<H, A> {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the upgrade options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &UpgradeOptions {
        &self.options
    }

    /// Returns the number of live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns the ids of live connections.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().keys().copied().collect()
    }

    /// Returns a handle to a live connection.
    #[must_use]
    pub fn handle(&self, id: ConnectionId) -> Option<ConnectionHandle<H::Message>> {
        self.connections.read().get(&id).cloned()
    }

    /// Delivers an out-of-band message to one connection.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownConnection`] if no live connection has this id
    /// - [`Error::ConnectionClosed`] if the connection ended meanwhile
    pub fn send(&self, id: ConnectionId, message: H::Message) -> Result<()> {
        let handle = self
            .handle(id)
            .ok_or_else(|| Error::unknown_connection(id))?;
        handle.send(message)
    }

    /// Delivers a copy of `message` to every live connection.
    ///
    /// Returns how many connections accepted it.
    pub fn broadcast(&self, message: H::Message) -> usize
    where
        H::Message: Clone,
    {
        let handles: Vec<_> = self.connections.read().values().cloned().collect();
        handles
            .iter()
            .filter(|handle| handle.send(message.clone()).is_ok())
            .count()
    }

    /// Returns `true` once shutdown has begun.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Server - Lifecycle
// ============================================================================

impl<H: Handler, A: HostAdapter> Server<H, A> {
    /// Stops accepting, shuts every connection down and waits until each
    /// has run `terminate`.
    ///
    /// Clients receive close code 1001. Idempotent.
    pub async fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!(addr = %self.local_addr, "server shutting down");
        }
        self.stop.send_replace(true);

        let handles: Vec<_> = self.connections.read().values().cloned().collect();
        for handle in &handles {
            handle.shutdown();
        }
        debug!(count = handles.len(), "shutdown signaled");

        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            drained.await;
        }

        info!(addr = %self.local_addr, "server shutdown complete");
    }
}

// ============================================================================
// Server - Accept Loop
// ============================================================================

impl<H: Handler, A: HostAdapter> Server<H, A> {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener, mut stop: watch::Receiver<bool>) {
        debug!("accept loop started");

        loop {
            tokio::select! {
                biased;

                _ = stop.changed() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        self.in_flight.fetch_add(1, Ordering::SeqCst);
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            let _in_flight = InFlight(&server.in_flight, &server.drained);
                            if let Err(e) = server.handle_connection(stream, addr).await {
                                warn!(error = %e, %addr, "connection handling failed");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                },
            }
        }

        debug!("accept loop terminated");
    }

    /// Upgrades one TCP stream and runs its session to completion.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(%addr, "new TCP connection");

        let ws = timeout(UPGRADE_TIMEOUT, self.adapter.upgrade(stream, &self.options))
            .await
            .map_err(|_| Error::connection("upgrade timed out"))??;

        let id = ConnectionId::next();
        let init_arg = (self.init)(id, addr);
        let session = Session::new(Arc::clone(&self.handler), self.options.clone())
            .with_id(id)
            .with_profile(self.adapter.profile());
        let (handle, task) = session.spawn(ws, init_arg);

        self.connections.write().insert(id, handle.clone());
        info!(connection = %id, %addr, "connection accepted");

        if self.is_shutdown() {
            handle.shutdown();
        }

        let outcome = task.await;
        self.connections.write().remove(&id);

        match outcome {
            Ok(reason) => {
                debug!(connection = %id, %reason, "connection removed");
                Ok(())
            }
            Err(e) => Err(Error::connection(format!("session task failed: {e}"))),
        }
    }
}

// ============================================================================
// InFlight
// ============================================================================

/// Marks one accepted connection as finished when dropped, even if its task
/// unwinds.
struct InFlight<'a>(&'a AtomicUsize, &'a Notify);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
        self.1.notify_waiters();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handler::{Effect, TerminationReason};
    use crate::protocol::Frame;

    struct Silent;

    impl Handler for Silent {
        type State = ();
        type InitArg = ();
        type Message = String;

        fn init(&self, (): ()) -> Effect<()> {
            Effect::ok(())
        }

        fn handle_data(&self, _frame: Frame, state: ()) -> Effect<()> {
            Effect::ok(state)
        }

        fn handle_out_of_band(&self, _message: String, state: ()) -> Effect<()> {
            Effect::ok(state)
        }

        fn terminate(&self, _reason: TerminationReason, _state: Option<()>) {}
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = Server::builder(Silent)
            .on_connect(|_, _| ())
            .bind(localhost())
            .await
            .expect("bind");

        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
        assert_eq!(server.connection_count(), 0);
        server.shutdown().await;
        assert!(server.is_shutdown());
    }

    #[tokio::test]
    async fn test_bind_requires_init_factory() {
        let result = Server::builder(Silent).bind(localhost()).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_bind_validates_options() {
        let result = Server::builder(Silent)
            .with_options(UpgradeOptions::new().with_max_frame_size(0))
            .on_connect(|_, _| ())
            .bind(localhost())
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection() {
        let server = Server::builder(Silent)
            .on_connect(|_, _| ())
            .bind(localhost())
            .await
            .expect("bind");

        let id = ConnectionId::next();
        let result = server.send(id, "hello".into());
        assert!(matches!(result, Err(Error::UnknownConnection { id: missing }) if missing == id));
        assert_eq!(server.broadcast("all".into()), 0);

        server.shutdown().await;
    }

    /// Upgrades over a buffered stream and counts upgrades.
    #[derive(Default)]
    struct BufferedHost {
        upgrades: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl HostAdapter for BufferedHost {
        type Stream = tokio_tungstenite::WebSocketStream<tokio::io::BufStream<TcpStream>>;

        fn profile(&self) -> &'static crate::host::HostProfile {
            &crate::host::TUNGSTENITE_PROFILE
        }

        async fn upgrade(&self, stream: TcpStream, options: &UpgradeOptions) -> Result<Self::Stream> {
            self.upgrades.fetch_add(1, Ordering::SeqCst);
            tokio_tungstenite::accept_async_with_config(
                tokio::io::BufStream::new(stream),
                Some(TungsteniteHost::config(options)),
            )
            .await
            .map_err(|e| Error::connection(e.to_string()))
        }
    }

    #[tokio::test]
    async fn test_custom_adapter_stream() {
        use futures_util::StreamExt;
        use tokio_tungstenite::tungstenite::Message;

        let server = Server::builder(Silent)
            .with_adapter(BufferedHost::default())
            .on_connect(|_, _| ())
            .bind(localhost())
            .await
            .expect("bind");

        let (mut client, _) = tokio_tungstenite::connect_async(server.ws_url().as_str())
            .await
            .expect("connect");

        timeout(Duration::from_secs(2), async {
            while server.connection_count() != 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection not registered");
        assert_eq!(server.adapter.upgrades.load(Ordering::SeqCst), 1);

        server.shutdown().await;
        match client.next().await {
            Some(Ok(Message::Close(Some(frame)))) => assert_eq!(u16::from(frame.code), 1001),
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_twice() {
        let server = Server::builder(Silent)
            .on_connect(|_, _| ())
            .bind(localhost())
            .await
            .expect("bind");

        server.shutdown().await;
        server.shutdown().await;
        assert_eq!(server.connection_count(), 0);
    }
}
