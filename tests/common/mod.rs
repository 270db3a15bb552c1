#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing_subscriber::EnvFilter;

use websock::{
    Cause, ConnectionHandle, Effect, Frame, Handler, Session, TerminationReason, TungsteniteHost,
    UpgradeOptions,
};

static INIT_LOGGING: Once = Once::new();

/// Installs a test subscriber once. Honors `RUST_LOG`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Script handler
// ============================================================================

/// How `init` should behave.
#[derive(Debug, Clone, Copy)]
pub enum Admission {
    Accept,
    Reject,
}

/// Records every callback. State is the list of texts seen, in order.
///
/// Data frames:
/// - `"ping"` replies `"pong-data"`
/// - `"bye"` stops normally
/// - `"boom"` panics
/// - `"slow"` blocks the thread for half a second
/// - anything else is echoed
///
/// Out-of-band messages are sent to the client as text.
#[derive(Default)]
pub struct Script {
    pub control: bool,
    pub calls: Mutex<Vec<String>>,
    pub terminations: Mutex<Vec<(TerminationReason, Option<Vec<String>>)>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_control() -> Arc<Self> {
        Arc::new(Self {
            control: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn terminations(&self) -> Vec<(TerminationReason, Option<Vec<String>>)> {
        self.terminations.lock().clone()
    }
}

impl Handler for Script {
    type State = Vec<String>;
    type InitArg = Admission;
    type Message = String;

    fn init(&self, admission: Admission) -> Effect<Vec<String>> {
        self.calls.lock().push("init".into());
        match admission {
            Admission::Accept => Effect::ok(Vec::new()),
            Admission::Reject => Effect::stop(Cause::custom("unauthorized"), Vec::new()),
        }
    }

    fn handle_data(&self, frame: Frame, mut state: Vec<String>) -> Effect<Vec<String>> {
        let text = frame.as_text().unwrap_or("<binary>").to_owned();
        self.calls.lock().push(format!("data:{text}"));
        state.push(text.clone());
        match text.as_str() {
            "ping" => Effect::reply(Frame::text("pong-data"), state),
            "bye" => Effect::stop(Cause::Normal, state),
            "boom" => panic!("script exploded"),
            "slow" => {
                std::thread::sleep(Duration::from_millis(500));
                Effect::ok(state)
            }
            _ => Effect::reply(frame, state),
        }
    }

    fn handles_control(&self) -> bool {
        self.control
    }

    fn handle_control(&self, frame: Frame, state: Vec<String>) -> Effect<Vec<String>> {
        self.calls.lock().push(format!("control:{}", frame.opcode()));
        Effect::ok(state)
    }

    fn handle_out_of_band(&self, message: String, mut state: Vec<String>) -> Effect<Vec<String>> {
        self.calls.lock().push(format!("oob:{message}"));
        state.push(message.clone());
        Effect::reply(Frame::text(message), state)
    }

    fn terminate(&self, reason: TerminationReason, state: Option<Vec<String>>) {
        self.calls.lock().push("terminate".into());
        self.terminations.lock().push((reason, state));
    }
}

// ============================================================================
// In-memory connections
// ============================================================================

/// Client end of an in-memory connection plus the server session.
pub struct Harness {
    pub client: WebSocketStream<DuplexStream>,
    pub handle: ConnectionHandle<String>,
    pub task: JoinHandle<TerminationReason>,
}

/// Runs a session for `handler` over an in-memory duplex pipe.
pub async fn connect(handler: Arc<Script>, options: UpgradeOptions, admission: Admission) -> Harness {
    init_test_logging();

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let ws = TungsteniteHost::new().attach(server_io, &options).await;
    let (handle, task) = Session::new(handler, options).spawn(ws, admission);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

    Harness {
        client,
        handle,
        task,
    }
}

/// Reads the next message, failing the test after two seconds.
pub async fn next_message<S>(client: &mut S) -> Message
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("read failed")
}

/// Reads until a close frame arrives and returns its code, if any.
pub async fn expect_close<S>(client: &mut S) -> Option<u16>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match next_message(client).await {
            Message::Close(frame) => return frame.map(|f| u16::from(f.code)),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected close, got {other:?}"),
        }
    }
}

/// Returns the text of a text message.
pub fn text(message: Message) -> String {
    match message {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text, got {other:?}"),
    }
}
