//! Property-based tests for the dispatcher.
//!
//! # State threading
//! - The state handed to `terminate` is exactly the data and out-of-band
//!   payloads dispatched before the terminal event, in order
//!
//! # Terminal events
//! - `terminate` runs exactly once and no callback runs after it
//! - Every step after the terminal one is empty
//!
//! # Ping auto-reply
//! - Each ping before the terminal event yields exactly one auto-pong

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use websock::{
    Cause, CloseCode, CloseDetail, ConnectionId, Dispatcher, Effect, Event, Frame, Handler, Step,
    TerminationReason, UpgradeOptions,
};

// ============================================================================
// Handler under test
// ============================================================================

/// Appends every payload to its state; `"stop"` ends the connection.
#[derive(Default)]
struct Accumulate {
    callbacks_after_terminate: Mutex<usize>,
    terminated: Mutex<Vec<(TerminationReason, Option<Vec<String>>)>>,
}

impl Accumulate {
    fn note_callback(&self) {
        if !self.terminated.lock().is_empty() {
            *self.callbacks_after_terminate.lock() += 1;
        }
    }
}

impl Handler for Accumulate {
    type State = Vec<String>;
    type InitArg = ();
    type Message = String;

    fn init(&self, (): ()) -> Effect<Vec<String>> {
        Effect::ok(Vec::new())
    }

    fn handle_data(&self, frame: Frame, mut state: Vec<String>) -> Effect<Vec<String>> {
        self.note_callback();
        let text = frame.as_text().unwrap_or_default().to_owned();
        let stop = text == "stop";
        state.push(text);
        if stop {
            Effect::stop(Cause::Normal, state)
        } else {
            Effect::ok(state)
        }
    }

    fn handle_out_of_band(&self, message: String, mut state: Vec<String>) -> Effect<Vec<String>> {
        self.note_callback();
        state.push(message);
        Effect::ok(state)
    }

    fn terminate(&self, reason: TerminationReason, state: Option<Vec<String>>) {
        self.terminated.lock().push((reason, state));
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Data(String),
    OutOfBand(String),
    Ping,
    Pong,
    Stop,
    RemoteClose(u16),
    Shutdown,
    Timeout,
}

impl Op {
    fn event(&self) -> Event<String> {
        match self {
            Self::Data(text) => Event::Frame(Frame::text(text.as_str())),
            Self::OutOfBand(text) => Event::OutOfBand(text.clone()),
            Self::Ping => Event::Frame(Frame::ping(&b"p"[..])),
            Self::Pong => Event::Frame(Frame::pong(&b"p"[..])),
            Self::Stop => Event::Frame(Frame::text("stop")),
            Self::RemoteClose(code) => {
                Event::RemoteClose(Some(CloseDetail::code(CloseCode::new(*code))))
            }
            Self::Shutdown => Event::Shutdown,
            Self::Timeout => Event::IdleTimeout,
        }
    }

    /// Payload recorded in state, if any.
    fn recorded(&self) -> Option<String> {
        match self {
            Self::Data(text) | Self::OutOfBand(text) => Some(text.clone()),
            Self::Stop => Some("stop".into()),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stop | Self::RemoteClose(_) | Self::Shutdown | Self::Timeout
        )
    }
}

fn arb_payload() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_filter("reserved", |s| s != "stop")
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => arb_payload().prop_map(Op::Data),
        4 => arb_payload().prop_map(Op::OutOfBand),
        2 => Just(Op::Ping),
        1 => Just(Op::Pong),
        1 => Just(Op::Stop),
        1 => (1000u16..=1003).prop_map(Op::RemoteClose),
        1 => Just(Op::Shutdown),
        1 => Just(Op::Timeout),
    ]
}

fn run(ops: &[Op]) -> (Arc<Accumulate>, Vec<Step>) {
    let handler = Arc::new(Accumulate::default());
    let mut dispatcher =
        Dispatcher::new(ConnectionId::next(), Arc::clone(&handler), &UpgradeOptions::new());
    let _ = dispatcher.start(());

    let steps = ops.iter().map(|op| dispatcher.dispatch(op.event())).collect();
    drop(dispatcher);
    (handler, steps)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn state_threads_through_every_callback(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (handler, _) = run(&ops);

        let prefix_end = ops.iter().position(Op::is_terminal).map_or(ops.len(), |i| i + 1);
        let expected: Vec<String> = ops[..prefix_end].iter().filter_map(Op::recorded).collect();

        let terminated = handler.terminated.lock();
        prop_assert_eq!(terminated.len(), 1);
        prop_assert_eq!(terminated[0].1.as_ref(), Some(&expected));
    }

    #[test]
    fn nothing_runs_after_terminate(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (handler, steps) = run(&ops);

        prop_assert_eq!(*handler.callbacks_after_terminate.lock(), 0);

        if let Some(terminal) = ops.iter().position(Op::is_terminal) {
            prop_assert!(steps[terminal].finished);
            for step in &steps[terminal + 1..] {
                prop_assert_eq!(step, &Step::default());
            }
        } else {
            prop_assert!(steps.iter().all(|step| !step.finished));
        }
    }

    #[test]
    fn every_ping_gets_one_pong(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (_, steps) = run(&ops);

        let live = ops.iter().position(Op::is_terminal).unwrap_or(ops.len());
        let pings = ops[..live].iter().filter(|op| matches!(op, Op::Ping)).count();
        let pongs: usize = steps.iter().map(Step::auto_pongs).sum();
        prop_assert_eq!(pings, pongs);
    }

    #[test]
    fn remote_close_code_is_echoed(code in 1000u16..=1003) {
        let (handler, steps) = run(&[Op::RemoteClose(code)]);

        prop_assert_eq!(steps[0].close().map(|c| c.code.as_u16()), Some(code));
        let terminated = handler.terminated.lock();
        prop_assert_eq!(&terminated[0].0, &TerminationReason::Remote(CloseCode::new(code)));
    }
}
