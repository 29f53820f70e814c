use crate::client_error;
use crate::error::ErrorKind;
use crate::model::{ConnectionState, ABNORMAL_CLOSURE};
use crate::transport::{Generation, OutgoingSink};
use anyhow::Result;
use log::{debug, info, warn};

/// Called when the handshake of the transport succeeded.
pub(crate) type OpenCallback = Box<dyn FnMut() + Send>;
/// Called with the close code and reason when the transport is gone.
pub(crate) type CloseCallback = Box<dyn FnMut(u16, &str) + Send>;
/// Called with the detail of a transport error.
pub(crate) type ErrorCallback = Box<dyn FnMut(&str) + Send>;
/// Called with every raw text before it is decoded.
pub(crate) type MessageCallback = Box<dyn FnMut(&str) + Send>;

/// Callbacks of the transport events. Every transport event invokes the
/// matching callbacks exactly once, in registration order.
#[derive(Default)]
pub(crate) struct LifecycleCallbacks {
    on_open: Vec<OpenCallback>,
    on_close: Vec<CloseCallback>,
    on_error: Vec<ErrorCallback>,
    on_message: Vec<MessageCallback>,
}

/// The single connection of a client. It tracks the state of the transport and
/// owns its write half.
///
/// State changes are driven by the processor which feeds the transport events
/// in, events of an earlier generation are ignored.
pub struct Connection {
    state: ConnectionState,
    generation: Generation,
    /// Write half of the transport, `Some` only in the open state.
    outgoing: Option<OutgoingSink>,
    callbacks: LifecycleCallbacks,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    pub fn new() -> Self {
        Connection {
            state: ConnectionState::Closed,
            generation: 0,
            outgoing: None,
            callbacks: LifecycleCallbacks::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open and no close has been initiated, so frames can be sent.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && self.outgoing.is_some()
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    /// Starts a new transport generation and goes to connecting.
    pub(crate) fn connecting(&mut self) -> Generation {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.outgoing = None;

        self.generation
    }

    /// The handshake of `generation` succeeded.
    pub(crate) fn opened(&mut self, generation: Generation, outgoing: OutgoingSink) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            debug!("Dropping transport of generation {}", generation);
            return false;
        }

        info!("Connection opened");

        self.state = ConnectionState::Open;
        self.outgoing = Some(outgoing);

        for cb in &mut self.callbacks.on_open {
            cb();
        }

        true
    }

    /// The handshake of `generation` failed. It is reported as an error and then
    /// as an abnormal close.
    pub(crate) fn failed(&mut self, generation: Generation, reason: &str) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            return false;
        }

        warn!("Connection failed {}", reason);

        self.error(generation, reason);
        self.transition_closed(ABNORMAL_CLOSURE, reason);

        true
    }

    /// Transmits the text as it is.
    pub fn send(&self, text: String) -> Result<()> {
        match &self.outgoing {
            Some(sink) if self.state == ConnectionState::Open => {
                if sink.send(text).is_err() {
                    return client_error!(None, ErrorKind::NotConnected, "Transport is closed");
                }

                Ok(())
            }
            _ => client_error!(None, ErrorKind::NotConnected, "Connection is not open"),
        }
    }

    /// Initiates the close of the connection and returns the state before it.
    ///
    /// An open connection drops its outgoing queue and goes to closing, the
    /// writer sends the close frame and the state goes to closed when the
    /// transport reports the close.
    /// A connecting connection abandons its handshake and goes to closed at
    /// once.
    pub(crate) fn close(&mut self) -> ConnectionState {
        let prev = self.state;

        match prev {
            ConnectionState::Open => {
                info!("Closing connection");
                self.state = ConnectionState::Closing;
                self.outgoing = None;
            }
            ConnectionState::Connecting => {
                info!("Abandoning connection attempt");
                self.generation += 1;
                self.transition_closed(1000, "closed while connecting");
            }
            ConnectionState::Closing | ConnectionState::Closed => (),
        }

        prev
    }

    /// The transport of `generation` has been closed.
    pub(crate) fn closed(&mut self, generation: Generation, code: u16, reason: &str) -> bool {
        if generation != self.generation || self.state == ConnectionState::Closed {
            debug!("Ignoring close of generation {}", generation);
            return false;
        }

        info!("Connection closed code={} reason={}", code, reason);

        self.transition_closed(code, reason);

        true
    }

    /// Transport errors are informational, they don't change the state.
    pub(crate) fn error(&mut self, generation: Generation, detail: &str) {
        if generation != self.generation {
            return;
        }

        for cb in &mut self.callbacks.on_error {
            cb(detail);
        }
    }

    /// A text arrived on the transport of `generation`. Returns `false` for
    /// texts of an earlier transport, those must not be dispatched. The peer
    /// may still send frames until it answers the close.
    pub(crate) fn message(&mut self, generation: Generation, text: &str) -> bool {
        let live = matches!(self.state, ConnectionState::Open | ConnectionState::Closing);

        if generation != self.generation || !live {
            return false;
        }

        for cb in &mut self.callbacks.on_message {
            cb(text);
        }

        true
    }

    pub(crate) fn on_open(&mut self, cb: OpenCallback) {
        self.callbacks.on_open.push(cb);
    }

    pub(crate) fn on_close(&mut self, cb: CloseCallback) {
        self.callbacks.on_close.push(cb);
    }

    pub(crate) fn on_error(&mut self, cb: ErrorCallback) {
        self.callbacks.on_error.push(cb);
    }

    pub(crate) fn on_message(&mut self, cb: MessageCallback) {
        self.callbacks.on_message.push(cb);
    }

    fn transition_closed(&mut self, code: u16, reason: &str) {
        self.state = ConnectionState::Closed;
        self.outgoing = None;

        for cb in &mut self.callbacks.on_close {
            cb(code, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_kind;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[test]
    fn send_requires_open_connection() {
        let conn = Connection::new();

        let result = conn.send("{}".to_string());

        assert_eq!(error_kind(&result.unwrap_err()), Some(ErrorKind::NotConnected));
    }

    #[test]
    fn open_send_close() {
        let mut conn = Connection::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let generation = conn.connecting();
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(conn.send("early".to_string()).is_err());

        assert!(conn.opened(generation, tx));
        assert!(conn.is_open());

        conn.send("hello".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");

        assert_eq!(conn.close(), ConnectionState::Open);
        assert_eq!(conn.state(), ConnectionState::Closing);
        assert!(!conn.is_open());
        assert!(conn.send("late".to_string()).is_err());
        assert!(rx.try_recv().is_err());

        assert_eq!(conn.close(), ConnectionState::Closing);
        assert!(conn.message(generation, "{}"));

        assert!(conn.closed(generation, 1000, ""));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut conn = Connection::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let old = conn.connecting();
        conn.close();
        let current = conn.connecting();

        assert!(!conn.opened(old, tx.clone()));
        assert!(conn.opened(current, tx));
        assert!(!conn.closed(old, 1000, ""));
        assert!(!conn.message(old, "{}"));
        assert!(conn.is_open());
    }

    #[test]
    fn callbacks_are_invoked_once_per_event_in_order() {
        let mut conn = Connection::new();
        let events = Arc::new(Mutex::new(Vec::<String>::new()));
        let (tx, _rx) = mpsc::unbounded_channel();

        let e = events.clone();
        conn.on_open(Box::new(move || e.lock().unwrap().push("open".into())));
        let e = events.clone();
        conn.on_error(Box::new(move |d: &str| e.lock().unwrap().push(format!("error {}", d))));
        let e = events.clone();
        conn.on_message(Box::new(move |m: &str| e.lock().unwrap().push(format!("message {}", m))));
        let e = events.clone();
        conn.on_close(Box::new(move |c: u16, r: &str| e.lock().unwrap().push(format!("close {} {}", c, r))));

        let generation = conn.connecting();
        conn.opened(generation, tx);
        conn.message(generation, "m1");
        conn.error(generation, "oops");
        conn.message(generation, "m2");
        conn.closed(generation, 1001, "going away");
        conn.closed(generation, 1001, "going away");

        assert_eq!(
            *events.lock().unwrap(),
            vec!["open", "message m1", "error oops", "message m2", "close 1001 going away"]
        );
    }

    #[test]
    fn failed_handshake_reports_error_and_close() {
        let mut conn = Connection::new();
        let events = Arc::new(Mutex::new(Vec::<String>::new()));

        let e = events.clone();
        conn.on_error(Box::new(move |d: &str| e.lock().unwrap().push(format!("error {}", d))));
        let e = events.clone();
        conn.on_close(Box::new(move |c: u16, _: &str| e.lock().unwrap().push(format!("close {}", c))));

        let generation = conn.connecting();
        assert!(conn.failed(generation, "refused"));

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(*events.lock().unwrap(), vec!["error refused", "close 1006"]);
    }
}
