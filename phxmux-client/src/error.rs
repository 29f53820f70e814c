use std::fmt;

/// Category of a client error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A frame was about to be sent but the connection is not open.
    NotConnected,
    /// The topic is not joined (neither joining), so it cannot be left or pushed to.
    NotJoined,
    /// The WebSocket handshake failed or the connection is being opened already.
    ConnectFailed,
    /// The client processor has stopped, the client handle is unusable.
    Shutdown,
}

/// Represents a connection or topic error. If `topic` is `None` it is a
/// connection error.
#[derive(Clone, Debug)]
pub struct ClientError {
    pub topic: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientError")
            .field("topic", &self.topic)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for ClientError {}

/// Shorthand for creating errors in async functions.
#[macro_export]
macro_rules! client_error {
    ($topic:expr, $kind:expr, $message:expr) => {
        ::std::result::Result::Err(anyhow::Error::new($crate::ClientError {
            topic: $topic,
            kind: $kind,
            message: ::std::string::String::from($message),
        }))
    };
}

/// Gets the kind of the error if it is a `ClientError`.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<ClientError>().map(|e| e.kind)
}
