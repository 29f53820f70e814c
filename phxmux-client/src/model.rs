use phxmux_codec::frame;

/// Structured payload of a frame.
pub type Payload = frame::Payload;
/// Topic key like `chat:room_42`.
pub type TopicName = String;
/// Correlation ref of an outgoing frame, a decimal string.
pub type Ref = String;

/// State of the single connection of a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    /// Close has been initiated, the transport hasn't reported it yet.
    Closing,
}

/// Join state of a topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopicState {
    Absent,
    Joining,
    Joined,
}

/// Token of a handler registration, it can be used to unregister the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerRef(pub(crate) u64);

/// Default acknowledgment event of joins.
pub const DEFAULT_JOIN_ACK_EVENT: &str = frame::PHX_REPLY;

/// Close code reported when the connection is lost without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when the close frame doesn't carry a code.
pub const NO_STATUS_RECEIVED: u16 = 1005;
