pub mod chat;
pub mod delivery;
pub mod feed;

pub use self::{
    chat::ChatMessage,
    delivery::LocationUpdate,
    feed::{LikeUpdate, NewItem, ProductAction},
};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";

/// System topic of the socket itself, heartbeats go here.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Structured payload of a frame. Passed through as it is, the codec doesn't
/// validate its schema.
pub type Payload = Value;

/// Represents a channel frame, the unit of the wire protocol.
///
/// Frames sent by the client always have a ref, frames pushed by the server
/// (broadcasts) usually have `null` ref, that is why `msg_ref` is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default = "empty_payload")]
    pub payload: Payload,
    #[serde(rename = "ref", default, deserialize_with = "deserialize_ref")]
    pub msg_ref: Option<String>,
}

impl Frame {
    pub fn new(topic: &str, event: &str, payload: Payload, msg_ref: &str) -> Frame {
        Frame {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    /// Status of a reply frame (`{"status": "ok", "response": {...}}`).
    pub fn reply_status(&self) -> Option<&str> {
        self.payload.get("status").and_then(Value::as_str)
    }

    /// Response part of a reply frame.
    pub fn reply_response(&self) -> Option<&Value> {
        self.payload.get("response")
    }

    pub fn is_reply(&self) -> bool {
        self.event == PHX_REPLY
    }
}

/// The `{}` payload of join, leave and heartbeat frames.
pub fn empty_payload() -> Payload {
    Value::Object(Map::new())
}

pub fn join(topic: &str, msg_ref: &str) -> Frame {
    Frame::new(topic, PHX_JOIN, empty_payload(), msg_ref)
}

pub fn leave(topic: &str, msg_ref: &str) -> Frame {
    Frame::new(topic, PHX_LEAVE, empty_payload(), msg_ref)
}

pub fn heartbeat(msg_ref: &str) -> Frame {
    Frame::new(PHOENIX_TOPIC, HEARTBEAT, empty_payload(), msg_ref)
}

pub fn push(topic: &str, event: &str, payload: Payload, msg_ref: &str) -> Frame {
    Frame::new(topic, event, payload, msg_ref)
}

/// Composes a topic key from a namespace and an identifier, like `chat:room_42`.
pub fn topic(namespace: &str, id: &str) -> String {
    format!("{}:{}", namespace, id)
}

/// Splits a topic key to namespace and identifier. The identifier may contain
/// further colons, only the first one separates.
pub fn split_topic(topic: &str) -> Option<(&str, &str)> {
    match topic.split_once(':') {
        Some((ns, id)) if !ns.is_empty() && !id.is_empty() => Some((ns, id)),
        _ => None,
    }
}

/// Reads a typed payload out of a frame payload.
pub(crate) fn from_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, crate::DecodeError> {
    T::deserialize(payload).map_err(|e| crate::DecodeError { message: e.to_string() })
}

/// Refs are decimal strings, but be lenient and accept numbers, too.
fn deserialize_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("invalid ref {}", other))),
    }
}
