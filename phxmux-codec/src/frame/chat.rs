use super::{Frame, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAMESPACE: &str = "chat";

pub const MESSAGE: &str = "message";

/// Topic of a chat room, `chat:room_<id>`.
pub fn room(id: &str) -> String {
    super::topic(NAMESPACE, &format!("room_{}", id))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
}

impl ChatMessage {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    pub fn payload(&self) -> Payload {
        json!({ "content": self.content })
    }

    pub fn frame(self, topic: &str, msg_ref: &str) -> Frame {
        super::push(topic, MESSAGE, self.payload(), msg_ref)
    }

    pub fn from_payload(payload: &Payload) -> Result<Self, crate::DecodeError> {
        super::from_payload(payload)
    }
}
