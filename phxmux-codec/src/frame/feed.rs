use super::{Frame, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAMESPACE: &str = "feed";

pub const VIEW_ITEM: &str = "view_item";
pub const LIKE_ITEM: &str = "like_item";
pub const SAVE_ITEM: &str = "save_item";
pub const NEW_ITEM: &str = "new_item";
pub const LIKE_UPDATE: &str = "like_update";

/// Topic of the feed of a user, `feed:user_<id>`.
pub fn user(id: &str) -> String {
    super::topic(NAMESPACE, &format!("user_{}", id))
}

/// Payload of `view_item`, `like_item` and `save_item` events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAction {
    pub product_id: String,
}

impl ProductAction {
    pub fn new(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
        }
    }

    pub fn payload(&self) -> Payload {
        json!({ "product_id": self.product_id })
    }

    /// Builds the frame of one of the feed actions, `event` should be one of the
    /// `VIEW_ITEM`, `LIKE_ITEM` or `SAVE_ITEM` events.
    pub fn frame(self, topic: &str, event: &str, msg_ref: &str) -> Frame {
        super::push(topic, event, self.payload(), msg_ref)
    }
}

/// A new item appeared in the feed, pushed by the server. The item itself is
/// opaque for the protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub item: Payload,
}

impl NewItem {
    pub fn payload(&self) -> Payload {
        json!({ "item": self.item })
    }

    pub fn from_payload(payload: &Payload) -> Result<Self, crate::DecodeError> {
        super::from_payload(payload)
    }
}

/// The like counter of a product changed, pushed by the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LikeUpdate {
    pub product_id: String,
    pub likes: u64,
}

impl LikeUpdate {
    pub fn payload(&self) -> Payload {
        json!({ "product_id": self.product_id, "likes": self.likes })
    }

    pub fn frame(self, topic: &str, msg_ref: &str) -> Frame {
        super::push(topic, LIKE_UPDATE, self.payload(), msg_ref)
    }

    pub fn from_payload(payload: &Payload) -> Result<Self, crate::DecodeError> {
        super::from_payload(payload)
    }
}
