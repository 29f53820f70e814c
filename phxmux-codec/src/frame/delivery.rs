use super::{Frame, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAMESPACE: &str = "delivery";

pub const LOCATION_UPDATE: &str = "location_update";

/// Topic of a delivery tracker, `delivery:delivery_<id>`.
pub fn tracker(id: &str) -> String {
    super::topic(NAMESPACE, &format!("delivery_{}", id))
}

/// Position report of a courier. Coordinates are always numbers on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationUpdate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn payload(&self) -> Payload {
        json!({ "latitude": self.latitude, "longitude": self.longitude })
    }

    pub fn frame(self, topic: &str, msg_ref: &str) -> Frame {
        super::push(topic, LOCATION_UPDATE, self.payload(), msg_ref)
    }

    pub fn from_payload(payload: &Payload) -> Result<Self, crate::DecodeError> {
        super::from_payload(payload)
    }
}
