use crate::frame::{Frame, Payload};
use crate::{decode_error, DecodeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Borrowed view of a frame, so encoding doesn't need to clone the payload.
#[derive(Serialize)]
struct OutgoingFrame<'a> {
    topic: &'a str,
    event: &'a str,
    payload: &'a Payload,
    #[serde(rename = "ref")]
    msg_ref: &'a str,
}

/// Encodes the four fields of a frame as a JSON text. The payload is embedded
/// as structured data.
pub fn encode(topic: &str, event: &str, payload: &Payload, msg_ref: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutgoingFrame {
        topic,
        event,
        payload,
        msg_ref,
    })
}

/// Encodes an already built frame. A frame without ref is encoded with `null` ref.
pub fn encode_frame(frame: &Frame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

/// Decodes a JSON text to a frame.
///
/// Fails if the text is not well-formed JSON, if it is not an object or if
/// `topic` or `event` is missing or empty.
pub fn decode(text: &str) -> Result<Frame, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(|e| DecodeError { message: e.to_string() })?;

    if !value.is_object() {
        return decode_error!("frame is not an object");
    }

    let frame = Frame::deserialize(value).map_err(|e| DecodeError { message: e.to_string() })?;

    if frame.topic.is_empty() {
        return decode_error!("empty topic");
    }

    if frame.event.is_empty() {
        return decode_error!("empty event");
    }

    Ok(frame)
}
