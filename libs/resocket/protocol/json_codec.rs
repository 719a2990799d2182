use super::message::{Message, MessageType};
use crate::traits::{DecodeError, MessageCodec, Result, SocketError};
use serde_json::Value;

/// JSON codec for [`Message`]
///
/// Decoding dispatches on the `type` field. The lookup is case-insensitive,
/// everything outside the closed [`MessageType`] set is rejected.
/// Binary frames are not part of this protocol.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl MessageCodec for JsonCodec {
    fn decode_text(&self, text: &str) -> std::result::Result<Message, DecodeError> {
        let mut value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| DecodeError::Malformed("expected a JSON object".to_string()))?;

        let message_type = match object.get("type") {
            None | Some(Value::Null) => return Err(DecodeError::MissingType),
            Some(Value::String(raw)) => raw
                .parse::<MessageType>()
                .map_err(DecodeError::UnknownType)?,
            Some(other) => {
                return Err(DecodeError::Malformed(format!(
                    "non string type: {}",
                    other
                )))
            }
        };

        // Canonicalise the tag so serde sees the lowercase wire name
        object.insert(
            "type".to_string(),
            Value::String(message_type.as_str().to_string()),
        );

        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    fn encode_text(&self, message: &Message) -> Result<String> {
        serde_json::to_string(message).map_err(|e| SocketError::Encode(e.to_string()))
    }
}
