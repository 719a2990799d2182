use crate::protocol::Message;
use crate::traits::error::{Result, SocketError};
use crate::traits::frame::Frame;
use thiserror::Error;

/// Why a received frame could not be turned into a [`Message`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no \"type\" field in message")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("binary frames are not supported by this codec")]
    BinaryUnsupported,
}

impl From<DecodeError> for SocketError {
    fn from(e: DecodeError) -> Self {
        SocketError::Decode(e.to_string())
    }
}

/// Trait for turning application messages into frames and back
///
/// Implement this trait to plug a different wire format into the socket.
/// Outbound messages are written as text unless [`MessageCodec::is_binary`]
/// says otherwise.
pub trait MessageCodec: Send + Sync + 'static {
    /// Decode a text frame
    fn decode_text(&self, text: &str) -> std::result::Result<Message, DecodeError>;

    /// Decode a binary frame
    fn decode_binary(&self, _data: &[u8]) -> std::result::Result<Message, DecodeError> {
        Err(DecodeError::BinaryUnsupported)
    }

    /// Encode a message as text (called when `is_binary` is false)
    fn encode_text(&self, message: &Message) -> Result<String>;

    /// Encode a message as binary (called when `is_binary` is true)
    fn encode_binary(&self, _message: &Message) -> Result<Vec<u8>> {
        Err(SocketError::Encode(
            "binary encoding is not supported by this codec".to_string(),
        ))
    }

    /// Whether a message should go out as a binary frame
    fn is_binary(&self, _message: &Message) -> bool {
        false
    }

    /// Encode a message into the frame kind chosen by `is_binary`
    fn encode(&self, message: &Message) -> Result<Frame> {
        if self.is_binary(message) {
            self.encode_binary(message).map(Frame::Binary)
        } else {
            self.encode_text(message).map(Frame::Text)
        }
    }

    /// Decode any frame
    fn decode(&self, frame: &Frame) -> std::result::Result<Message, DecodeError> {
        match frame {
            Frame::Text(text) => self.decode_text(text),
            Frame::Binary(data) => self.decode_binary(data),
        }
    }
}
