//! Application protocol: the closed set of messages and their JSON codec

pub mod json_codec;
pub mod message;

pub use json_codec::JsonCodec;
pub use message::{DataMessage, Message, MessageType};
