use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator carried in the `type` field of every message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Register,
    Registered,
    Ping,
    Pong,
    Data,
    Error,
    Chat,
}

impl MessageType {
    pub const ALL: [MessageType; 7] = [
        MessageType::Register,
        MessageType::Registered,
        MessageType::Ping,
        MessageType::Pong,
        MessageType::Data,
        MessageType::Error,
        MessageType::Chat,
    ];

    /// Wire name, always lowercase
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Register => "register",
            MessageType::Registered => "registered",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
            MessageType::Data => "data",
            MessageType::Error => "error",
            MessageType::Chat => "chat",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    /// Case-insensitive lookup of a wire name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        MessageType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `data` message: a correlated request or its response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMessage {
    pub id: String,
    pub message: String,
}

impl DataMessage {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Application message exchanged with the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Client → server: authenticate this connection
    Register { auth_token: String },
    /// Server → client: the connection is now a session
    Registered,
    Ping { message: String },
    Pong {
        #[serde(alias = "response")]
        message: String,
    },
    Data(DataMessage),
    Error { response: String },
    Chat { message: String, from: String },
}

impl Message {
    pub fn register(auth_token: impl Into<String>) -> Self {
        Message::Register {
            auth_token: auth_token.into(),
        }
    }

    pub fn ping(message: impl Into<String>) -> Self {
        Message::Ping {
            message: message.into(),
        }
    }

    pub fn data(id: impl Into<String>, message: impl Into<String>) -> Self {
        Message::Data(DataMessage::new(id, message))
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Register { .. } => MessageType::Register,
            Message::Registered => MessageType::Registered,
            Message::Ping { .. } => MessageType::Ping,
            Message::Pong { .. } => MessageType::Pong,
            Message::Data(_) => MessageType::Data,
            Message::Error { .. } => MessageType::Error,
            Message::Chat { .. } => MessageType::Chat,
        }
    }

    /// Get the data payload, if this is a data message
    pub fn as_data(&self) -> Option<&DataMessage> {
        match self {
            Message::Data(data) => Some(data),
            _ => None,
        }
    }
}
