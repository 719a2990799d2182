use thiserror::Error;

/// Main error type for resocket
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// Connection refused, dropped or otherwise failed at the transport level
    #[error("Transport error: {0}")]
    Transport(String),

    /// Peer closed the connection
    #[error("Connection closed by server: code={code}, reason={reason}")]
    RemoteClose { code: u16, reason: String },

    /// A received frame did not match any known message shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Outbound message could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// No matching response arrived before the deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The transport rejected an outbound frame
    #[error("Send failed: {0}")]
    Send(String),

    /// The sender belongs to a connection that is no longer alive
    #[error("Sender belongs to connection #{connection_id} which is no longer alive")]
    StaleSender { connection_id: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The socket was shut down
    #[error("Socket closed")]
    Closed,
}

/// Result type for resocket operations
pub type Result<T> = std::result::Result<T, SocketError>;
