//! Transport implementations

pub mod tungstenite;

pub use tungstenite::TungsteniteTransport;
