//! Resocket chat client - Main Library
//!
//! This crate wires the `resocket` library into a runnable chat client.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **config**: YAML configuration with environment overrides
//! - **logging**: Tracing subscriber setup
//! - **shutdown**: Ctrl+C handling and interruptible sleeps
//! - **resocket**: WebSocket session library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use resocket_chat::bin_common::{load_config_from_env, ConfigType};
//! use resocket_chat::config::ChatConfig;
//! ```

// Re-export workspace libraries for convenience
pub use resocket;

pub mod config;
pub mod logging;
pub mod shutdown;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{config_type_from_args, load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
