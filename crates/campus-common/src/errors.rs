use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures raised by the presence transport.
///
/// None of these reach the UI as hard errors: the synchronizer reports
/// `presence_connected = false`, logs the cause and forwards the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}
