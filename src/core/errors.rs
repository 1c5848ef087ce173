use thiserror::Error;

#[derive(Error, Debug)]
pub enum OkxWsError {
    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("{0} deadline exceeded")]
    Timeout(&'static str),

    #[error("websocket not connected")]
    NotConnected,

    #[error("malformed frame: {0}")]
    Protocol(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),

    #[error("operation cancelled: {0}")]
    Cancelled(&'static str),
}

impl OkxWsError {
    /// Whether this error is the result of cooperative cancellation rather
    /// than a transport or protocol failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
