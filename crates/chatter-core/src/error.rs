use thiserror::Error;

/// Top-level error type for Chatter.
#[derive(Debug, Error)]
pub enum ChatterError {
    /// The model backend answered with a structured failure.
    #[error("{message} ({code})")]
    Backend { message: String, code: String },

    /// The model backend is absent, unreachable, or not authenticated.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Any other failure while talking to the model backend.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel (outbound send, chat action, ...).
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Missing or invalid session credentials.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
