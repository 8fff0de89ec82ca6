//! Error types for chatwheel.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The server could not be reached, timed out, or the stream broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The server reported an error inside the stream.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or persisted data.
    #[error("config error: {0}")]
    Config(String),

    /// A generation is already streaming in this conversation.
    #[error("a response is already being generated")]
    SessionActive,

    /// No model has been selected.
    #[error("no model selected")]
    NoModel,

    /// The message to send was empty.
    #[error("message is empty")]
    EmptyMessage,

    /// A background thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ChatError>;
