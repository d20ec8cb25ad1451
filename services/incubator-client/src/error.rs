//! Error types for the incubator client

/// Errors that can occur when talking to the incubator controller
#[derive(Debug, thiserror::Error)]
pub enum IncubatorError {
    #[error("Not connected to incubator")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to send message: {0}")]
    SendError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for incubator client operations
pub type Result<T> = std::result::Result<T, IncubatorError>;
