//! Error handling for nvrbot

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Event source error (unexpected status, malformed body)
    #[error("Event source error: {0}")]
    EventSource(String),

    /// Telegram Bot API error (ok=false response, unexpected status)
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}
