use thiserror::Error;

/// Top-level error type for Ponte.
#[derive(Debug, Error)]
pub enum PonteError {
    /// Error from the Telegram Bot API.
    #[error("telegram error: {0}")]
    Telegram(String),

    /// Error from the WhatsApp transport.
    #[error("whatsapp error: {0}")]
    WhatsApp(String),

    /// Storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Rejected user input (bad address, empty argument).
    #[error("{0}")]
    Validation(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
