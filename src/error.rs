use thiserror::Error;

/// Main error type for FinBot
#[derive(Error, Debug)]
pub enum FinbotError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion backend errors (network, HTTP status, malformed body)
    #[error("Completion error: {0}")]
    Completion(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using FinbotError
pub type Result<T> = std::result::Result<T, FinbotError>;
