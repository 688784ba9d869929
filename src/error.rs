//! Error types shared by the gateway, the chat service and the UI.

use thiserror::Error;

/// Coarse failure class used to pick a recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Connection,
    Unauthorized,
    RateLimited,
    Server,
    Unknown,
}

impl ErrorCode {
    /// Guess the class of an error that only comes with text.
    ///
    /// Rules are checked in order. The bare `"50"` rule over-matches
    /// (`"2500ms timeout"` counts as a server error); coded errors go
    /// through [`ChatError::code`] instead.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Failed to fetch") || message.contains("NetworkError") {
            ErrorCode::Connection
        } else if message.contains("401") || message.contains("Unauthorized") {
            ErrorCode::Unauthorized
        } else if message.contains("429") || message.contains("Too Many Requests") {
            ErrorCode::RateLimited
        } else if message.contains("50") {
            ErrorCode::Server
        } else {
            ErrorCode::Unknown
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to fetch: {0}")]
    Connection(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too Many Requests: {0}")]
    RateLimited(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid message: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Chat service is not running")]
    ServiceClosed,

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::Connection(_) | ChatError::ServiceClosed => ErrorCode::Connection,
            ChatError::Unauthorized(_) => ErrorCode::Unauthorized,
            ChatError::RateLimited(_) => ErrorCode::RateLimited,
            ChatError::Server { .. } | ChatError::Database(_) => ErrorCode::Server,
            ChatError::Validation(_) => ErrorCode::Unknown,
            ChatError::Other(message) => ErrorCode::from_message(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
