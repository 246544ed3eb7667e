pub mod chat;
pub mod integration;
pub mod messages;
pub mod presence;
pub mod session;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Capability unavailable: {0}")]
    Capability(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Protocol(e.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ChatError::Connection(e.to_string())
        } else if e.is_decode() {
            ChatError::Protocol(e.to_string())
        } else {
            ChatError::Http(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChatError::Connection(e.to_string())
    }
}

impl ChatError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Backend may come back
            ChatError::Connection(_) => true,
            ChatError::Http(_) => true,
            // A bad payload will not fix itself on retry
            ChatError::Protocol(_) => false,
            // Missing camera or recognizer lasts for the session
            ChatError::Capability(_) => false,
            ChatError::Channel(_) => false,
            ChatError::Config(_) => false,
            ChatError::Io(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
