//! Error types for the Colloquy gateway

use thiserror::Error;

/// Result type alias for Colloquy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Colloquy gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture or playback device error
    #[error("audio error: {0}")]
    Audio(String),

    /// MP3 decode or playback failure
    #[error("playback error: {0}")]
    Playback(String),

    /// Duplex audio channel error (open timeout, unexpected close)
    #[error("channel error: {0}")]
    Channel(String),

    /// Upstream speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Recognition session lifecycle violation
    #[error("session error: {0}")]
    Session(String),

    /// Text generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// Voice synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Session log write error
    #[error("session log error: {0}")]
    SessionLog(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
