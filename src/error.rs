//! Error types for AIVA

use thiserror::Error;

/// Result type alias for AIVA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a dialogue turn
///
/// Connectivity loss is deliberately absent: a failed probe is reported as
/// [`ConnectivityState::Offline`](crate::connectivity::ConnectivityState), never as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error (remote request or local decoder)
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text generation error from a single provider
    #[error("generation error: {0}")]
    Generation(String),

    /// Speech synthesis or playback error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Shutdown was requested while a stage was running
    #[error("cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
