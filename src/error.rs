use thiserror::Error;

/// Receiver errors using thiserror for structured error handling.
///
/// None of these ever escape `PlayerManager::handle_event`; they describe
/// failures at the backend and configuration seams so the host can log them
/// with context.

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No audio file found for sound key: {key}")]
    NotFound { key: String },

    #[error("Sound key cannot be mapped to a file name: {0:?}")]
    InvalidKey(String),

    #[error("Failed to load audio file: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode audio for {key}")]
    DecodeFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to initialize audio output")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Audio playback failed for {key}")]
    PlaybackFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Player for {0} was already unloaded")]
    Unloaded(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
