//! Error types for Gazer

use thiserror::Error;

/// Main error type for Gazer
#[derive(Error, Debug)]
pub enum GazerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("Animation actor is gone")]
    AnimationGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to write config file: {0}")]
    WriteFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Settings listener error: {0}")]
    Listener(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Detection feed errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Detection feed receiver error: {0}")]
    FeedReceiver(String),

    #[error("Detection feed parse error: {0}")]
    FeedParse(String),
}

/// Gaze token transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind transport socket: {0}")]
    Bind(String),

    #[error("Failed to send gaze token: {0}")]
    Send(String),

    #[error("Failed to receive gaze token: {0}")]
    Receive(String),

    #[error("Malformed gaze token '{token}': {reason}")]
    MalformedToken { token: String, reason: String },
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Result type alias for Gazer operations
pub type Result<T> = std::result::Result<T, GazerError>;
