pub mod audio;
pub mod config;
pub mod controller;
pub mod messages;
pub mod speech;
pub mod transport;
pub mod ui;

use thiserror::Error;

/// Apology shown when the chat service cannot be reached.
pub const CONNECTION_APOLOGY: &str = "Sorry, I'm having trouble connecting right now.";

/// Apology shown when the chat service reports an error of its own.
pub const RESPONSE_APOLOGY: &str = "Sorry, I'm having trouble responding right now.";

#[derive(Error, Debug, Clone)]
pub enum MurmurError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Speech recognition error: {0}")]
    Speech(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for MurmurError {
    fn from(e: reqwest::Error) -> Self {
        MurmurError::Transport(e.to_string())
    }
}

impl MurmurError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A later request may well succeed
            MurmurError::Transport(_) => true,
            MurmurError::Server(_) => true,
            MurmurError::Speech(_) => true,
            MurmurError::Playback(_) => true,
            // Hardware/model problems need the user
            MurmurError::AudioDevice(_) => false,
            MurmurError::ModelLoad(_) => false,
            MurmurError::Config(_) => false,
            MurmurError::Io(_) => false,
            MurmurError::Channel(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::Transport(_) => CONNECTION_APOLOGY.to_string(),
            MurmurError::Server(_) => RESPONSE_APOLOGY.to_string(),
            MurmurError::Speech(_) => "Speech recognition failed. Please try again.".to_string(),
            MurmurError::Playback(_) => {
                "Audio playback failed. The reply is still shown as text.".to_string()
            }
            MurmurError::AudioDevice(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            MurmurError::ModelLoad(_) => {
                "Failed to load the speech model. Please verify the model file is present."
                    .to_string()
            }
            MurmurError::Config(_) => "Configuration error. Please check settings.".to_string(),
            MurmurError::Io(_) => "File system error occurred.".to_string(),
            MurmurError::Channel(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
