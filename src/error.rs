//! Error types for wavescope

use thiserror::Error;

/// Errors raised by the analysis and rendering core
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("No audio tracks found")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    /// The audio source cannot be tapped yet (nothing loaded)
    #[error("Audio source unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ScopeError>;
