//! Audio transport error types

use thiserror::Error;

/// Errors that can occur while driving the audio transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Command queue to the audio thread is full
    #[error("Audio command queue full, command dropped")]
    CommandQueueFull,

    /// Operation requires a loaded track
    #[error("No track loaded")]
    NoTrackLoaded,
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
