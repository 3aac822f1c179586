//! Error types for the emotion pipeline library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing operation failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Landmark model could not be loaded
    #[error("Landmark provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Landmark detection failed for a single frame
    #[error("Landmark provider failure: {0}")]
    ProviderFailure(String),

    /// Recorded session could not be read or is malformed
    #[error("Recording error: {0}")]
    RecordingError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline lifecycle error (worker spawn, join, state)
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
