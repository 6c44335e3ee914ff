//! Common error types for captio.

use std::path::PathBuf;

use captio_transformers::decoder::DecoderStage;
use thiserror::Error;

/// Errors that can occur when captioning images or reading a caption corpus.
#[derive(Debug, Error)]
pub enum CaptionError {
    /// A construction parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tensor's shape disagrees with the shape a stage requires.
    #[error("Shape mismatch at {stage}: expected {expected}, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: String,
        actual: String,
    },

    /// A corpus path does not exist.
    #[error("Missing {what}: '{}' does not exist", .path.display())]
    MissingData { what: &'static str, path: PathBuf },

    /// Dataset index past the end.
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The vision encoder failed.
    #[error("Encoder failed: {0}")]
    Encoder(#[source] anyhow::Error),

    /// The caption decoder failed or broke its contract.
    #[error("Decoder failed: {0}")]
    Decoder(#[source] anyhow::Error),

    /// The decoder does not report a stage the model needs to observe.
    #[error("Decoder does not expose observation point '{0}'")]
    MissingObservationPoint(DecoderStage),

    /// The annotation index could not be parsed.
    #[error("Failed to parse annotations '{}': {source}", .path.display())]
    Annotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An image file could not be decoded.
    #[error("Failed to decode image '{}': {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A TOML configuration file could not be parsed.
    #[error("Failed to parse config '{}': {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl CaptionError {
    pub(crate) fn shape(
        stage: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        CaptionError::ShapeMismatch {
            stage,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type for captio operations.
pub type CaptionResult<T> = Result<T, CaptionError>;

/// Formats a shape slice as `AxBxC`.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("x")
}
