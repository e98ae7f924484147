//! Host-tier error types
//!
//! File access errors carry the offending path. Core errors pass through
//! unchanged so callers can still inspect their [`ErrorKind`].
//!
//! [`ErrorKind`]: navis_core::ErrorKind

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a recording or configuration from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A text file is not valid UTF-8
    #[error("{path} is not valid UTF-8 text")]
    NotText {
        /// File that failed
        path: PathBuf,
    },

    /// The file extension does not name a known input format
    #[error("Cannot infer input format from {path}")]
    UnknownFormat {
        /// File that failed
        path: PathBuf,
    },

    /// JSON configuration could not be parsed
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The parsed configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] navis_core::ConfigError),
}

/// Errors raised while writing a stream to disk.
#[derive(Error, Debug)]
pub enum SaveError {
    /// The file could not be written
    #[error("Failed to write {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The stream cannot be represented in the output format
    #[error("Encoding error: {0}")]
    Encode(#[from] navis_core::Error),
}

/// Errors raised by the batch analysis pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Loading the recording failed
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A core operation failed
    #[error("Analysis error: {0}")]
    Core(#[from] navis_core::Error),
}

/// Result type for loaders
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for savers
pub type SaveResult<T> = Result<T, SaveError>;

/// Result type for the pipeline
pub type PipelineResult<T> = Result<T, PipelineError>;
