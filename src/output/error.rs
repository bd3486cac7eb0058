// ABOUTME: Error types for output handling operations
// ABOUTME: Covers unknown formats, serialization failures, and destination I/O

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("No formatter registered for output format '{format}'")]
    FormatterNotFound { format: String },

    #[error("Failed to render snapshot as JSON: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to render snapshot as YAML: {0}")]
    YamlSerializationError(#[from] serde_yaml::Error),

    #[error("Failed to write snapshot: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
