// ABOUTME: Error types for graph parsing and validation
// ABOUTME: Defines the submission-time failures that prevent an execution from being created

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read graph file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphValidationError {
    #[error("Duplicate node id: {node_id}")]
    DuplicateNodeId { node_id: String },

    #[error("Edge '{edge_id}' references unknown node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("Cycle detected involving nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<String> },
}

impl GraphValidationError {
    /// Short machine-readable kind tag
    pub fn kind(&self) -> &'static str {
        match self {
            GraphValidationError::DuplicateNodeId { .. } => "duplicate-id",
            GraphValidationError::DanglingEdge { .. } => "dangling-edge",
            GraphValidationError::CycleDetected { .. } => "cycle-detected",
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
