// ABOUTME: Error types for the workflow execution engine
// ABOUTME: Covers store lookups, node state transitions, work unit failures, and cancellation

use std::time::Duration;
use thiserror::Error;

use super::result::NodeStatus;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Execution not found: {execution_id}")]
    ExecutionNotFound { execution_id: String },

    #[error("Execution already exists: {execution_id}")]
    DuplicateExecution { execution_id: String },

    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: String },

    #[error("Invalid transition for node {node_id}: {from} -> {to}")]
    InvalidTransition {
        node_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },

    #[error("No agent available for node {node_id} (type: {node_type})")]
    NoAgentAvailable { node_id: String, node_type: String },

    #[error("no work unit registered for node type {node_type}")]
    WorkUnitNotFound { node_type: String },

    #[error("{message}")]
    WorkUnitFailure { node_id: String, message: String },

    #[error("Node {node_id} timed out after {timeout:?}")]
    Timeout { node_id: String, timeout: Duration },

    #[error("Execution stopped")]
    Stopped,

    #[error("Invalid configuration for node {node_id}: {reason}")]
    InvalidConfiguration { node_id: String, reason: String },

    #[error("Graph validation failed: {0}")]
    Graph(#[from] crate::graph::GraphValidationError),

    #[error("Graph parse error: {0}")]
    Parse(#[from] crate::graph::ParseError),

    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ExecutionError {
    /// Whether a bounded retry may run the node again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::WorkUnitFailure { .. } | ExecutionError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
