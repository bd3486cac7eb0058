// ABOUTME: Workflow execution engine module for insightflow
// ABOUTME: Handles execution state, dependency resolution, scheduling, and result aggregation

pub mod aggregator;
pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod result;
pub mod scheduler;
pub mod store;

pub use aggregator::{ExecutionResults, Insight, ResultAggregator};
pub use context::NodeContext;
pub use dependency::DependencyResolver;
pub use error::{ExecutionError, Result};
pub use executor::WorkflowEngine;
pub use result::{
    Execution, ExecutionStatus, ExecutionSummary, NodeState, NodeStatus, StopAck, SubmitAck,
};
pub use scheduler::{EngineConfig, ExecutionScheduler, RetryConfig};
pub use store::ExecutionStore;
