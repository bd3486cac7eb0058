// ABOUTME: Main library module for the insightflow workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod agents;
pub mod cli;
pub mod engine;
pub mod graph;
pub mod output;
pub mod tasks;

// Re-export commonly used types
pub use agents::{Agent, AgentRegistry};
pub use cli::{App, Args, Config};
pub use engine::{Execution, ExecutionStatus, NodeStatus, WorkflowEngine};
pub use graph::{ExecutionMode, GraphParser, GraphValidator, NodeSpec, WorkflowGraph};
pub use output::{OutputFormat, OutputHandler};
pub use tasks::{WorkUnit, WorkUnitRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
