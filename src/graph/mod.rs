// ABOUTME: Graph model module for submitted workflow graphs
// ABOUTME: Exports node/edge types, graph parsing, and submission-time validation

pub mod error;
pub mod node;
pub mod validation;
pub mod workflow;

pub use error::{GraphValidationError, ParseError};
pub use node::{EdgeSpec, NodeSpec, NodeType, Position};
pub use validation::{GraphValidator, ValidationReport};
pub use workflow::{ExecutionMode, GraphParser, WorkflowGraph};
