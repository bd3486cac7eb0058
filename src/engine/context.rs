// ABOUTME: Per-node runtime context handed to work units
// ABOUTME: Carries predecessor outputs and the progress reporter that observes stop requests

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use super::error::{ExecutionError, Result};
use super::store::ExecutionStore;
use crate::graph::NodeSpec;

/// Everything a work unit sees while running one node.
#[derive(Clone)]
pub struct NodeContext {
    pub execution_id: String,
    pub node: NodeSpec,
    pub agent_id: String,
    /// Outputs of completed predecessors keyed by node id, in submission order
    pub inputs: IndexMap<String, Value>,
    pub attempt: u32,
    tick_interval: Duration,
    default_steps: u32,
    store: Arc<ExecutionStore>,
}

impl NodeContext {
    pub fn new(
        execution_id: impl Into<String>,
        node: NodeSpec,
        agent_id: impl Into<String>,
        store: Arc<ExecutionStore>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node,
            agent_id: agent_id.into(),
            inputs: IndexMap::new(),
            attempt: 1,
            tick_interval: Duration::from_millis(100),
            default_steps: 5,
            store,
        }
    }

    pub fn with_inputs(mut self, inputs: IndexMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_ticks(mut self, tick_interval: Duration, default_steps: u32) -> Self {
        self.tick_interval = tick_interval;
        self.default_steps = default_steps;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    pub fn input(&self, node_id: &str) -> Option<&Value> {
        self.inputs.get(node_id)
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of progress ticks: `data.steps`, else the engine default. Never zero.
    pub fn steps(&self) -> u32 {
        self.node
            .data_u64("steps")
            .map(|s| s.min(u32::MAX as u64) as u32)
            .unwrap_or(self.default_steps)
            .max(1)
    }

    /// Record progress for this node.
    ///
    /// Returns `ExecutionError::Stopped` once a stop has been requested, so
    /// work units can bail out with `?`.
    pub async fn report_progress(&self, progress: u8) -> Result<()> {
        if self.is_stop_requested().await {
            return Err(ExecutionError::Stopped);
        }

        let raised = self
            .store
            .update_node(&self.execution_id, &self.node.id, |node| {
                Ok(node.update_progress(progress))
            })
            .await?;

        trace!(node_id = %self.node.id, progress, raised, "Progress reported");

        if self.is_stop_requested().await {
            return Err(ExecutionError::Stopped);
        }
        Ok(())
    }

    pub async fn is_stop_requested(&self) -> bool {
        self.store.is_stop_requested(&self.execution_id).await
    }
}
