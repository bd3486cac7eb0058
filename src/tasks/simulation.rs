// ABOUTME: Shared helpers for the simulated work units
// ABOUTME: Paces progress ticks, injects configured failures, and reads upstream record counts

use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use super::parse_config;
use crate::engine::error::{ExecutionError, Result};
use crate::engine::NodeContext;

/// Failure injection read from any node's `data`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub fail: bool,
    pub fail_message: Option<String>,
    /// Fail only the first N attempts, then succeed
    pub fail_attempts: Option<u32>,
}

impl FailureConfig {
    pub fn should_fail(&self, attempt: u32) -> bool {
        match self.fail_attempts {
            Some(limit) => attempt <= limit,
            None => self.fail || self.fail_message.is_some(),
        }
    }
}

/// Emit `ctx.steps()` evenly spaced progress reports, then apply failure injection
pub async fn simulate(ctx: &NodeContext) -> Result<()> {
    let failure: FailureConfig = parse_config(&ctx.node)?;
    let steps = ctx.steps();

    for step in 1..=steps {
        sleep(ctx.tick_interval()).await;
        let progress = (u64::from(step) * 100 / u64::from(steps)) as u8;
        ctx.report_progress(progress).await?;
    }

    if failure.should_fail(ctx.attempt) {
        let message = failure
            .fail_message
            .unwrap_or_else(|| format!("simulated failure in node {}", ctx.node_id()));
        debug!(node_id = %ctx.node_id(), attempt = ctx.attempt, "Injecting failure");
        return Err(ExecutionError::WorkUnitFailure {
            node_id: ctx.node_id().to_string(),
            message,
        });
    }

    Ok(())
}

/// Sum of `records` across predecessor outputs
pub fn upstream_records(ctx: &NodeContext) -> u64 {
    ctx.inputs
        .values()
        .filter_map(|output| output.get("records").and_then(Value::as_u64))
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
pub(crate) async fn test_context(
    node: crate::graph::NodeSpec,
    inputs: indexmap::IndexMap<String, Value>,
) -> NodeContext {
    use crate::engine::{Execution, ExecutionStore};
    use crate::graph::WorkflowGraph;
    use std::sync::Arc;
    use std::time::Duration;

    let store = Arc::new(ExecutionStore::new());
    let execution = Execution::from_graph(WorkflowGraph::new("test").with_node(node.clone()));
    let execution_id = execution.id.clone();
    store.create(execution).await.unwrap();
    store
        .update_node(&execution_id, &node.id, |n| n.mark_running("agent".to_string()))
        .await
        .unwrap();

    NodeContext::new(execution_id, node, "agent", store)
        .with_inputs(inputs)
        .with_ticks(Duration::ZERO, 2)
}
