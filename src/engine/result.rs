// ABOUTME: Execution and node state types with their status state machines
// ABOUTME: Defines the snapshots returned to pollers and the submit/stop acknowledgements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::aggregator::{ExecutionResults, Insight};
use super::error::{ExecutionError, Result};
use crate::graph::{EdgeSpec, ExecutionMode, NodeSpec, WorkflowGraph};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeState {
    #[serde(flatten)]
    pub spec: NodeSpec,
    pub status: NodeStatus,
    pub agent_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: u8,
    pub error: Option<String>,
    pub output: Option<Value>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub name: Option<String>,
    pub mode: ExecutionMode,
    pub nodes: Vec<NodeState>,
    pub edges: Vec<EdgeSpec>,
    pub status: ExecutionStatus,
    pub stop_requested: bool,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub results: Option<ExecutionResults>,
    pub insights: Option<Vec<Insight>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub total_nodes: usize,
    pub pending_nodes: usize,
    pub running_nodes: usize,
    pub completed_nodes: usize,
    pub failed_nodes: usize,
    pub stopped_nodes: usize,
    pub progress: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitAck {
    pub execution_id: String,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopAck {
    pub execution_id: String,
    /// False when the execution had already finished
    pub accepted: bool,
    pub status: ExecutionStatus,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Stopped
        )
    }

    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Pending, NodeStatus::Failed)
                | (NodeStatus::Running, NodeStatus::Completed)
                | (NodeStatus::Running, NodeStatus::Failed)
                | (NodeStatus::Running, NodeStatus::Stopped)
        )
    }
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Stopped
        )
    }
}

impl NodeState {
    pub fn new(spec: NodeSpec) -> Self {
        Self {
            spec,
            status: NodeStatus::Pending,
            agent_id: None,
            start_time: None,
            end_time: None,
            progress: 0,
            error: None,
            output: None,
            attempts: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    fn transition(&mut self, next: NodeStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ExecutionError::InvalidTransition {
                node_id: self.spec.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_running(&mut self, agent_id: String) -> Result<()> {
        self.transition(NodeStatus::Running)?;
        self.agent_id = Some(agent_id);
        self.start_time = Some(Utc::now());
        Ok(())
    }

    /// Raise progress while running. Never lowers it; values above 100 clamp.
    pub fn update_progress(&mut self, progress: u8) -> bool {
        let progress = progress.min(100);
        if self.status != NodeStatus::Running || progress <= self.progress {
            return false;
        }
        self.progress = progress;
        true
    }

    pub fn mark_completed(&mut self, output: Value) -> Result<()> {
        self.transition(NodeStatus::Completed)?;
        self.progress = 100;
        self.output = Some(output);
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(NodeStatus::Failed)?;
        self.error = Some(error.into());
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn mark_stopped(&mut self) -> Result<()> {
        self.transition(NodeStatus::Stopped)?;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

impl Execution {
    /// Fresh pending execution for a validated graph
    pub fn from_graph(graph: WorkflowGraph) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: graph.workflow_id,
            name: graph.name,
            mode: graph.mode,
            nodes: graph.nodes.into_iter().map(NodeState::new).collect(),
            edges: graph.edges,
            status: ExecutionStatus::Pending,
            stop_requested: false,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            results: None,
            insights: None,
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.id() == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Result<&mut NodeState> {
        self.nodes
            .iter_mut()
            .find(|n| n.id() == node_id)
            .ok_or_else(|| ExecutionError::NodeNotFound {
                node_id: node_id.to_string(),
            })
    }

    pub fn completed_ids(&self) -> HashSet<String> {
        self.nodes_with_status(NodeStatus::Completed)
            .into_iter()
            .collect()
    }

    pub fn nodes_with_status(&self, status: NodeStatus) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.status == status)
            .map(|n| n.id().to_string())
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
        self.start_time = Some(Utc::now());
    }

    pub fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    pub fn summary(&self) -> ExecutionSummary {
        let count = |status: NodeStatus| self.nodes.iter().filter(|n| n.status == status).count();
        let total = self.nodes.len();

        let progress = if total > 0 {
            self.nodes.iter().map(|n| n.progress as f64).sum::<f64>() / total as f64
        } else if self.status == ExecutionStatus::Completed {
            100.0
        } else {
            0.0
        };

        ExecutionSummary {
            execution_id: self.id.clone(),
            workflow_id: self.workflow_id.clone(),
            status: self.status,
            total_nodes: total,
            pending_nodes: count(NodeStatus::Pending),
            running_nodes: count(NodeStatus::Running),
            completed_nodes: count(NodeStatus::Completed),
            failed_nodes: count(NodeStatus::Failed),
            stopped_nodes: count(NodeStatus::Stopped),
            progress,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Completed => write!(f, "completed"),
            NodeStatus::Failed => write!(f, "failed"),
            NodeStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_state_lifecycle() {
        let mut node = NodeState::new(NodeSpec::new("n1", "analysis"));
        assert_eq!(node.status, NodeStatus::Pending);
        assert!(!node.is_finished());

        node.mark_running("agent-1".to_string()).unwrap();
        assert_eq!(node.status, NodeStatus::Running);
        assert!(node.start_time.is_some());

        assert!(node.update_progress(40));
        assert!(!node.update_progress(20));
        assert_eq!(node.progress, 40);

        node.mark_completed(json!({"ok": true})).unwrap();
        assert_eq!(node.status, NodeStatus::Completed);
        assert_eq!(node.progress, 100);
        assert!(node.output.is_some());
        assert!(node.is_finished());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut node = NodeState::new(NodeSpec::new("n1", "analysis"));
        assert!(matches!(
            node.mark_completed(json!(null)),
            Err(ExecutionError::InvalidTransition { .. })
        ));
        assert!(node.mark_stopped().is_err());
        assert!(node.output.is_none());

        node.mark_failed("no agent available").unwrap();
        assert_eq!(node.status, NodeStatus::Failed);
        assert!(node.mark_running("a".to_string()).is_err());
        assert_eq!(node.status, NodeStatus::Failed);
    }

    #[test]
    fn test_progress_ignored_unless_running() {
        let mut node = NodeState::new(NodeSpec::new("n1", "analysis"));
        assert!(!node.update_progress(50));
        assert_eq!(node.progress, 0);

        node.mark_running("a".to_string()).unwrap();
        assert!(node.update_progress(250));
        assert_eq!(node.progress, 100);
    }

    #[test]
    fn test_execution_summary() {
        let graph = WorkflowGraph::new("wf")
            .with_node(NodeSpec::new("a", "data_source"))
            .with_node(NodeSpec::new("b", "analysis"));
        let mut execution = Execution::from_graph(graph);
        assert_eq!(execution.status, ExecutionStatus::Pending);

        let a = execution.node_mut("a").unwrap();
        a.mark_running("agent".to_string()).unwrap();
        a.mark_completed(json!({})).unwrap();

        let summary = execution.summary();
        assert_eq!(summary.total_nodes, 2);
        assert_eq!(summary.completed_nodes, 1);
        assert_eq!(summary.pending_nodes, 1);
        assert_eq!(summary.progress, 50.0);
        assert_eq!(execution.completed_ids().len(), 1);
        assert!(execution.node_mut("zzz").is_err());
    }
}
