// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides a graph builder, fast engine settings, and temp-file fixtures

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use insightflow::engine::{EngineConfig, Execution, WorkflowEngine};
use insightflow::graph::{ExecutionMode, NodeSpec, WorkflowGraph};

pub struct TestGraphBuilder {
    graph: WorkflowGraph,
}

impl TestGraphBuilder {
    pub fn new(workflow_id: &str) -> Self {
        Self {
            graph: WorkflowGraph::new(workflow_id),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.graph.mode = ExecutionMode::Parallel;
        self
    }

    pub fn node(self, id: &str, node_type: &str) -> Self {
        self.node_with(id, node_type, Value::Null)
    }

    pub fn node_with(mut self, id: &str, node_type: &str, data: Value) -> Self {
        self.graph
            .nodes
            .push(NodeSpec::new(id, node_type).with_data(data));
        self
    }

    /// Node that fails on every attempt
    pub fn failing_node(self, id: &str, node_type: &str) -> Self {
        self.node_with(id, node_type, json!({"fail_message": format!("{} exploded", id)}))
    }

    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.graph = self.graph.with_edge(source, target);
        self
    }

    pub fn build(self) -> WorkflowGraph {
        self.graph
    }

    pub fn to_yaml(&self) -> String {
        self.graph.to_yaml().expect("graph serializes")
    }

    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_yaml()).await
    }
}

/// load -> {stats, model} -> chart
pub fn diamond() -> TestGraphBuilder {
    TestGraphBuilder::new("diamond")
        .node("load", "data_source")
        .node("stats", "analysis")
        .node("model", "analysis")
        .node("chart", "visualization")
        .edge("load", "stats")
        .edge("load", "model")
        .edge("stats", "chart")
        .edge("model", "chart")
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_millis(1),
        default_steps: 2,
        ..Default::default()
    }
}

/// Slow enough that a stop request lands while nodes are running
pub fn slow_config() -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_millis(50),
        default_steps: 40,
        ..Default::default()
    }
}

pub fn fast_engine() -> WorkflowEngine {
    WorkflowEngine::new(fast_config())
}

pub fn node_error<'a>(execution: &'a Execution, node_id: &str) -> Option<&'a str> {
    execution.node(node_id).and_then(|n| n.error.as_deref())
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub async fn write_graph(&self, name: &str, builder: &TestGraphBuilder) -> PathBuf {
        let path = self.path(name);
        builder.write_to(&path).await.expect("write graph file");
        path
    }

    pub async fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        tokio::fs::write(&path, content).await.expect("write file");
        path
    }
}
