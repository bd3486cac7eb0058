// ABOUTME: Workflow graph structure and YAML/JSON parsing
// ABOUTME: Defines the submitted graph (nodes, edges, execution mode) and the file parser

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use super::error::{ParseError, Result};
use super::node::{EdgeSpec, NodeSpec};

fn default_workflow_id() -> String {
    "workflow".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default = "default_workflow_id", alias = "workflowId")]
    pub workflow_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One node in flight at a time
    #[default]
    Sequential,
    /// Every ready node of a wave runs concurrently
    Parallel,
}

impl WorkflowGraph {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            name: None,
            description: None,
            mode: ExecutionMode::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, source: &str, target: &str) -> Self {
        self.edges.push(EdgeSpec::new(source, target));
        self
    }

    /// Parse a graph from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut graph: WorkflowGraph = serde_yaml::from_str(content)?;
        graph.normalize()?;
        Ok(graph)
    }

    /// Parse a graph from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let mut graph: WorkflowGraph = serde_json::from_str(content)?;
        graph.normalize()?;
        Ok(graph)
    }

    /// Parse a graph file, choosing JSON or YAML by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_content(path.as_ref(), &content)
    }

    fn from_content(path: &Path, content: &str) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(content)
        } else {
            Self::from_yaml(content)
        }
    }

    /// Fill in derived fields: missing edge ids become `source->target`
    pub fn normalize(&mut self) -> Result<()> {
        if self.workflow_id.trim().is_empty() {
            return Err(ParseError::MissingField("workflow_id".to_string()));
        }

        for edge in &mut self.edges {
            if edge.id.trim().is_empty() {
                edge.id = EdgeSpec::default_id(&edge.source, &edge.target);
            }
        }

        Ok(())
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn get_node(&self, node_id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.get_node(node_id).is_some()
    }

    /// Distinct node types in order of first appearance
    pub fn node_types(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(|n| n.node_type.as_str().to_string())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphParser;

impl GraphParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowGraph> {
        let content = fs::read_to_string(path.as_ref()).await?;
        WorkflowGraph::from_content(path.as_ref(), &content)
    }

    pub fn parse_string(&self, content: &str) -> Result<WorkflowGraph> {
        WorkflowGraph::from_yaml(content)
    }
}

impl Default for GraphParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_graph() {
        let yaml = r#"
workflow_id: sales
mode: parallel
nodes:
  - id: load
    type: data_source
    data:
      source: sales.csv
      records: 1200
  - id: clean
    type: data_transformation
edges:
  - source: load
    target: clean
"#;

        let graph = WorkflowGraph::from_yaml(yaml).unwrap();
        assert_eq!(graph.workflow_id, "sales");
        assert_eq!(graph.mode, ExecutionMode::Parallel);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].node_type, NodeType::Transformation);
        assert_eq!(graph.nodes[0].data_u64("records"), Some(1200));
        assert_eq!(graph.edges[0].id, "load->clean");
    }

    #[test]
    fn test_parse_json_graph() {
        let json = r#"{
            "workflowId": "wf-1",
            "nodes": [{"id": "a", "type": "analysis", "data": {}, "position": {"x": 1.0, "y": 2.0}}],
            "edges": []
        }"#;

        let graph = WorkflowGraph::from_json(json).unwrap();
        assert_eq!(graph.workflow_id, "wf-1");
        assert_eq!(graph.mode, ExecutionMode::Sequential);
        assert!(graph.nodes[0].position.is_some());
    }

    #[test]
    fn test_empty_workflow_id_rejected() {
        let result = WorkflowGraph::from_yaml("workflow_id: \"\"\nnodes: []\n");
        assert!(matches!(result, Err(ParseError::MissingField(_))));
    }

    #[test]
    fn test_graph_file_operations() {
        let graph = WorkflowGraph::new("file_test")
            .with_node(NodeSpec::new("a", "data_source"))
            .with_node(NodeSpec::new("b", "analysis"))
            .with_edge("a", "b");

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(graph.to_yaml().unwrap().as_bytes())
            .unwrap();

        let loaded = WorkflowGraph::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.workflow_id, "file_test");
        assert_eq!(loaded.nodes.len(), 2);
        assert_eq!(loaded.edges, graph.edges);
        assert_eq!(loaded.node_types(), vec!["data_source", "analysis"]);
    }

    #[test]
    fn test_execution_mode_from_str() {
        assert_eq!(
            "Parallel".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Parallel
        );
        assert!("batch".parse::<ExecutionMode>().is_err());
    }
}
