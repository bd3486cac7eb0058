// ABOUTME: Node and edge definitions for submitted workflow graphs
// ABOUTME: Defines node types, opaque node configuration access, and directed edges

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    DataSource,
    Transformation,
    Analysis,
    Visualization,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Canvas position from the editor; carried through but never interpreted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::DataSource => "data_source",
            NodeType::Transformation => "transformation",
            NodeType::Analysis => "analysis",
            NodeType::Visualization => "visualization",
            NodeType::Custom(tag) => tag.as_str(),
        }
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "data_source" => NodeType::DataSource,
            "transformation" | "data_transformation" => NodeType::Transformation,
            "analysis" => NodeType::Analysis,
            "visualization" => NodeType::Visualization,
            _ => NodeType::Custom(tag),
        }
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        NodeType::from(tag.to_string())
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<NodeType>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Value::Object(serde_json::Map::new()),
            position: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    pub fn data_bool(&self, key: &str) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Per-node timeout override from `data.timeout`.
    ///
    /// Accepts a humantime string (`"30s"`, `"2m 10s"`) or a number of seconds.
    pub fn timeout(&self) -> std::result::Result<Option<Duration>, String> {
        match self.data.get("timeout") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => humantime::parse_duration(text)
                .map(Some)
                .map_err(|e| format!("invalid timeout '{}': {}", text, e)),
            Some(Value::Number(secs)) => secs
                .as_f64()
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .map(Some)
                .ok_or_else(|| format!("invalid timeout '{}'", secs)),
            Some(other) => Err(format!("invalid timeout '{}'", other)),
        }
    }
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: Self::default_id(&source, &target),
            source,
            target,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn default_id(source: &str, target: &str) -> String {
        format!("{}->{}", source, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_type_parsing() {
        assert_eq!(NodeType::from("data_source"), NodeType::DataSource);
        assert_eq!(NodeType::from("data_transformation"), NodeType::Transformation);
        assert_eq!(NodeType::from("transformation"), NodeType::Transformation);
        assert_eq!(
            NodeType::from("export"),
            NodeType::Custom("export".to_string())
        );
    }

    #[test]
    fn test_node_type_serialization() {
        let node = NodeSpec::new("n1", NodeType::Analysis);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "analysis");

        let custom: NodeSpec =
            serde_json::from_value(json!({"id": "x", "type": "export"})).unwrap();
        assert_eq!(custom.node_type.as_str(), "export");
        assert!(custom.data.is_null());
    }

    #[test]
    fn test_node_timeout_override() {
        let node = NodeSpec::new("n1", "analysis").with_data(json!({"timeout": "30s"}));
        assert_eq!(node.timeout().unwrap(), Some(Duration::from_secs(30)));

        let node = NodeSpec::new("n2", "analysis").with_data(json!({"timeout": 2}));
        assert_eq!(node.timeout().unwrap(), Some(Duration::from_secs(2)));

        let node = NodeSpec::new("n3", "analysis").with_data(json!({"timeout": "soon"}));
        assert!(node.timeout().is_err());

        let node = NodeSpec::new("n4", "analysis");
        assert_eq!(node.timeout().unwrap(), None);
    }

    #[test]
    fn test_out_of_range_numeric_timeout_is_rejected() {
        let node = NodeSpec::new("huge", "analysis").with_data(json!({"timeout": 1e300}));
        assert!(node.timeout().unwrap_err().contains("invalid timeout"));

        let node = NodeSpec::new("negative", "analysis").with_data(json!({"timeout": -1.5}));
        assert!(node.timeout().is_err());
    }

    #[test]
    fn test_edge_default_id() {
        let edge = EdgeSpec::new("a", "b");
        assert_eq!(edge.id, "a->b");
        assert_eq!(edge.with_id("e1").id, "e1");
    }
}
