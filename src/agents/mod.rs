// ABOUTME: Agent module for capability-tagged workers that execute graph nodes
// ABOUTME: Defines agents, their availability, and the node-type to capability policy

pub mod registry;

use serde::{Deserialize, Serialize};

use crate::graph::NodeType;

pub use registry::{AgentRegistry, AgentsConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: String,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Available,
    Busy,
}

/// Capability an agent must declare to run a node of the given type.
/// Custom node types have no mapping and can never be assigned.
pub fn capability_for(node_type: &NodeType) -> Option<&'static str> {
    match node_type {
        NodeType::DataSource => Some("data_extraction"),
        NodeType::Transformation => Some("data_transformation"),
        NodeType::Analysis => Some("model_training"),
        NodeType::Visualization => Some("data_visualization"),
        NodeType::Custom(_) => None,
    }
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        capabilities: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            status: AgentStatus::Available,
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Available
    }

    /// The fixed agent roster used when no configuration overrides it
    pub fn defaults() -> Vec<Agent> {
        vec![
            Agent::new(
                "data-engineer",
                "Data Engineer",
                "Extracts and prepares datasets",
                &["data_extraction", "data_transformation", "data_cleaning"],
            ),
            Agent::new(
                "data-scientist",
                "Data Scientist",
                "Explores data and builds statistical models",
                &["statistical_analysis", "model_training", "feature_engineering"],
            ),
            Agent::new(
                "ml-engineer",
                "ML Engineer",
                "Trains and evaluates machine learning models",
                &["model_training", "model_evaluation", "hyperparameter_tuning"],
            ),
            Agent::new(
                "viz-specialist",
                "Visualization Specialist",
                "Turns results into charts and reports",
                &["data_visualization", "reporting"],
            ),
        ]
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Available => write!(f, "available"),
            AgentStatus::Busy => write!(f, "busy"),
        }
    }
}
