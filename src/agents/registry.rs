// ABOUTME: Agent registry holding available workers and their capabilities
// ABOUTME: Resolves a node's required capability to the first matching agent by insertion order

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{capability_for, Agent, AgentStatus};
use crate::graph::NodeType;

/// Registry of agents keyed by id.
///
/// Read-mostly after bootstrap. Lookups walk agents in insertion order and
/// return the first one declaring the capability; availability is tracked
/// but not consulted.
pub struct AgentRegistry {
    agents: RwLock<IndexMap<String, Agent>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Seed the registry with the built-in roster before adding `agents`
    #[serde(default = "default_use_defaults")]
    pub use_defaults: bool,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

fn default_use_defaults() -> bool {
    true
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            use_defaults: default_use_defaults(),
            agents: Vec::new(),
        }
    }
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a registry holding the built-in agent roster
    pub fn with_defaults() -> Self {
        Self::from_agents(Agent::defaults())
    }

    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let map = agents.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            agents: RwLock::new(map),
        }
    }

    pub fn from_config(config: &AgentsConfig) -> Self {
        let mut agents = if config.use_defaults {
            Agent::defaults()
        } else {
            Vec::new()
        };
        agents.extend(config.agents.iter().cloned());
        Self::from_agents(agents)
    }

    /// Add an agent, replacing any existing agent with the same id in place
    pub async fn register(&self, agent: Agent) {
        debug!(agent_id = %agent.id, "Registering agent");
        let mut agents = self.agents.write().await;
        agents.insert(agent.id.clone(), agent);
    }

    pub async fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// First agent, by insertion order, declaring `required`
    pub async fn find_for_capability(&self, required: &str) -> Option<Agent> {
        self.agents
            .read()
            .await
            .values()
            .find(|agent| agent.has_capability(required))
            .cloned()
    }

    /// Resolve the agent for a node type through the capability table
    pub async fn find_for_node(&self, node_type: &NodeType) -> Option<Agent> {
        let capability = capability_for(node_type)?;
        let agent = self.find_for_capability(capability).await;

        debug!(
            node_type = %node_type,
            capability,
            agent = ?agent.as_ref().map(|a| a.id.as_str()),
            "Resolved agent for node type"
        );
        agent
    }

    /// Update an agent's availability; returns false for unknown ids
    pub async fn set_availability(&self, agent_id: &str, status: AgentStatus) -> bool {
        let mut agents = self.agents.write().await;
        match agents.get_mut(agent_id) {
            Some(agent) => {
                agent.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_match_by_insertion_order() {
        let registry = AgentRegistry::with_defaults();

        // Both data-scientist and ml-engineer declare model_training
        let agent = registry.find_for_node(&NodeType::Analysis).await.unwrap();
        assert_eq!(agent.id, "data-scientist");

        let agent = registry.find_for_node(&NodeType::DataSource).await.unwrap();
        assert_eq!(agent.id, "data-engineer");
    }

    #[tokio::test]
    async fn test_no_agent_for_custom_type() {
        let registry = AgentRegistry::with_defaults();
        assert!(registry
            .find_for_node(&NodeType::from("export"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_in_place() {
        let registry = AgentRegistry::with_defaults();
        let replacement = Agent::new(
            "data-engineer",
            "Replacement",
            "Only visualizes",
            &["data_visualization"],
        );
        registry.register(replacement).await;

        assert_eq!(registry.len().await, 4);
        let first = registry.list().await.into_iter().next().unwrap();
        assert_eq!(first.name, "Replacement");

        // No remaining agent extracts data
        assert!(registry.find_for_node(&NodeType::DataSource).await.is_none());
        // The replacement is now the first visualizer
        let viz = registry.find_for_node(&NodeType::Visualization).await.unwrap();
        assert_eq!(viz.id, "data-engineer");
    }

    #[tokio::test]
    async fn test_busy_agents_still_match() {
        let registry = AgentRegistry::with_defaults();
        assert!(registry.set_availability("data-engineer", AgentStatus::Busy).await);
        assert!(!registry.set_availability("ghost", AgentStatus::Busy).await);

        let agent = registry.find_for_node(&NodeType::DataSource).await.unwrap();
        assert_eq!(agent.id, "data-engineer");
        assert_eq!(agent.status, AgentStatus::Busy);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = AgentsConfig {
            use_defaults: false,
            agents: vec![Agent::new("etl", "ETL bot", "Loads data", &["data_extraction"])],
        };
        let registry = AgentRegistry::from_config(&config);

        assert_eq!(registry.len().await, 1);
        assert!(registry.find_for_node(&NodeType::Analysis).await.is_none());
        assert_eq!(
            registry.find_for_node(&NodeType::DataSource).await.unwrap().id,
            "etl"
        );

        let empty = AgentRegistry::new();
        assert!(empty.is_empty().await);
    }
}
