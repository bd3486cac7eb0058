// ABOUTME: Work unit implementations for each node type
// ABOUTME: Contains the WorkUnit trait, its registry, and the simulated data/transform/analysis/visualization units

pub mod analysis;
pub mod data_source;
pub mod simulation;
pub mod transformation;
pub mod visualization;

use crate::engine::error::{ExecutionError, Result};
use crate::engine::NodeContext;
use crate::graph::NodeSpec;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

#[async_trait]
pub trait WorkUnit: Send + Sync {
    /// Node type tag this unit serves
    fn node_type(&self) -> &'static str;

    fn validate_config(&self, node: &NodeSpec) -> Result<()>;

    /// Perform the node's work, reporting progress through `ctx`
    async fn run(&self, ctx: NodeContext) -> Result<Value>;
}

pub struct WorkUnitRegistry {
    units: HashMap<String, Box<dyn WorkUnit>>,
}

impl WorkUnitRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Box::new(data_source::DataSourceUnit));
        registry.register(Box::new(transformation::TransformationUnit));
        registry.register(Box::new(analysis::AnalysisUnit));
        registry.register(Box::new(visualization::VisualizationUnit));

        registry
    }

    pub fn empty() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    pub fn register(&mut self, unit: Box<dyn WorkUnit>) {
        let node_type = unit.node_type().to_string();
        self.units.insert(node_type, unit);
    }

    pub fn get(&self, node_type: &str) -> Option<&dyn WorkUnit> {
        self.units.get(node_type).map(|unit| unit.as_ref())
    }

    pub fn validate_config(&self, node: &NodeSpec) -> Result<()> {
        match self.get(node.node_type.as_str()) {
            Some(unit) => unit.validate_config(node),
            None => Err(ExecutionError::WorkUnitNotFound {
                node_type: node.node_type.to_string(),
            }),
        }
    }

    /// Registered node type tags, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.units.keys().map(|k| k.as_str()).collect();
        types.sort_unstable();
        types
    }
}

impl Default for WorkUnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize a node's `data` into a unit's config; absent data yields the defaults
pub(crate) fn parse_config<T>(node: &NodeSpec) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if node.data.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(node.data.clone()).map_err(|e| ExecutionError::InvalidConfiguration {
        node_id: node.id.clone(),
        reason: e.to_string(),
    })
}
