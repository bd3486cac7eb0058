// ABOUTME: Simulated data source work unit
// ABOUTME: Emits a deterministic dataset descriptor (source, record count, columns) for downstream nodes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::simulation::simulate;
use super::{parse_config, WorkUnit};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::NodeContext;
use crate::graph::NodeSpec;

pub struct DataSourceUnit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub source: String,
    pub format: String,
    pub records: u64,
    pub columns: Vec<String>,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            source: "synthetic".to_string(),
            format: "csv".to_string(),
            records: 1000,
            columns: vec!["id".to_string(), "value".to_string()],
        }
    }
}

#[async_trait]
impl WorkUnit for DataSourceUnit {
    fn node_type(&self) -> &'static str {
        "data_source"
    }

    fn validate_config(&self, node: &NodeSpec) -> Result<()> {
        let config: DataSourceConfig = parse_config(node)?;

        if config.source.trim().is_empty() {
            return Err(ExecutionError::InvalidConfiguration {
                node_id: node.id.clone(),
                reason: "source must not be empty".to_string(),
            });
        }

        Ok(())
    }

    async fn run(&self, ctx: NodeContext) -> Result<Value> {
        let config: DataSourceConfig = parse_config(&ctx.node)?;
        info!(
            node_id = %ctx.node_id(),
            source = %config.source,
            records = config.records,
            "Loading data source"
        );

        simulate(&ctx).await?;

        Ok(json!({
            "source": config.source,
            "format": config.format,
            "records": config.records,
            "columns": config.columns,
            "insights": [format!("Loaded {} records from {}", config.records, config.source)],
        }))
    }
}
