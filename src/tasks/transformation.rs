// ABOUTME: Simulated transformation work unit
// ABOUTME: Applies a named operation to upstream records, dropping a configurable fraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::simulation::{simulate, upstream_records};
use super::{parse_config, WorkUnit};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::NodeContext;
use crate::graph::NodeSpec;

pub struct TransformationUnit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationConfig {
    pub operation: String,
    /// Fraction of input records removed, 0.0 to 1.0
    pub drop_ratio: f64,
    /// Used instead of upstream counts when the node has no inputs
    pub records: Option<u64>,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            operation: "clean".to_string(),
            drop_ratio: 0.0,
            records: None,
        }
    }
}

#[async_trait]
impl WorkUnit for TransformationUnit {
    fn node_type(&self) -> &'static str {
        "transformation"
    }

    fn validate_config(&self, node: &NodeSpec) -> Result<()> {
        let config: TransformationConfig = parse_config(node)?;

        if !(0.0..=1.0).contains(&config.drop_ratio) {
            return Err(ExecutionError::InvalidConfiguration {
                node_id: node.id.clone(),
                reason: format!("drop_ratio {} is outside 0.0..=1.0", config.drop_ratio),
            });
        }

        Ok(())
    }

    async fn run(&self, ctx: NodeContext) -> Result<Value> {
        let config: TransformationConfig = parse_config(&ctx.node)?;

        let input_records = if ctx.inputs.is_empty() {
            config.records.unwrap_or(0)
        } else {
            upstream_records(&ctx)
        };

        info!(
            node_id = %ctx.node_id(),
            operation = %config.operation,
            input_records,
            "Transforming records"
        );

        simulate(&ctx).await?;

        let dropped = (input_records as f64 * config.drop_ratio.clamp(0.0, 1.0)).floor() as u64;
        let dropped = dropped.min(input_records);
        let records = input_records - dropped;

        Ok(json!({
            "operation": config.operation,
            "input_records": input_records,
            "records": records,
            "dropped": dropped,
        }))
    }
}
