// ABOUTME: Simulated analysis work unit
// ABOUTME: Produces deterministic metrics over upstream records for the result aggregator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use super::simulation::{simulate, upstream_records};
use super::{parse_config, WorkUnit};
use crate::engine::error::Result;
use crate::engine::NodeContext;
use crate::graph::NodeSpec;

pub struct AnalysisUnit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub method: String,
    /// Fixed metrics reported verbatim instead of the computed ones
    pub metrics: Option<BTreeMap<String, f64>>,
    pub records: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: "descriptive".to_string(),
            metrics: None,
            records: None,
        }
    }
}

fn computed_metrics(records: u64) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    metrics.insert("sample_size".to_string(), records as f64);
    metrics.insert("score".to_string(), 0.75 + (records % 25) as f64 / 100.0);
    metrics
}

#[async_trait]
impl WorkUnit for AnalysisUnit {
    fn node_type(&self) -> &'static str {
        "analysis"
    }

    fn validate_config(&self, node: &NodeSpec) -> Result<()> {
        parse_config::<AnalysisConfig>(node).map(|_| ())
    }

    async fn run(&self, ctx: NodeContext) -> Result<Value> {
        let config: AnalysisConfig = parse_config(&ctx.node)?;
        let records = config.records.unwrap_or_else(|| upstream_records(&ctx));

        info!(node_id = %ctx.node_id(), method = %config.method, records, "Running analysis");

        simulate(&ctx).await?;

        let metrics = config
            .metrics
            .unwrap_or_else(|| computed_metrics(records));
        let summary = metrics
            .iter()
            .map(|(name, value)| format!("{}={:.2}", name, value))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(json!({
            "method": config.method,
            "records": records,
            "metrics": metrics,
            "insights": [format!("{} analysis over {} records: {}", config.method, records, summary)],
        }))
    }
}
