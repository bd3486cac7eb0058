// ABOUTME: Simulated visualization work unit
// ABOUTME: Emits a chart descriptor built from its config and the ids of its upstream series

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::simulation::simulate;
use super::{parse_config, WorkUnit};
use crate::engine::error::Result;
use crate::engine::NodeContext;
use crate::graph::NodeSpec;

pub struct VisualizationUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Histogram,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub chart_type: Option<ChartType>,
    pub title: Option<String>,
}

#[async_trait]
impl WorkUnit for VisualizationUnit {
    fn node_type(&self) -> &'static str {
        "visualization"
    }

    fn validate_config(&self, node: &NodeSpec) -> Result<()> {
        parse_config::<VisualizationConfig>(node).map(|_| ())
    }

    async fn run(&self, ctx: NodeContext) -> Result<Value> {
        let config: VisualizationConfig = parse_config(&ctx.node)?;
        let chart_type = config.chart_type.unwrap_or(ChartType::Bar);
        let title = config
            .title
            .unwrap_or_else(|| ctx.node_id().to_string());
        let series: Vec<&str> = ctx.inputs.keys().map(String::as_str).collect();

        info!(node_id = %ctx.node_id(), ?chart_type, series = series.len(), "Rendering chart");

        simulate(&ctx).await?;

        Ok(json!({
            "chart": {
                "id": ctx.node_id(),
                "type": chart_type,
                "title": title,
                "series": series,
            },
        }))
    }
}
