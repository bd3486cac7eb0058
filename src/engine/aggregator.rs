// ABOUTME: Final result aggregation over completed node outputs
// ABOUTME: Builds execution-wide totals, mean metrics, chart lists, and human-readable insights

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::result::{Execution, NodeState, NodeStatus};
use crate::graph::NodeType;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResults {
    pub total_nodes: usize,
    pub completed_nodes: usize,
    pub duration_ms: i64,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub records_processed: u64,
    /// Mean of each metric across analysis nodes
    pub metrics: BTreeMap<String, f64>,
    pub visualizations: Vec<Value>,
    /// Distinct agents in order of first use
    pub agents_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub node_id: Option<String>,
    pub category: String,
    pub message: String,
}

impl Insight {
    fn new(node_id: Option<&str>, category: &str, message: String) -> Self {
        Self {
            node_id: node_id.map(str::to_string),
            category: category.to_string(),
            message,
        }
    }
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Aggregate completed outputs. Malformed outputs are skipped, never fatal.
    pub fn aggregate(execution: &Execution) -> (ExecutionResults, Vec<Insight>) {
        let mut results = ExecutionResults {
            total_nodes: execution.nodes.len(),
            ..Default::default()
        };
        let mut insights = Vec::new();

        let mut metric_samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut data_nodes = 0usize;

        for node in &execution.nodes {
            *results
                .nodes_by_type
                .entry(node.spec.node_type.as_str().to_string())
                .or_insert(0) += 1;

            if node.status != NodeStatus::Completed {
                continue;
            }
            results.completed_nodes += 1;

            let Some(output) = node.output.as_ref() else {
                continue;
            };

            match node.spec.node_type {
                NodeType::DataSource | NodeType::Transformation => {
                    data_nodes += 1;
                    match output.get("records").and_then(Value::as_u64) {
                        Some(records) => {
                            results.records_processed =
                                results.records_processed.saturating_add(records)
                        }
                        None => warn!(node_id = %node.id(), "Output has no numeric 'records'; skipping"),
                    }
                }
                NodeType::Analysis => Self::collect_metrics(node, output, &mut metric_samples),
                NodeType::Visualization => match output.get("chart") {
                    Some(chart) if chart.is_object() => results.visualizations.push(chart.clone()),
                    _ => warn!(node_id = %node.id(), "Output has no chart descriptor; skipping"),
                },
                NodeType::Custom(_) => {}
            }

            Self::collect_explicit_insights(node, output, &mut insights);
        }

        results.metrics = metric_samples
            .into_iter()
            .map(|(name, samples)| {
                let mean = samples.iter().sum::<f64>() / samples.len() as f64;
                (name, mean)
            })
            .collect();
        results.agents_used = Self::agents_in_first_use_order(execution);
        results.duration_ms = match (execution.start_time, execution.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            (Some(start), None) => (Utc::now() - start).num_milliseconds(),
            _ => 0,
        };

        if data_nodes > 0 {
            insights.push(Insight::new(
                None,
                "data",
                format!(
                    "Processed {} records across {} data nodes",
                    results.records_processed, data_nodes
                ),
            ));
        }
        for (name, mean) in &results.metrics {
            insights.push(Insight::new(
                None,
                "metric",
                format!("Mean {} is {:.3}", name, mean),
            ));
        }
        if !results.visualizations.is_empty() {
            insights.push(Insight::new(
                None,
                "visualization",
                format!("Generated {} visualizations", results.visualizations.len()),
            ));
        }

        debug!(
            execution_id = %execution.id,
            completed = results.completed_nodes,
            insights = insights.len(),
            "Aggregated results"
        );
        (results, insights)
    }

    fn collect_metrics(
        node: &NodeState,
        output: &Value,
        samples: &mut BTreeMap<String, Vec<f64>>,
    ) {
        let Some(metrics) = output.get("metrics").and_then(Value::as_object) else {
            warn!(node_id = %node.id(), "Analysis output has no metrics object; skipping");
            return;
        };

        for (name, value) in metrics {
            if let Some(number) = value.as_f64() {
                samples.entry(name.clone()).or_default().push(number);
            }
        }
    }

    fn collect_explicit_insights(node: &NodeState, output: &Value, insights: &mut Vec<Insight>) {
        let Some(messages) = output.get("insights").and_then(Value::as_array) else {
            return;
        };

        for message in messages.iter().filter_map(Value::as_str) {
            insights.push(Insight::new(
                Some(node.id()),
                node.spec.node_type.as_str(),
                message.to_string(),
            ));
        }
    }

    fn agents_in_first_use_order(execution: &Execution) -> Vec<String> {
        let mut started: Vec<&NodeState> = execution
            .nodes
            .iter()
            .filter(|n| n.agent_id.is_some() && n.start_time.is_some())
            .collect();
        started.sort_by_key(|n| n.start_time);

        let mut agents: Vec<String> = Vec::new();
        for node in started {
            if let Some(agent_id) = &node.agent_id {
                if !agents.contains(agent_id) {
                    agents.push(agent_id.clone());
                }
            }
        }
        agents
    }
}
