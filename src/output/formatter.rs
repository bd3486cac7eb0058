// ABOUTME: Output formatters for execution snapshots (JSON, YAML, text)
// ABOUTME: Handles serialization and presentation of node states, results, and insights

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{self, Value as JsonValue};

use super::error::Result;
use crate::engine::{Execution, ExecutionSummary, NodeState, NodeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default = "default_true")]
    pub include_outputs: bool,
    #[serde(default = "default_true")]
    pub include_timestamps: bool,
    #[serde(default)]
    pub max_output_length: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            include_outputs: true,
            include_timestamps: true,
            max_output_length: None,
        }
    }
}

pub trait OutputFormatter: Send + Sync {
    fn format_execution(&self, execution: &Execution, options: &OutputOptions) -> Result<String>;

    fn format_summaries(&self, summaries: &[ExecutionSummary]) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter;

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render(&self, value: &JsonValue) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Snapshot as a JSON document, honoring the output options
    pub fn prepare_execution_output(
        execution: &Execution,
        options: &OutputOptions,
    ) -> Result<JsonValue> {
        let mut output = serde_json::Map::new();

        output.insert("execution_id".to_string(), JsonValue::from(execution.id.as_str()));
        output.insert(
            "workflow_id".to_string(),
            JsonValue::from(execution.workflow_id.as_str()),
        );
        output.insert("mode".to_string(), serde_json::to_value(execution.mode)?);
        output.insert("status".to_string(), serde_json::to_value(execution.status)?);
        output.insert(
            "stop_requested".to_string(),
            JsonValue::Bool(execution.stop_requested),
        );

        if options.include_timestamps {
            output.insert("created_at".to_string(), serde_json::to_value(execution.created_at)?);
            output.insert("start_time".to_string(), serde_json::to_value(execution.start_time)?);
            output.insert("end_time".to_string(), serde_json::to_value(execution.end_time)?);
        }
        if let Some(duration) = execution.duration_ms() {
            output.insert("duration_ms".to_string(), JsonValue::from(duration));
        }

        output.insert("summary".to_string(), serde_json::to_value(execution.summary())?);

        let nodes = execution
            .nodes
            .iter()
            .map(|node| Self::prepare_node_output(node, options))
            .collect::<Result<Vec<_>>>()?;
        output.insert("nodes".to_string(), JsonValue::Array(nodes));

        if let Some(ref results) = execution.results {
            output.insert("results".to_string(), serde_json::to_value(results)?);
        }
        if let Some(ref insights) = execution.insights {
            output.insert("insights".to_string(), serde_json::to_value(insights)?);
        }

        Ok(JsonValue::Object(output))
    }

    fn prepare_node_output(node: &NodeState, options: &OutputOptions) -> Result<JsonValue> {
        let mut output = serde_json::Map::new();

        output.insert("id".to_string(), JsonValue::from(node.id()));
        output.insert("type".to_string(), JsonValue::from(node.spec.node_type.as_str()));
        output.insert("status".to_string(), serde_json::to_value(node.status)?);
        output.insert("progress".to_string(), JsonValue::from(node.progress));
        output.insert("attempts".to_string(), JsonValue::from(node.attempts));
        output.insert("agent_id".to_string(), serde_json::to_value(&node.agent_id)?);

        if options.include_timestamps {
            output.insert("start_time".to_string(), serde_json::to_value(node.start_time)?);
            output.insert("end_time".to_string(), serde_json::to_value(node.end_time)?);
        }
        if let Some(ref error) = node.error {
            output.insert("error".to_string(), JsonValue::from(error.as_str()));
        }
        if options.include_outputs {
            if let Some(ref node_output) = node.output {
                output.insert("output".to_string(), node_output.clone());
            }
        }

        Ok(JsonValue::Object(output))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_execution(&self, execution: &Execution, options: &OutputOptions) -> Result<String> {
        let value = Self::prepare_execution_output(execution, options)?;
        self.render(&value)
    }

    fn format_summaries(&self, summaries: &[ExecutionSummary]) -> Result<String> {
        let value = serde_json::to_value(summaries)?;
        self.render(&value)
    }
}

impl Default for YamlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for YamlFormatter {
    fn format_execution(&self, execution: &Execution, options: &OutputOptions) -> Result<String> {
        let value = JsonFormatter::prepare_execution_output(execution, options)?;
        Ok(serde_yaml::to_string(&value)?)
    }

    fn format_summaries(&self, summaries: &[ExecutionSummary]) -> Result<String> {
        Ok(serde_yaml::to_string(summaries)?)
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn status_icon(status: NodeStatus) -> &'static str {
        match status {
            NodeStatus::Completed => "✓",
            NodeStatus::Failed => "✗",
            NodeStatus::Stopped => "⊘",
            NodeStatus::Pending => "⧖",
            NodeStatus::Running => "⟳",
        }
    }

    /// One-line progress report used while polling a running execution
    pub fn progress_line(summary: &ExecutionSummary) -> String {
        format!(
            "[{}] {}/{} completed, {} running, {} failed ({:.1}%)",
            summary.status,
            summary.completed_nodes,
            summary.total_nodes,
            summary.running_nodes,
            summary.failed_nodes,
            summary.progress
        )
    }

    fn format_node(node: &NodeState, options: &OutputOptions) -> String {
        let mut output = format!(
            "{} {} ({})",
            Self::status_icon(node.status),
            node.id(),
            node.spec.node_type
        );

        if let Some(ref agent_id) = node.agent_id {
            output.push_str(&format!(" [{}]", agent_id));
        }
        output.push_str(&format!(" {}%", node.progress));
        if let Some(duration) = node.duration_ms() {
            output.push_str(&format!(" [{:.2}s]", duration as f64 / 1000.0));
        }
        if node.attempts > 1 {
            output.push_str(&format!(" (attempts: {})", node.attempts));
        }

        if let Some(ref error) = node.error {
            output.push_str(&format!("\n    Error: {}", error));
        }

        if options.include_outputs {
            if let Some(ref node_output) = node.output {
                let text = node_output.to_string();
                let display = match options.max_output_length {
                    Some(max) if text.chars().count() > max => {
                        format!("{}... [truncated]", text.chars().take(max).collect::<String>())
                    }
                    _ => text,
                };
                output.push_str(&format!("\n    Output: {}", display));
            }
        }

        output
    }
}

impl OutputFormatter for TextFormatter {
    fn format_execution(&self, execution: &Execution, options: &OutputOptions) -> Result<String> {
        let mut output = String::new();
        let summary = execution.summary();

        output.push_str(&format!("Execution: {}\n", execution.id));
        output.push_str(&format!(
            "Workflow: {} ({})\n",
            execution.workflow_id, execution.mode
        ));
        output.push_str(&format!("Status: {}\n", execution.status));

        if options.include_timestamps {
            if let Some(start) = execution.start_time {
                output.push_str(&format!(
                    "Started: {}\n",
                    start.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            if let Some(end) = execution.end_time {
                output.push_str(&format!(
                    "Finished: {}\n",
                    end.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
        }
        if let Some(duration) = execution.duration_ms() {
            output.push_str(&format!("Duration: {:.2}s\n", duration as f64 / 1000.0));
        }

        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Total nodes: {}\n", summary.total_nodes));
        output.push_str(&format!("  Completed: {}\n", summary.completed_nodes));
        output.push_str(&format!("  Failed: {}\n", summary.failed_nodes));
        output.push_str(&format!("  Stopped: {}\n", summary.stopped_nodes));
        output.push_str(&format!("  Pending: {}\n", summary.pending_nodes));
        output.push_str(&format!("  Progress: {:.1}%\n", summary.progress));

        if !execution.nodes.is_empty() {
            output.push_str("\nNodes:\n");
            for node in &execution.nodes {
                for line in Self::format_node(node, options).lines() {
                    output.push_str(&format!("  {}\n", line));
                }
            }
        }

        if let Some(ref results) = execution.results {
            output.push_str("\nResults:\n");
            output.push_str(&format!(
                "  Records processed: {}\n",
                results.records_processed
            ));
            if !results.metrics.is_empty() {
                output.push_str("  Metrics:\n");
                for (name, value) in &results.metrics {
                    output.push_str(&format!("    {}: {:.3}\n", name, value));
                }
            }
            output.push_str(&format!(
                "  Visualizations: {}\n",
                results.visualizations.len()
            ));
            if !results.agents_used.is_empty() {
                output.push_str(&format!("  Agents: {}\n", results.agents_used.join(", ")));
            }
        }

        if let Some(ref insights) = execution.insights {
            if !insights.is_empty() {
                output.push_str("\nInsights:\n");
                for insight in insights {
                    output.push_str(&format!("  - [{}] {}\n", insight.category, insight.message));
                }
            }
        }

        Ok(output)
    }

    fn format_summaries(&self, summaries: &[ExecutionSummary]) -> Result<String> {
        let mut output = String::new();
        for summary in summaries {
            output.push_str(&format!(
                "{}  {}  {}\n",
                summary.execution_id,
                summary.workflow_id,
                Self::progress_line(summary)
            ));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionStatus, ResultAggregator};
    use crate::graph::{NodeSpec, WorkflowGraph};
    use serde_json::json;

    fn finished_execution() -> Execution {
        let mut execution = Execution::from_graph(
            WorkflowGraph::new("sales")
                .with_node(NodeSpec::new("load", "data_source"))
                .with_node(NodeSpec::new("stats", "analysis"))
                .with_edge("load", "stats"),
        );
        execution.mark_running();

        let load = execution.node_mut("load").unwrap();
        load.mark_running("data-engineer".to_string()).unwrap();
        load.mark_completed(json!({"records": 10, "blob": "x".repeat(200)}))
            .unwrap();
        execution
            .node_mut("stats")
            .unwrap()
            .mark_failed("simulated failure in node stats")
            .unwrap();

        execution.finish(ExecutionStatus::Failed);
        let (results, insights) = ResultAggregator::aggregate(&execution);
        execution.results = Some(results);
        execution.insights = Some(insights);
        execution
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter::new()
            .format_execution(&finished_execution(), &OutputOptions::default())
            .unwrap();

        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["workflow_id"], "sales");
        assert_eq!(parsed["status"], "failed");
        assert_eq!(parsed["nodes"][0]["output"]["records"], 10);
        assert_eq!(parsed["nodes"][1]["error"], "simulated failure in node stats");
        assert_eq!(parsed["summary"]["failed_nodes"], 1);
    }

    #[test]
    fn test_json_without_outputs() {
        let options = OutputOptions {
            include_outputs: false,
            include_timestamps: false,
            ..Default::default()
        };
        let output = JsonFormatter::new_pretty()
            .format_execution(&finished_execution(), &options)
            .unwrap();

        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert!(parsed["nodes"][0].get("output").is_none());
        assert!(parsed.get("start_time").is_none());
    }

    #[test]
    fn test_yaml_formatter() {
        let output = YamlFormatter::new()
            .format_execution(&finished_execution(), &OutputOptions::default())
            .unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert!(parsed.get("execution_id").is_some());
        assert!(parsed.get("status").is_some());
    }

    #[test]
    fn test_text_formatter() {
        let options = OutputOptions {
            max_output_length: Some(20),
            ..Default::default()
        };
        let output = TextFormatter::new()
            .format_execution(&finished_execution(), &options)
            .unwrap();

        assert!(output.contains("Workflow: sales (sequential)"));
        assert!(output.contains("Status: failed"));
        assert!(output.contains("✓ load (data_source) [data-engineer] 100%"));
        assert!(output.contains("✗ stats (analysis)"));
        assert!(output.contains("Error: simulated failure in node stats"));
        assert!(output.contains("[truncated]"));
        assert!(output.contains("Records processed: 10"));
    }

    #[test]
    fn test_progress_line() {
        let summary = finished_execution().summary();
        assert_eq!(
            TextFormatter::progress_line(&summary),
            "[failed] 1/2 completed, 0 running, 1 failed (50.0%)"
        );
    }
}
