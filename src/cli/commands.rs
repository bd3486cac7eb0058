// ABOUTME: Command implementations for the insightflow CLI
// ABOUTME: Handles execution of run, validate, agents, and init commands

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::args::GraphTemplate;
use super::config::Config;
use crate::agents::AgentRegistry;
use crate::engine::{ExecutionStatus, WorkflowEngine};
use crate::graph::{ExecutionMode, GraphParser, GraphValidator, WorkflowGraph};
use crate::output::formatter::TextFormatter;
use crate::output::{OutputFormat, OutputHandler};
use crate::tasks::WorkUnitRegistry;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Option<ExecutionMode>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub poll_interval: Duration,
}

async fn load_graph(graph_path: &Path) -> Result<WorkflowGraph> {
    GraphParser::new()
        .parse_file(graph_path)
        .await
        .with_context(|| format!("Failed to parse graph {}", graph_path.display()))
}

fn build_engine(config: &Config) -> WorkflowEngine {
    WorkflowEngine::new(config.engine.clone())
        .with_agents(AgentRegistry::from_config(&config.agents))
}

/// Execute a workflow graph, printing progress until it finishes
pub async fn run_graph(graph_path: PathBuf, options: RunOptions, config: &Config) -> Result<()> {
    info!("Starting graph execution: {}", graph_path.display());

    let mut graph = load_graph(&graph_path).await?;
    if let Some(mode) = options.mode {
        graph.mode = mode;
    }
    info!(workflow_id = %graph.workflow_id, mode = %graph.mode, nodes = graph.nodes.len(), "Loaded graph");

    let engine = build_engine(config);
    let ack = engine
        .submit(graph)
        .await
        .context("Graph was rejected")?;
    let execution_id = ack.execution_id;

    let mut last_line = String::new();
    let mut stop_sent = false;

    let execution = loop {
        let execution = engine
            .status(&execution_id)
            .await
            .ok_or_else(|| anyhow!("Execution {} is no longer tracked", execution_id))?;

        let line = TextFormatter::progress_line(&execution.summary());
        if line != last_line {
            eprintln!("{}", line);
            last_line = line;
        }

        if execution.is_terminal() {
            break execution;
        }

        tokio::select! {
            _ = sleep(options.poll_interval) => {}
            signal = tokio::signal::ctrl_c(), if !stop_sent => {
                signal.context("Failed to listen for Ctrl-C")?;
                warn!(execution_id = %execution_id, "Interrupt received, requesting stop");
                let stop = engine.stop(&execution_id).await?;
                if !stop.accepted {
                    warn!(status = %stop.status, "Execution already finished");
                }
                stop_sent = true;
            }
        }
    };

    OutputHandler::new()
        .output_execution(options.format, &execution, options.output.as_deref())
        .await
        .context("Failed to write execution output")?;

    if let Some(path) = &options.output {
        info!("Results written to: {}", path.display());
    }

    info!(status = %execution.status, "Execution finished");

    match execution.status {
        ExecutionStatus::Completed => Ok(()),
        status => Err(anyhow!(
            "Execution {} finished with status: {}",
            execution.id,
            status
        )),
    }
}

/// Validate a workflow graph without executing it
pub async fn validate_graph(graph_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating graph: {}", graph_path.display());

    let graph = load_graph(&graph_path).await?;
    let agents = AgentRegistry::from_config(&config.agents).list().await;
    let work_units = WorkUnitRegistry::new();

    let report = GraphValidator::new()
        .with_agents(agents)
        .with_work_units(&work_units)
        .report(&graph);

    for warning in &report.warnings {
        println!("  ⚠ {}", warning);
    }

    if report.has_errors() {
        for error in &report.errors {
            println!("  ✗ [{}] {}", error.kind(), error);
        }
        return Err(anyhow!(
            "Graph '{}' is invalid ({} errors)",
            graph.workflow_id,
            report.errors.len()
        ));
    }

    println!("✓ Graph '{}' is valid", graph.workflow_id);
    println!("  Nodes: {}", graph.nodes.len());
    println!("  Edges: {}", graph.edges.len());
    println!("  Mode: {}", graph.mode);

    info!("Graph validation completed successfully");
    Ok(())
}

/// Print the agents the engine would assign nodes to
pub async fn list_agents(config: &Config) -> Result<()> {
    let agents = AgentRegistry::from_config(&config.agents).list().await;

    if agents.is_empty() {
        println!("No agents configured");
        return Ok(());
    }

    for agent in agents {
        println!("{} ({}) [{}]", agent.id, agent.name, agent.status);
        println!("  Role: {}", agent.role);
        println!("  Capabilities: {}", agent.capabilities.join(", "));
    }

    Ok(())
}

/// Initialize a new workflow graph file
pub async fn init_graph(name: String, output_dir: PathBuf, template: GraphTemplate) -> Result<()> {
    info!("Initializing graph '{}' in {}", name, output_dir.display());

    if !output_dir.exists() {
        tokio::fs::create_dir_all(&output_dir).await?;
    }

    let graph_file = output_dir.join(format!("{}.yaml", name));
    if graph_file.exists() {
        return Err(anyhow!("Graph file already exists: {}", graph_file.display()));
    }

    tokio::fs::write(&graph_file, graph_template(&name, template)).await?;
    println!("Created graph file: {}", graph_file.display());

    Ok(())
}

fn graph_template(name: &str, template: GraphTemplate) -> String {
    match template {
        GraphTemplate::Basic => format!(
            r#"workflow_id: {name}
description: Load, clean, analyze, and chart a dataset
mode: sequential

nodes:
  - id: load
    type: data_source
    data:
      source: sales.csv
      format: csv
      records: 1000
  - id: clean
    type: transformation
    data:
      operation: clean
      drop_ratio: 0.05
  - id: analyze
    type: analysis
    data:
      method: descriptive
  - id: chart
    type: visualization
    data:
      chart_type: bar
      title: Sales overview

edges:
  - source: load
    target: clean
  - source: clean
    target: analyze
  - source: analyze
    target: chart
"#
        ),
        GraphTemplate::Diamond => format!(
            r#"workflow_id: {name}
description: Fan out into two analyses and join at one chart
mode: parallel

nodes:
  - id: load
    type: data_source
    data:
      source: events.parquet
      format: parquet
      records: 5000
  - id: trends
    type: analysis
    data:
      method: time_series
  - id: segments
    type: analysis
    data:
      method: clustering
  - id: dashboard
    type: visualization
    data:
      chart_type: line
      title: Trends by segment

edges:
  - source: load
    target: trends
  - source: load
    target: segments
  - source: trends
    target: dashboard
  - source: segments
    target: dashboard
"#
        ),
    }
}
