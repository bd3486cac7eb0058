// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and the run, validate, agents, and init subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::graph::ExecutionMode;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "insightflow")]
#[command(about = "Execute data-analysis workflow graphs with capability-matched agents")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow graph and report its progress
    Run {
        #[arg(help = "Path to workflow graph (YAML or JSON)")]
        graph: PathBuf,

        #[arg(long, help = "Override the graph's execution mode (sequential or parallel)")]
        mode: Option<ExecutionMode>,

        #[arg(short, long, help = "Write the final snapshot to this file")]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, help = "Snapshot format")]
        format: OutputFormat,

        #[arg(
            long,
            value_parser = humantime::parse_duration,
            default_value = "200ms",
            help = "How often to poll and print progress"
        )]
        poll_interval: Duration,
    },

    /// Validate a workflow graph without executing it
    Validate {
        #[arg(help = "Path to workflow graph (YAML or JSON)")]
        graph: PathBuf,
    },

    /// List the agents available to the engine
    Agents,

    /// Initialize a new workflow graph file from a template
    Init {
        #[arg(help = "Name of the workflow to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, value_enum, help = "Graph template", default_value_t = GraphTemplate::Basic)]
        template: GraphTemplate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphTemplate {
    /// Linear load, clean, analyze, chart pipeline
    Basic,
    /// Two analyses fanning out from one source and joining at a chart
    Diamond,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
