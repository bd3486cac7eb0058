// ABOUTME: Integration tests for the CLI application
// ABOUTME: Runs the insightflow binary against temp graph files and checks exit codes and output

use std::path::Path;
use std::process::{Command, Output};

mod common;
use common::{diamond, TestEnvironment, TestGraphBuilder};

fn insightflow(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_insightflow"))
        .args(args)
        .current_dir(dir)
        .env("INSIGHTFLOW_TICK_INTERVAL", "1ms")
        .env("INSIGHTFLOW_LOG_LEVEL", "warn")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute insightflow")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help_command() {
    let env = TestEnvironment::new();
    let output = insightflow(env.temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("insightflow"));
    assert!(text.contains("run"));
    assert!(text.contains("validate"));
}

#[test]
fn test_cli_version_command() {
    let env = TestEnvironment::new();
    let output = insightflow(env.temp_dir.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_cli_run_prints_json_snapshot() {
    let env = TestEnvironment::new();
    env.write_graph("diamond.yaml", &diamond()).await;

    let output = insightflow(
        env.temp_dir.path(),
        &["run", "diamond.yaml", "--format", "json", "--mode", "parallel"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let snapshot: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["mode"], "parallel");
    assert_eq!(snapshot["summary"]["completed_nodes"], 4);

    let progress = String::from_utf8_lossy(&output.stderr);
    assert!(progress.contains("4/4 completed"));
}

#[tokio::test]
async fn test_cli_run_writes_output_file() {
    let env = TestEnvironment::new();
    env.write_graph("diamond.yaml", &diamond()).await;

    let output = insightflow(
        env.temp_dir.path(),
        &["run", "diamond.yaml", "--format", "yaml", "--output", "out/result.yaml"],
    );

    assert!(output.status.success());
    let written = std::fs::read_to_string(env.path("out/result.yaml")).unwrap();
    assert!(written.contains("status: completed"));
}

#[tokio::test]
async fn test_cli_run_failed_execution_exits_nonzero() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("broken")
        .failing_node("load", "data_source")
        .node("chart", "visualization")
        .edge("load", "chart");
    env.write_graph("broken.yaml", &builder).await;

    let output = insightflow(env.temp_dir.path(), &["run", "broken.yaml"]);

    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("load exploded"));
}

#[tokio::test]
async fn test_cli_validate_reports_cycle() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("loop")
        .node("a", "data_source")
        .node("b", "analysis")
        .edge("a", "b")
        .edge("b", "a");
    env.write_graph("loop.yaml", &builder).await;

    let output = insightflow(env.temp_dir.path(), &["validate", "loop.yaml"]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("cycle-detected"));
}

#[tokio::test]
async fn test_cli_validate_valid_graph() {
    let env = TestEnvironment::new();
    env.write_graph("diamond.yaml", &diamond()).await;

    let output = insightflow(env.temp_dir.path(), &["validate", "diamond.yaml"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Graph 'diamond' is valid"));
    assert!(text.contains("Nodes: 4"));
}

#[test]
fn test_cli_agents_lists_defaults() {
    let env = TestEnvironment::new();
    let output = insightflow(env.temp_dir.path(), &["agents"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("data-engineer"));
    assert!(text.contains("viz-specialist"));
}

#[tokio::test]
async fn test_cli_agents_from_config_file() {
    let env = TestEnvironment::new();
    env.write_file(
        "insightflow.yaml",
        r#"
agents:
  use_defaults: false
  agents:
    - id: solo
      name: Solo
      role: generalist
      capabilities: [data_extraction]
"#,
    )
    .await;

    let output = insightflow(env.temp_dir.path(), &["agents"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("solo"));
    assert!(!text.contains("data-engineer"));
}

#[test]
fn test_cli_init_then_run() {
    let env = TestEnvironment::new();
    let dir = env.temp_dir.path();

    let init = insightflow(dir, &["init", "starter", "--template", "diamond"]);
    assert!(init.status.success());
    assert!(env.path("starter.yaml").exists());

    let again = insightflow(dir, &["init", "starter"]);
    assert!(!again.status.success());

    let run = insightflow(dir, &["run", "starter.yaml"]);
    assert!(run.status.success());
    assert!(stdout(&run).contains("completed"));
}
