// ABOUTME: Per-execution scheduler driving nodes through their state machine
// ABOUTME: Runs ready nodes in waves with agent assignment, timeouts, bounded retry, and stop handling

use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::aggregator::ResultAggregator;
use super::context::NodeContext;
use super::dependency::DependencyResolver;
use super::error::{ExecutionError, Result};
use super::result::{ExecutionStatus, NodeStatus};
use super::store::ExecutionStore;
use crate::agents::AgentRegistry;
use crate::graph::{ExecutionMode, NodeSpec};
use crate::tasks::WorkUnitRegistry;

pub const NO_AGENT_AVAILABLE: &str = "no agent available";
pub const UPSTREAM_INCOMPLETE: &str = "upstream dependency did not complete";
pub const DEADLINE_EXCEEDED: &str = "execution deadline exceeded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on nodes per wave in parallel mode
    #[serde(default = "default_max_parallel_nodes")]
    pub max_parallel_nodes: usize,
    #[serde(default = "default_node_timeout", with = "humantime_serde")]
    pub node_timeout: Duration,
    #[serde(default, with = "humantime_serde")]
    pub execution_timeout: Option<Duration>,
    /// Pause between progress ticks of the simulated work units
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(default = "default_steps")]
    pub default_steps: u32,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
}

fn default_max_parallel_nodes() -> usize {
    4
}

fn default_node_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_steps() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: default_max_parallel_nodes(),
            node_timeout: default_node_timeout(),
            execution_timeout: None,
            tick_interval: default_tick_interval(),
            default_steps: default_steps(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a specific retry attempt (0-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;

        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    pub fn exponential_backoff(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier: multiplier,
            max_delay: default_max_delay(),
        }
    }

    pub fn fixed_delay(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: delay,
        }
    }
}

#[derive(Debug)]
enum NodeOutcome {
    Completed(Value),
    Failed,
    Stopped,
    /// Stop was already requested when the node's turn came; it stays pending
    NotStarted,
}

/// Drives one execution from `Pending` to a terminal status.
pub struct ExecutionScheduler {
    store: Arc<ExecutionStore>,
    agents: Arc<AgentRegistry>,
    work_units: Arc<WorkUnitRegistry>,
    config: EngineConfig,
}

impl ExecutionScheduler {
    pub fn new(
        store: Arc<ExecutionStore>,
        agents: Arc<AgentRegistry>,
        work_units: Arc<WorkUnitRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            agents,
            work_units,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let snapshot =
            self.store
                .get(execution_id)
                .await
                .ok_or_else(|| ExecutionError::ExecutionNotFound {
                    execution_id: execution_id.to_string(),
                })?;

        let resolver =
            DependencyResolver::new(snapshot.nodes.iter().map(|n| n.id().to_string()), &snapshot.edges);
        let specs: HashMap<String, NodeSpec> = snapshot
            .nodes
            .iter()
            .map(|n| (n.id().to_string(), n.spec.clone()))
            .collect();
        let wave_size = match snapshot.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => self.config.max_parallel_nodes.max(1),
        };
        let deadline = self.config.execution_timeout.map(|t| Instant::now() + t);

        self.store
            .update(execution_id, |execution| execution.mark_running())
            .await?;
        info!(
            workflow_id = %snapshot.workflow_id,
            mode = %snapshot.mode,
            nodes = resolver.len(),
            "Starting execution"
        );

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut completed: HashSet<String> = HashSet::new();
        let mut outputs: HashMap<String, Value> = HashMap::new();
        let mut deadline_exceeded = false;

        for root in resolver.root_nodes() {
            queued.insert(root.clone());
            queue.push_back(root);
        }

        while !queue.is_empty() {
            if self.store.is_stop_requested(execution_id).await {
                info!("Stop observed; no further waves");
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("Execution deadline exceeded");
                deadline_exceeded = true;
                break;
            }

            let mut wave = Vec::with_capacity(wave_size);
            while wave.len() < wave_size {
                let Some(node_id) = queue.pop_front() else {
                    break;
                };
                if resolver.is_ready(&node_id, &completed) {
                    wave.push(node_id);
                } else {
                    debug!(node_id = %node_id, "Dropping node that is not ready");
                }
            }
            if wave.is_empty() {
                continue;
            }

            debug!(wave = ?wave, "Running wave");
            let runs = wave.iter().map(|node_id| {
                self.run_node(execution_id, &specs[node_id], &resolver, &outputs, deadline)
            });
            let outcomes = join_all(runs).await;

            for (node_id, outcome) in wave.into_iter().zip(outcomes) {
                let outcome = match outcome {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(node_id = %node_id, error = %e, "Node bookkeeping failed");
                        self.fail_node(execution_id, &node_id, &e.to_string()).await;
                        NodeOutcome::Failed
                    }
                };

                if let NodeOutcome::Completed(output) = outcome {
                    completed.insert(node_id.clone());
                    outputs.insert(node_id.clone(), output);

                    for successor in resolver.successors_of(&node_id) {
                        if !queued.contains(&successor) && resolver.is_ready(&successor, &completed) {
                            queued.insert(successor.clone());
                            queue.push_back(successor);
                        }
                    }
                }
            }
        }

        let status = self
            .store
            .update(execution_id, |execution| {
                if execution.stop_requested {
                    for node in execution
                        .nodes
                        .iter_mut()
                        .filter(|n| n.status == NodeStatus::Running)
                    {
                        if let Err(e) = node.mark_stopped() {
                            warn!(error = %e, "Could not stop node");
                        }
                    }
                    execution.finish(ExecutionStatus::Stopped);
                    return ExecutionStatus::Stopped;
                }

                let reason = if deadline_exceeded {
                    DEADLINE_EXCEEDED
                } else {
                    UPSTREAM_INCOMPLETE
                };
                for node in execution
                    .nodes
                    .iter_mut()
                    .filter(|n| n.status == NodeStatus::Pending)
                {
                    if let Err(e) = node.mark_failed(reason) {
                        warn!(error = %e, "Could not fail unreached node");
                    }
                }

                if execution
                    .nodes
                    .iter()
                    .all(|n| n.status == NodeStatus::Completed)
                {
                    execution.finish(ExecutionStatus::Completed);
                    let (results, insights) = ResultAggregator::aggregate(execution);
                    execution.results = Some(results);
                    execution.insights = Some(insights);
                } else {
                    execution.finish(ExecutionStatus::Failed);
                }
                execution.status
            })
            .await?;

        info!(%status, "Execution finished");
        Ok(status)
    }

    async fn run_node(
        &self,
        execution_id: &str,
        spec: &NodeSpec,
        resolver: &DependencyResolver,
        outputs: &HashMap<String, Value>,
        deadline: Option<Instant>,
    ) -> Result<NodeOutcome> {
        let node_id = spec.id.as_str();

        if self.store.is_stop_requested(execution_id).await {
            return Ok(NodeOutcome::NotStarted);
        }

        let Some(agent) = self.agents.find_for_node(&spec.node_type).await else {
            warn!(node_id, node_type = %spec.node_type, "No agent available");
            self.store
                .update_node(execution_id, node_id, |n| n.mark_failed(NO_AGENT_AVAILABLE))
                .await?;
            return Ok(NodeOutcome::Failed);
        };

        let Some(unit) = self.work_units.get(spec.node_type.as_str()) else {
            let e = ExecutionError::WorkUnitNotFound {
                node_type: spec.node_type.to_string(),
            };
            warn!(node_id, error = %e, "Cannot run node");
            self.store
                .update_node(execution_id, node_id, |n| n.mark_failed(e.to_string()))
                .await?;
            return Ok(NodeOutcome::Failed);
        };

        let node_timeout = match unit.validate_config(spec).and_then(|_| {
            spec.timeout()
                .map_err(|reason| ExecutionError::InvalidConfiguration {
                    node_id: node_id.to_string(),
                    reason,
                })
        }) {
            Ok(t) => t.unwrap_or(self.config.node_timeout),
            Err(e) => {
                warn!(node_id, error = %e, "Rejected node configuration");
                self.store
                    .update_node(execution_id, node_id, |n| n.mark_failed(e.to_string()))
                    .await?;
                return Ok(NodeOutcome::Failed);
            }
        };

        self.store
            .update_node(execution_id, node_id, |n| n.mark_running(agent.id.clone()))
            .await?;
        info!(node_id, agent_id = %agent.id, "Node started");

        let inputs: IndexMap<String, Value> = resolver
            .predecessors_of(node_id)
            .into_iter()
            .filter_map(|pred| outputs.get(&pred).map(|out| (pred, out.clone())))
            .collect();

        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            self.store
                .update_node(execution_id, node_id, |n| {
                    n.attempts = attempt;
                    Ok(())
                })
                .await?;

            let limit = match deadline {
                Some(d) => node_timeout.min(d.saturating_duration_since(Instant::now())),
                None => node_timeout,
            };
            let ctx = NodeContext::new(execution_id, spec.clone(), agent.id.clone(), Arc::clone(&self.store))
                .with_inputs(inputs.clone())
                .with_attempt(attempt)
                .with_ticks(self.config.tick_interval, self.config.default_steps);

            let result = match timeout(limit, unit.run(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::Timeout {
                    node_id: node_id.to_string(),
                    timeout: limit,
                }),
            };

            match result {
                Ok(output) => {
                    self.store
                        .update_node(execution_id, node_id, |n| n.mark_completed(output.clone()))
                        .await?;
                    info!(node_id, attempt, "Node completed");
                    return Ok(NodeOutcome::Completed(output));
                }
                Err(ExecutionError::Stopped) => {
                    self.store
                        .update_node(execution_id, node_id, |n| n.mark_stopped())
                        .await?;
                    info!(node_id, "Node stopped");
                    return Ok(NodeOutcome::Stopped);
                }
                Err(e)
                    if e.is_retryable()
                        && attempt < max_attempts
                        && !deadline.is_some_and(|d| Instant::now() >= d) =>
                {
                    let delay = self.config.retry.calculate_delay(attempt - 1);
                    warn!(node_id, attempt, error = %e, ?delay, "Node attempt failed; retrying");
                    sleep(delay).await;

                    if self.store.is_stop_requested(execution_id).await {
                        self.store
                            .update_node(execution_id, node_id, |n| n.mark_stopped())
                            .await?;
                        info!(node_id, "Node stopped during retry backoff");
                        return Ok(NodeOutcome::Stopped);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    warn!(node_id, attempt, error = %e, "Node failed");
                    self.store
                        .update_node(execution_id, node_id, |n| n.mark_failed(e.to_string()))
                        .await?;
                    return Ok(NodeOutcome::Failed);
                }
            }
        }
    }

    async fn fail_node(&self, execution_id: &str, node_id: &str, message: &str) {
        let result = self
            .store
            .update_node(execution_id, node_id, |n| n.mark_failed(message))
            .await;
        if let Err(e) = result {
            error!(node_id, error = %e, "Could not record node failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::Execution;
    use crate::graph::WorkflowGraph;
    use serde_json::json;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            tick_interval: Duration::from_millis(1),
            default_steps: 2,
            ..Default::default()
        }
    }

    async fn setup(graph: WorkflowGraph, config: EngineConfig) -> (Arc<ExecutionStore>, ExecutionScheduler, String) {
        let store = Arc::new(ExecutionStore::new());
        let execution = Execution::from_graph(graph);
        let id = execution.id.clone();
        store.create(execution).await.unwrap();

        let scheduler = ExecutionScheduler::new(
            Arc::clone(&store),
            Arc::new(AgentRegistry::with_defaults()),
            Arc::new(WorkUnitRegistry::new()),
            config,
        );
        (store, scheduler, id)
    }

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(1),
        };

        assert_eq!(config.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(config.calculate_delay(5), Duration::from_secs(1));

        let fixed = RetryConfig::fixed_delay(4, Duration::from_millis(50));
        assert_eq!(fixed.calculate_delay(3), Duration::from_millis(50));
    }

    #[test]
    fn test_engine_config_from_yaml() {
        let config: EngineConfig = serde_yaml::from_str(
            "max_parallel_nodes: 8\nnode_timeout: 30s\nretry:\n  max_attempts: 3\n  initial_delay: 10ms\n",
        )
        .unwrap();
        assert_eq!(config.max_parallel_nodes, 8);
        assert_eq!(config.node_timeout, Duration::from_secs(30));
        assert_eq!(config.execution_timeout, None);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(10));
        assert_eq!(config.retry.backoff_multiplier, 2.0);
    }

    #[tokio::test]
    async fn test_linear_execution_completes() {
        let graph = WorkflowGraph::new("linear")
            .with_node(NodeSpec::new("load", "data_source").with_data(json!({"records": 50})))
            .with_node(NodeSpec::new("stats", "analysis"))
            .with_edge("load", "stats");
        let (store, scheduler, id) = setup(graph, fast_config()).await;

        let status = scheduler.run(&id).await.unwrap();
        assert_eq!(status, ExecutionStatus::Completed);

        let execution = store.get(&id).await.unwrap();
        assert_eq!(execution.node("stats").unwrap().output.as_ref().unwrap()["records"], 50);
        assert_eq!(execution.results.unwrap().records_processed, 50);
        assert!(execution.end_time.is_some());
    }

    #[tokio::test]
    async fn test_retry_recovers_flaky_node() {
        let mut config = fast_config();
        config.retry = RetryConfig::fixed_delay(3, Duration::from_millis(1));
        let graph = WorkflowGraph::new("flaky")
            .with_node(NodeSpec::new("load", "data_source").with_data(json!({"fail_attempts": 2})));
        let (store, scheduler, id) = setup(graph, config).await;

        assert_eq!(scheduler.run(&id).await.unwrap(), ExecutionStatus::Completed);
        let node = store.get(&id).await.unwrap().node("load").unwrap().clone();
        assert_eq!(node.status, NodeStatus::Completed);
        assert_eq!(node.attempts, 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut config = fast_config();
        config.retry = RetryConfig::fixed_delay(2, Duration::from_millis(1));
        let graph = WorkflowGraph::new("broken")
            .with_node(NodeSpec::new("load", "data_source").with_data(json!({"fail_message": "disk on fire"})));
        let (store, scheduler, id) = setup(graph, config).await;

        assert_eq!(scheduler.run(&id).await.unwrap(), ExecutionStatus::Failed);
        let node = store.get(&id).await.unwrap().node("load").unwrap().clone();
        assert_eq!(node.status, NodeStatus::Failed);
        assert_eq!(node.error.as_deref(), Some("disk on fire"));
        assert_eq!(node.attempts, 2);
    }

    #[tokio::test]
    async fn test_node_timeout() {
        let graph = WorkflowGraph::new("slow").with_node(
            NodeSpec::new("load", "data_source").with_data(json!({"steps": 50, "timeout": "20ms"})),
        );
        let mut config = fast_config();
        config.tick_interval = Duration::from_millis(10);
        let (store, scheduler, id) = setup(graph, config).await;

        assert_eq!(scheduler.run(&id).await.unwrap(), ExecutionStatus::Failed);
        let node = store.get(&id).await.unwrap().node("load").unwrap().clone();
        assert_eq!(node.status, NodeStatus::Failed);
        assert!(node.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_execution_deadline() {
        let graph = WorkflowGraph::new("deadline")
            .with_node(NodeSpec::new("load", "data_source").with_data(json!({"steps": 50})))
            .with_node(NodeSpec::new("stats", "analysis"))
            .with_edge("load", "stats");
        let mut config = fast_config();
        config.tick_interval = Duration::from_millis(10);
        config.execution_timeout = Some(Duration::from_millis(30));
        let (store, scheduler, id) = setup(graph, config).await;

        assert_eq!(scheduler.run(&id).await.unwrap(), ExecutionStatus::Failed);
        let execution = store.get(&id).await.unwrap();
        assert!(execution.node("load").unwrap().error.as_ref().unwrap().contains("timed out"));
        assert_eq!(execution.node("stats").unwrap().status, NodeStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_node_without_running() {
        let graph = WorkflowGraph::new("bad").with_node(
            NodeSpec::new("clean", "transformation").with_data(json!({"drop_ratio": 3.0})),
        );
        let (store, scheduler, id) = setup(graph, fast_config()).await;

        assert_eq!(scheduler.run(&id).await.unwrap(), ExecutionStatus::Failed);
        let node = store.get(&id).await.unwrap().node("clean").unwrap().clone();
        assert_eq!(node.status, NodeStatus::Failed);
        assert!(node.agent_id.is_none());
        assert!(node.error.unwrap().contains("drop_ratio"));
    }

    #[tokio::test]
    async fn test_unknown_execution() {
        let (_store, scheduler, _id) = setup(WorkflowGraph::new("x"), fast_config()).await;
        assert!(matches!(
            scheduler.run("missing").await,
            Err(ExecutionError::ExecutionNotFound { .. })
        ));
    }
}
