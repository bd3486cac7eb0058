// ABOUTME: Workflow engine facade exposing submit, status, stop, wait, and list
// ABOUTME: Validates graphs, creates executions in the store, and spawns one scheduler task per execution

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use super::error::{ExecutionError, Result};
use super::result::{Execution, ExecutionStatus, ExecutionSummary, StopAck, SubmitAck};
use super::scheduler::{EngineConfig, ExecutionScheduler};
use super::store::ExecutionStore;
use crate::agents::AgentRegistry;
use crate::graph::{GraphValidator, WorkflowGraph};
use crate::tasks::WorkUnitRegistry;

#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<ExecutionStore>,
    agents: Arc<AgentRegistry>,
    work_units: Arc<WorkUnitRegistry>,
    config: EngineConfig,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl WorkflowEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: Arc::new(ExecutionStore::new()),
            agents: Arc::new(AgentRegistry::with_defaults()),
            work_units: Arc::new(WorkUnitRegistry::new()),
            config,
        }
    }

    pub fn with_agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = Arc::new(agents);
        self
    }

    pub fn with_work_units(mut self, work_units: WorkUnitRegistry) -> Self {
        self.work_units = Arc::new(work_units);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn work_units(&self) -> &WorkUnitRegistry {
        &self.work_units
    }

    /// Validate and register a graph, then start it in the background.
    ///
    /// Invalid graphs are rejected before any execution exists.
    #[instrument(skip(self, graph), fields(workflow_id = %graph.workflow_id))]
    pub async fn submit(&self, graph: WorkflowGraph) -> Result<SubmitAck> {
        let execution_id = self.create(graph).await?;
        drop(self.spawn(execution_id.clone()));

        Ok(SubmitAck {
            execution_id,
            status: ExecutionStatus::Pending,
        })
    }

    /// Submit and wait for the scheduler task to finish
    pub async fn execute(&self, graph: WorkflowGraph) -> Result<Execution> {
        let execution_id = self.create(graph).await?;
        self.spawn(execution_id.clone()).await??;

        let execution = self.status(&execution_id).await;
        execution.ok_or(ExecutionError::ExecutionNotFound { execution_id })
    }

    pub async fn status(&self, execution_id: &str) -> Option<Execution> {
        self.store.get(execution_id).await
    }

    pub async fn stop(&self, execution_id: &str) -> Result<StopAck> {
        self.store.stop(execution_id).await
    }

    /// Poll until the execution reaches a terminal status
    pub async fn wait(&self, execution_id: &str, poll_interval: Duration) -> Result<Execution> {
        loop {
            let execution =
                self.status(execution_id)
                    .await
                    .ok_or_else(|| ExecutionError::ExecutionNotFound {
                        execution_id: execution_id.to_string(),
                    })?;
            if execution.is_terminal() {
                return Ok(execution);
            }
            sleep(poll_interval).await;
        }
    }

    pub async fn list(&self) -> Vec<ExecutionSummary> {
        self.store.list().await
    }

    async fn create(&self, graph: WorkflowGraph) -> Result<String> {
        GraphValidator::new().validate(&graph)?;

        let execution = Execution::from_graph(graph);
        let execution_id = execution.id.clone();
        self.store.create(execution).await?;

        info!(execution_id = %execution_id, "Execution submitted");
        Ok(execution_id)
    }

    fn spawn(&self, execution_id: String) -> JoinHandle<Result<ExecutionStatus>> {
        let scheduler = ExecutionScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.agents),
            Arc::clone(&self.work_units),
            self.config.clone(),
        );

        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let run_id = execution_id.clone();
            let result = match tokio::spawn(async move { scheduler.run(&run_id).await }).await {
                Ok(result) => result,
                Err(join_error) => Err(ExecutionError::from(join_error)),
            };

            if let Err(ref e) = result {
                error!(execution_id = %execution_id, error = %e, "Scheduler aborted");
                if let Err(abort_error) = store.abort(&execution_id, &e.to_string()).await {
                    error!(execution_id = %execution_id, error = %abort_error, "Could not fail aborted execution");
                }
            }
            result
        })
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
