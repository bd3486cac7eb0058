// ABOUTME: Concurrency-safe table of executions shared by schedulers and pollers
// ABOUTME: Hands out owned snapshots and records stop requests without touching node state

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::{ExecutionError, Result};
use super::result::{Execution, ExecutionStatus, ExecutionSummary, NodeState, StopAck};

struct ExecutionEntry {
    execution: RwLock<Execution>,
    stop_requested: AtomicBool,
}

/// Owns every execution for the lifetime of the process.
///
/// The outer lock only guards membership; each execution is mutated under
/// its own lock so schedulers of different executions never contend.
#[derive(Default)]
pub struct ExecutionStore {
    entries: RwLock<HashMap<String, Arc<ExecutionEntry>>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, execution: Execution) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&execution.id) {
            return Err(ExecutionError::DuplicateExecution {
                execution_id: execution.id.clone(),
            });
        }

        debug!(execution_id = %execution.id, nodes = execution.nodes.len(), "Creating execution");
        let execution_id = execution.id.clone();
        let entry = ExecutionEntry {
            stop_requested: AtomicBool::new(execution.stop_requested),
            execution: RwLock::new(execution),
        };
        entries.insert(execution_id, Arc::new(entry));
        Ok(())
    }

    async fn entry(&self, execution_id: &str) -> Result<Arc<ExecutionEntry>> {
        self.entries
            .read()
            .await
            .get(execution_id)
            .cloned()
            .ok_or_else(|| ExecutionError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            })
    }

    /// Owned snapshot, including the current stop flag
    pub async fn get(&self, execution_id: &str) -> Option<Execution> {
        let entry = self.entry(execution_id).await.ok()?;
        let mut snapshot = entry.execution.read().await.clone();
        snapshot.stop_requested = entry.stop_requested.load(Ordering::SeqCst);
        Some(snapshot)
    }

    pub async fn update<F, R>(&self, execution_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Execution) -> R,
    {
        let entry = self.entry(execution_id).await?;
        let mut execution = entry.execution.write().await;
        execution.stop_requested = entry.stop_requested.load(Ordering::SeqCst);
        Ok(f(&mut execution))
    }

    pub async fn update_node<F, R>(&self, execution_id: &str, node_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut NodeState) -> Result<R>,
    {
        let entry = self.entry(execution_id).await?;
        let mut execution = entry.execution.write().await;
        f(execution.node_mut(node_id)?)
    }

    /// Record a stop request. Never changes node or execution status; the
    /// scheduler observes the flag and resolves state itself.
    ///
    /// The flag is set under the execution's write lock, so the scheduler's
    /// final update either sees it or has already made the execution terminal.
    pub async fn stop(&self, execution_id: &str) -> Result<StopAck> {
        let entry = self.entry(execution_id).await?;
        let execution = entry.execution.write().await;
        let status = execution.status;

        if status.is_terminal() {
            debug!(execution_id, %status, "Stop ignored for finished execution");
            return Ok(StopAck {
                execution_id: execution_id.to_string(),
                accepted: false,
                status,
            });
        }

        entry.stop_requested.store(true, Ordering::SeqCst);
        info!(execution_id, "Stop requested");

        Ok(StopAck {
            execution_id: execution_id.to_string(),
            accepted: true,
            status,
        })
    }

    /// Force a non-terminal execution to `Failed` after its scheduler died.
    /// Unfinished nodes are failed with `reason`.
    pub async fn abort(&self, execution_id: &str, reason: &str) -> Result<ExecutionStatus> {
        self.update(execution_id, |execution| {
            if execution.is_terminal() {
                return execution.status;
            }

            let message = format!("execution aborted: {}", reason);
            for node in execution.nodes.iter_mut().filter(|n| !n.is_finished()) {
                if let Err(e) = node.mark_failed(message.clone()) {
                    warn!(error = %e, "Could not fail node of aborted execution");
                }
            }
            execution.finish(ExecutionStatus::Failed);
            warn!(execution_id = %execution.id, "Execution aborted");
            execution.status
        })
        .await
    }

    pub async fn is_stop_requested(&self, execution_id: &str) -> bool {
        match self.entry(execution_id).await {
            Ok(entry) => entry.stop_requested.load(Ordering::SeqCst),
            Err(_) => false,
        }
    }

    /// Summaries ordered by creation time
    pub async fn list(&self) -> Vec<ExecutionSummary> {
        let entries: Vec<Arc<ExecutionEntry>> =
            self.entries.read().await.values().cloned().collect();

        let mut executions = Vec::with_capacity(entries.len());
        for entry in entries {
            let execution = entry.execution.read().await;
            executions.push((execution.created_at, execution.summary()));
        }
        executions.sort_by(|a, b| a.0.cmp(&b.0));
        executions.into_iter().map(|(_, summary)| summary).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
