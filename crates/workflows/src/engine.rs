//! Workflow engine: validation, execution journal, compensation and event
//! publication around every [`Workflow`] run.
//!
//! A run goes through:
//! 1. Create an execution record (pending).
//! 2. Validate the input; invalid input fails the run before any write.
//! 3. Mark the execution as running.
//! 4. Run the workflow against a fresh [`Transaction`].
//! 5. On success publish the recorded events and mark completed; on failure
//!    revert the transaction and mark compensated (or failed when nothing
//!    had been written).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use storefront_core::types::{generate_id, Timestamp};
use storefront_db::DocumentStore;
use storefront_events::EventBus;
use tracing::Instrument;
use validator::Validate;

use crate::error::{WorkflowError, WorkflowResult};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named, typed mutation of the entity graph.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Kebab-case name, e.g. `"create-regions"`.
    const NAME: &'static str;

    type Input: Validate + Send + Sync;
    type Output: Send;

    async fn run(&self, tx: &mut Transaction, input: Self::Input) -> WorkflowResult<Self::Output>;
}

// ---------------------------------------------------------------------------
// Execution journal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Compensated,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow: &'static str,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn DocumentStore>,
    events: Arc<EventBus>,
    executions: Arc<Mutex<Vec<WorkflowExecution>>>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            events,
            executions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run `workflow` with `input`.
    pub async fn run<W: Workflow>(&self, workflow: W, input: W::Input) -> WorkflowResult<W::Output> {
        let execution_id = self.open(W::NAME);
        let span = tracing::info_span!("workflow", name = W::NAME, execution = %execution_id);

        if let Err(errors) = input.validate() {
            let err = WorkflowError::InvalidInput {
                workflow: W::NAME,
                errors,
            };
            self.close(&execution_id, ExecutionStatus::Failed, Some(&err));
            return Err(err);
        }

        self.mark(&execution_id, ExecutionStatus::Running);
        let mut tx = Transaction::new(self.store.clone(), W::NAME);
        let result = workflow.run(&mut tx, input).instrument(span.clone()).await;

        match result {
            Ok(output) => {
                let events = tx.into_events();
                span.in_scope(|| {
                    tracing::debug!(events = events.len(), "Workflow completed");
                });
                for event in events {
                    self.events.publish(event);
                }
                self.close(&execution_id, ExecutionStatus::Completed, None);
                Ok(output)
            }
            Err(err) => {
                let steps = tx.steps();
                let reverted = tx.compensate().instrument(span.clone()).await;
                let status = if steps == 0 {
                    ExecutionStatus::Failed
                } else {
                    ExecutionStatus::Compensated
                };
                span.in_scope(|| {
                    tracing::debug!(error = %err, steps, reverted, "Workflow failed");
                });
                self.close(&execution_id, status, Some(&err));
                Err(err)
            }
        }
    }

    /// Snapshot of the execution journal, oldest first.
    pub fn executions(&self) -> Vec<WorkflowExecution> {
        self.executions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Number of recorded runs of the workflow named `name`.
    pub fn count_runs(&self, name: &str) -> usize {
        self.executions()
            .iter()
            .filter(|e| e.workflow == name)
            .count()
    }

    fn open(&self, workflow: &'static str) -> String {
        let execution = WorkflowExecution {
            id: generate_id("wfexec"),
            workflow,
            status: ExecutionStatus::Pending,
            error: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        };
        let id = execution.id.clone();
        if let Ok(mut executions) = self.executions.lock() {
            executions.push(execution);
        }
        id
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut WorkflowExecution)) {
        if let Ok(mut executions) = self.executions.lock() {
            if let Some(execution) = executions.iter_mut().find(|e| e.id == id) {
                f(execution);
            }
        }
    }

    fn mark(&self, id: &str, status: ExecutionStatus) {
        self.update(id, |e| e.status = status);
    }

    fn close(&self, id: &str, status: ExecutionStatus, error: Option<&WorkflowError>) {
        self.update(id, |e| {
            e.status = status;
            e.error = error.map(ToString::to_string);
            e.finished_at = Some(chrono::Utc::now());
        });
    }
}
