//! Orchestrator-wide shared state: the line-workflow map plus the bounded
//! concurrency gate. Follows the teacher's `AppState`
//! (`mqk-daemon/src/state.rs`): a small `Clone` struct wrapping `Arc`s so
//! every task holding a clone sees the same underlying state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use payflow_schemas::Actor;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

use crate::state_machine::{LineWorkflow, TransitionError, WorkflowEvent, WorkflowState};

/// Default bound on lines running their pipeline at once, per the
/// concurrency model's default of 8 concurrent line workers.
const DEFAULT_MAX_CONCURRENT_LINES: usize = 8;

#[derive(Clone)]
pub struct WorkflowRegistry {
    workflows: Arc<RwLock<HashMap<String, LineWorkflow>>>,
    concurrency: Arc<Semaphore>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_MAX_CONCURRENT_LINES)
    }

    pub fn with_concurrency(max_concurrent_lines: usize) -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
            concurrency: Arc::new(Semaphore::new(max_concurrent_lines)),
        }
    }

    pub async fn register(&self, line_id: &str) {
        let mut workflows = self.workflows.write().await;
        workflows.entry(line_id.to_string()).or_insert_with(|| LineWorkflow::new(line_id));
    }

    pub async fn state_of(&self, line_id: &str) -> Option<WorkflowState> {
        self.workflows.read().await.get(line_id).map(|w| w.state)
    }

    pub async fn apply(
        &self,
        line_id: &str,
        event_id: &str,
        event: WorkflowEvent,
    ) -> Result<WorkflowState, TransitionError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.entry(line_id.to_string()).or_insert_with(|| LineWorkflow::new(line_id));
        workflow.apply(event_id, event)?;
        Ok(workflow.state)
    }

    /// Acquire one of the bounded concurrency slots, held for the lifetime
    /// of the returned permit.
    pub async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        self.concurrency.clone().acquire_owned().await.expect("semaphore is never closed")
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A downstream agent's most recently observed run state, matching the
/// `{IDLE, RUNNING, SUCCESS, FAILED}` vocabulary the daemon's status
/// endpoint reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AgentRunStatus {
    Idle,
    Running,
    Success,
    Failed,
}

impl AgentRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRunStatus::Idle => "IDLE",
            AgentRunStatus::Running => "RUNNING",
            AgentRunStatus::Success => "SUCCESS",
            AgentRunStatus::Failed => "FAILED",
        }
    }
}

#[derive(Clone, Debug)]
struct AgentStats {
    status: AgentRunStatus,
    last_run: Option<DateTime<Utc>>,
    error_count: u32,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self { status: AgentRunStatus::Idle, last_run: None, error_count: 0 }
    }
}

/// Tracks each agent's last-observed run outcome so `agent_status` reports
/// real state instead of a fixed "healthy" stub. Grounded on the teacher's
/// `AppState`-held shared-mutable-state discipline (`Arc<RwLock<...>>`
/// behind a small typed wrapper, not a bare map exposed to callers).
#[derive(Clone)]
pub struct AgentStatusTracker {
    stats: Arc<RwLock<HashMap<Actor, AgentStats>>>,
}

/// Fixed reporting order for [`AgentStatusTracker::snapshot`].
const TRACKED_AGENTS: [Actor; 5] = [Actor::Acc, Actor::Pdr, Actor::Arl, Actor::Rca, Actor::Crrak];

impl AgentStatusTracker {
    pub fn new() -> Self {
        Self { stats: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn mark_running(&self, actor: Actor, now: DateTime<Utc>) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(actor).or_default();
        entry.status = AgentRunStatus::Running;
        entry.last_run = Some(now);
    }

    pub async fn mark_finished(&self, actor: Actor, now: DateTime<Utc>, succeeded: bool) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(actor).or_default();
        entry.status = if succeeded { AgentRunStatus::Success } else { AgentRunStatus::Failed };
        entry.last_run = Some(now);
        if !succeeded {
            entry.error_count += 1;
        }
    }

    pub async fn snapshot(&self) -> Vec<(Actor, AgentRunStatus, Option<DateTime<Utc>>, u32)> {
        let stats = self.stats.read().await;
        TRACKED_AGENTS
            .iter()
            .map(|actor| {
                let entry = stats.get(actor).cloned().unwrap_or_default();
                (*actor, entry.status, entry.last_run, entry.error_count)
            })
            .collect()
    }
}

impl Default for AgentStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
