//! Per-line workflow state. Generalizes the teacher's `OmsOrder` in
//! `mqk-execution/src/oms/state_machine.rs`: a small set of states, one
//! `match` over `(state, event)` deciding legality, and idempotent replay
//! keyed by an externally-chosen event id so the orchestrator can retry a
//! `HandleEvent` call without double-applying it.

use std::collections::HashSet;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Initialized,
    Processing,
    Completed,
    Failed,
    Hold,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkflowEvent {
    Started,
    Completed,
    Failed,
    HeldForReview,
    /// Operator override moving a held line back into processing. Per the
    /// HOLD-is-terminal-until-override resolution, legal only from `Hold`.
    OverrideResumed,
}

#[derive(Debug)]
pub struct TransitionError {
    pub from: WorkflowState,
    pub event: WorkflowEvent,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot apply {:?} from state {:?}", self.event, self.from)
    }
}

impl std::error::Error for TransitionError {}

/// One line's progress through the pipeline. `applied` holds every event id
/// already consumed so a replayed `(workflow_id, event_type, line_id, seq)`
/// tuple is a silent no-op rather than a duplicate transition.
pub struct LineWorkflow {
    pub line_id: String,
    pub state: WorkflowState,
    applied: HashSet<String>,
}

impl LineWorkflow {
    pub fn new(line_id: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            state: WorkflowState::Initialized,
            applied: HashSet::new(),
        }
    }

    pub fn apply(&mut self, event_id: &str, event: WorkflowEvent) -> Result<(), TransitionError> {
        if self.applied.contains(event_id) {
            return Ok(());
        }
        let next = match (self.state, event) {
            (WorkflowState::Initialized, WorkflowEvent::Started) => WorkflowState::Processing,
            (WorkflowState::Processing, WorkflowEvent::Completed) => WorkflowState::Completed,
            (WorkflowState::Processing, WorkflowEvent::Failed) => WorkflowState::Failed,
            (WorkflowState::Processing, WorkflowEvent::HeldForReview) => WorkflowState::Hold,
            (WorkflowState::Hold, WorkflowEvent::OverrideResumed) => WorkflowState::Processing,
            (from, event) => return Err(TransitionError { from, event }),
        };
        self.state = next;
        self.applied.insert(event_id.to_string());
        Ok(())
    }
}
