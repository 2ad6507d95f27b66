//! Request and response types for all payflow-daemon HTTP endpoints.
//! `Serialize`/`Deserialize` only; no business logic lives here.

use chrono::{DateTime, Utc};
use payflow_schemas::Line;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// Response body when a daemon route is refused due to a bad request or an
/// internal failure, mapped uniformly by `IntoResponse for ApiError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub status_code: u16,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRejectionView {
    pub row_index: usize,
    pub reason: String,
}

/// `POST /batches/upload` response. Replaying an already-seen `batch_id`
/// returns the original `workflow_id` with `records_processed: 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatchResponse {
    pub batch_id: String,
    pub workflow_id: String,
    pub records_processed: usize,
    pub rejections: Vec<RowRejectionView>,
}

/// `GET /workflows/{id}/status`: a batch-level rollup over every line's
/// per-line workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusResponse {
    pub workflow_id: String,
    /// "PENDING" | "PROCESSING" | "COMPLETED" | "FAILED" | "HOLD" (rollup)
    pub status: String,
    pub current_layer: Option<String>,
    pub current_agent: Option<String>,
    pub last_update: DateTime<Utc>,
    pub errors: Vec<String>,
}

/// `GET /agents`: one entry per downstream subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusResponse {
    pub agent_name: String,
    /// "IDLE" | "RUNNING" | "SUCCESS" | "FAILED"
    pub status: String,
    pub last_run: Option<DateTime<Utc>>,
    pub error_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub lines: Vec<Line>,
}

/// `POST /lines/{id}/override` request body. `actor` must be on the
/// orchestrator's configured override allow-list or the request is refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideLineRequest {
    pub actor: String,
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideLineResponse {
    pub line_id: String,
    pub state: String,
}
