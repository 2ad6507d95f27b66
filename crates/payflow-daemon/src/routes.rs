//! HTTP surface (§6), grounded on `mqk-daemon/src/routes.rs`'s
//! `build_router` + handler layout: one `Router` built from `AppState`,
//! every fallible handler returning `Result<_, ApiError>` so `?` maps
//! straight onto the stable error envelope.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use payflow_classifier::{AccountStatus, ClassifyInput};
use payflow_db::RelationalStore;
use payflow_orchestrator::state_machine::WorkflowEvent;
use payflow_orchestrator::{HandleEventError, LineContext};
use payflow_schemas::{Batch, BatchSource, Line, LineStatus};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api_types::{
    AgentStatusResponse, HealthResponse, OverrideLineRequest, OverrideLineResponse, RowRejectionView,
    TransactionListResponse, UploadBatchResponse, WorkflowStatusResponse,
};
use crate::error::ApiError;
use crate::ingest::{self, IngestOutcome};
use crate::state::{AppState, PayflowBusMsg};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/batches/upload", post(upload_batch))
        .route("/v1/workflows/:id/status", get(workflow_status))
        .route("/v1/lines/:id/override", post(override_line))
        .route("/v1/agents", get(list_agents))
        .route("/v1/transactions", get(list_transactions))
        .route("/v1/transactions/:id", get(get_transaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(st): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, service: st.build.service, version: st.build.version })
}

async fn stream(
    State(st): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let rx = st.bus.subscribe();
    let events = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(msg) => serde_json::to_string(&msg).ok().map(|json| Ok(Event::default().data(json))),
            Err(_) => None,
        }
    });
    Sse::new(events).keep_alive(KeepAlive::new())
}

fn classify_input_for(line: &Line) -> ClassifyInput {
    ClassifyInput {
        purpose: line.purpose_code.clone(),
        remarks: None,
        amount: line.amount,
        is_domestic: true,
        account_status: AccountStatus::Normal,
        fields_complete: line.sender.account != "UNKNOWN" && line.receiver.account != "UNKNOWN",
    }
}

/// `POST /v1/batches/upload`: ingest a CSV or JSON batch. An already-seen
/// `batch_id` (multipart field, or generated fresh otherwise) replays the
/// original response with `records_processed: 0` instead of re-ingesting.
async fn upload_batch(
    State(st): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadBatchResponse>, ApiError> {
    let mut batch_id: Option<String> = None;
    let mut tenant_id = "default".to_string();
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) =
        multipart.next_field().await.map_err(|e| ApiError::bad_request(format!("bad multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "batch_id" => {
                batch_id = Some(field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?)
            }
            "tenant_id" => {
                tenant_id = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?
            }
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_bytes =
                    Some(field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?.to_vec());
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::bad_request("missing `file` field"))?;
    let batch_id = batch_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    if st.db.batch_exists(&batch_id).await? {
        return Ok(Json(UploadBatchResponse {
            batch_id: batch_id.clone(),
            workflow_id: batch_id,
            records_processed: 0,
            rejections: Vec::new(),
        }));
    }

    let is_json = file_name.as_deref().map(|n| n.ends_with(".json")).unwrap_or(false)
        || serde_json::from_slice::<serde_json::Value>(&bytes).is_ok();
    let IngestOutcome { lines, rejections } =
        if is_json { ingest::parse_json(&batch_id, &bytes) } else { ingest::parse_csv(&batch_id, &bytes) };

    let batch = Batch {
        batch_id: batch_id.clone(),
        tenant_id,
        source: BatchSource::Frontend,
        upload_ts: Utc::now(),
        policy_version: st.orchestrator.policy_version.clone(),
        line_count: lines.len() as u32,
        schema_version: 1,
    };
    st.db.insert_batch(&batch).await?;
    for line in &lines {
        st.db.upsert_line(line).await?;
    }
    st.orchestrator.start_batch(&batch_id, &lines).await?;

    let records_processed = lines.len();
    tokio::spawn(run_batch_lines(st.clone(), lines));

    Ok(Json(UploadBatchResponse {
        batch_id: batch_id.clone(),
        workflow_id: batch_id,
        records_processed,
        rejections: rejections
            .into_iter()
            .map(|r| RowRejectionView { row_index: r.row_index, reason: r.reason })
            .collect(),
    }))
}

/// Run every line of a just-ingested batch, persisting its resulting status
/// and audit trail and broadcasting a rollup update after each one. Absent a
/// real KYC/credit-bureau integration at ingestion time, every line is
/// scored with a conservative "known-good" counterparty profile.
async fn run_batch_lines(st: Arc<AppState>, lines: Vec<Line>) {
    let mut tasks = Vec::with_capacity(lines.len());
    for line in lines {
        let st = st.clone();
        tasks.push(tokio::spawn(async move {
            let classify_input = classify_input_for(&line);
            let ctx = LineContext {
                classify_input: &classify_input,
                is_new_user: false,
                kyc_verified: true,
                counterparty_credit_score: 700,
            };
            let batch_id = line.batch_id.clone();
            match st.orchestrator.run_line(&line, ctx, Utc::now()).await {
                Ok(outcome) => {
                    let mut persisted = line.clone();
                    persisted.status = outcome.final_status;
                    let _ = st.db.upsert_line(&persisted).await;
                }
                Err(_) => {
                    let mut persisted = line.clone();
                    persisted.status = LineStatus::Failed;
                    let _ = st.db.upsert_line(&persisted).await;
                }
            }
            sync_audit(&st, &batch_id).await;
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
}

async fn sync_audit(st: &AppState, batch_id: &str) {
    for entry in st.orchestrator.audit.entries_for(batch_id).await {
        let _ = st.db.append_audit_entry(&entry).await;
    }
    if let Ok(status) = workflow_status_rollup(st, batch_id).await {
        let _ = st.bus.send(PayflowBusMsg::WorkflowStatus(status));
    }
}

async fn workflow_status_rollup(st: &AppState, workflow_id: &str) -> Result<WorkflowStatusResponse, ApiError> {
    let lines = st.db.lines_for_batch(workflow_id).await?;
    if lines.is_empty() {
        return Err(ApiError::not_found(format!("no workflow {workflow_id}")));
    }

    let any_failed = lines.iter().any(|l| l.status == LineStatus::Failed);
    let any_hold = lines.iter().any(|l| l.status == LineStatus::Hold);
    let all_terminal =
        lines.iter().all(|l| matches!(l.status, LineStatus::Completed | LineStatus::Failed | LineStatus::Hold));

    let status = if !all_terminal {
        "PROCESSING"
    } else if any_failed {
        "FAILED"
    } else if any_hold {
        "HOLD"
    } else {
        "COMPLETED"
    };

    let errors: Vec<String> = lines
        .iter()
        .filter(|l| l.status == LineStatus::Failed)
        .map(|l| format!("{}: FAILED", l.line_id))
        .collect();

    let audit_events = st.db.audit_entries_for_batch(workflow_id).await?;
    let last = audit_events.iter().max_by_key(|e| e.event.seq);

    Ok(WorkflowStatusResponse {
        workflow_id: workflow_id.to_string(),
        status: status.to_string(),
        current_layer: last.map(|e| e.event.action.clone()),
        current_agent: last.map(|e| format!("{:?}", e.event.actor)),
        last_update: last.map(|e| e.event.ts).unwrap_or_else(Utc::now),
        errors,
    })
}

async fn workflow_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowStatusResponse>, ApiError> {
    Ok(Json(workflow_status_rollup(&st, &id).await?))
}

/// `POST /lines/{id}/override`: resume a held line. Only actors on the
/// orchestrator's configured allow-list may call this; everyone else gets
/// `403`.
async fn override_line(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OverrideLineRequest>,
) -> Result<Json<OverrideLineResponse>, ApiError> {
    let state = st
        .orchestrator
        .handle_event(&id, &req.event_id, WorkflowEvent::OverrideResumed, &req.actor)
        .await
        .map_err(|err| match err {
            HandleEventError::UnauthorizedActor(actor) => {
                ApiError::forbidden(format!("actor '{actor}' is not on the override allow-list"))
            }
            HandleEventError::Transition(err) => ApiError::bad_request(err.to_string()),
        })?;
    Ok(Json(OverrideLineResponse { line_id: id, state: format!("{state:?}") }))
}

async fn list_agents(State(st): State<Arc<AppState>>) -> Json<Vec<AgentStatusResponse>> {
    Json(
        st.orchestrator
            .agent_status()
            .await
            .into_iter()
            .map(|(actor, status, last_run, error_count)| AgentStatusResponse {
                agent_name: format!("{actor:?}"),
                status: status.as_str().to_string(),
                last_run,
                error_count,
            })
            .collect(),
    )
}

async fn list_transactions(
    State(st): State<Arc<AppState>>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    Ok(Json(TransactionListResponse { lines: st.db.all_lines().await? }))
}

async fn get_transaction(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Line>, ApiError> {
    st.db
        .get_line(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no transaction {id}")))
}
