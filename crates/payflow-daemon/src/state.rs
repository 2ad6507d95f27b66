//! Shared runtime state for payflow-daemon, grounded on `mqk-daemon`'s
//! `AppState`: a `Clone`-free, `Arc`-wrapped bundle handlers reach through
//! `State<Arc<AppState>>`. All mutability lives behind the types it owns
//! (`Orchestrator` and `RelationalStore`/`ObjectStore` trait objects are
//! already internally synchronized), so this module itself owns nothing
//! async beyond the heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use payflow_acc::HttpPolicyEvaluator;
use payflow_config::AppConfig;
use payflow_db::{ObjectStore, RelationalStore};
use payflow_orchestrator::Orchestrator;
use payflow_pdr::registry::RailRegistry;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api_types::WorkflowStatusResponse;

/// Messages broadcast over the internal event bus and surfaced as SSE
/// events on `GET /v1/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayflowBusMsg {
    Heartbeat { ts_millis: i64 },
    WorkflowStatus(WorkflowStatusResponse),
    LogLine { level: String, msg: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub orchestrator: Orchestrator<HttpPolicyEvaluator>,
    pub db: Arc<dyn RelationalStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub bus: broadcast::Sender<PayflowBusMsg>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        policy_version: impl Into<String>,
        rails: RailRegistry,
        db: Arc<dyn RelationalStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<PayflowBusMsg>(1024);
        let orchestrator = Orchestrator::new(
            HttpPolicyEvaluator::new(config.policy_evaluator_url.clone()),
            rails,
            policy_version,
        )
        .with_agent_timeouts(config.agent_timeouts_ms.clone())
        .with_override_actors(config.override_actors.clone())
        .with_deterministic_seed(config.deterministic_seed)
        .with_concurrency(config.line_parallelism);

        Self {
            build: BuildInfo { service: "payflow-daemon", version: env!("CARGO_PKG_VERSION") },
            orchestrator,
            db,
            objects,
            bus,
        }
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<PayflowBusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(PayflowBusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
