use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Actor {
    Mcp,
    Acc,
    Pdr,
    Arl,
    Rca,
    Crrak,
    Bank,
}

/// An append-only audit log row. `seq` is monotonic and gap-free per
/// `(batch_id)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub seq: u64,
    pub batch_id: String,
    pub line_id: Option<String>,
    pub action: String,
    pub actor: Actor,
    pub detail_blob: serde_json::Value,
    pub ts: DateTime<Utc>,
}
