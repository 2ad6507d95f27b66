use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ACC verdict for a line. At most one current decision per line; prior
/// decisions are retained for audit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccVerdict {
    Pass,
    Hold,
    Fail,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccDecision {
    pub line_id: String,
    pub decision: AccVerdict,
    pub policy_version: String,
    /// Ordered list of machine codes (e.g. `SANCTION_LIST_MATCH`).
    pub reasons: Vec<String>,
    pub evidence_refs: Vec<String>,
    pub compliance_penalty: u8,
    pub risk_score: u8,
    pub issued_at: DateTime<Utc>,
}
