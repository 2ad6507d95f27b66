use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArlVerdict {
    Reconciled,
    Partial,
    Failed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancySeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    AmountMismatch,
    MissingEntry,
    TimestampMismatch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub severity: DiscrepancySeverity,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArlResult {
    pub line_id: String,
    pub state: ArlVerdict,
    pub matched_count: u32,
    pub total_count: u32,
    pub discrepancies: Vec<Discrepancy>,
    pub score: f64,
}
