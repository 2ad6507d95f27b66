use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSource {
    PdrValidation,
    AccCompliance,
    BankApi,
    System,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RootCause {
    pub issue_code: String,
    pub source: IssueSource,
    pub recommendation: String,
    pub severity: Severity,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RcaResult {
    pub line_id: String,
    pub root_cause: RootCause,
    pub analysis_details: String,
}
