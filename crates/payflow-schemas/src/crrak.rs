use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    Pending,
    NonCompliant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub overall: f64,
    pub transaction: f64,
    pub counterparty: f64,
    pub operational: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditTrailEvent {
    pub ts: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrrakReport {
    pub line_id: String,
    pub compliance_status: ComplianceStatus,
    pub compliance_score: u8,
    pub sanctions_clear: bool,
    pub kyc_verified: bool,
    pub risk: RiskBreakdown,
    pub risk_factors: Vec<String>,
    pub audit_trail: Vec<AuditTrailEvent>,
    pub recommendations: Vec<String>,
    pub report_ref: String,
}
