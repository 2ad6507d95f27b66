//! Shared data model for the PayFlow orchestration platform.
//!
//! Every record here participates in persistence (via `payflow-db`) and the
//! HTTP surface (via `payflow-daemon`), so all types are `Serialize` +
//! `Deserialize` with explicit field types rather than dynamic maps.

mod acc;
mod arl;
mod audit;
mod batch;
mod crrak;
mod ledger;
pub mod money;
mod pdr;
mod rail;
mod rca;

pub use acc::{AccDecision, AccVerdict};
pub use arl::{ArlResult, ArlVerdict, Discrepancy, DiscrepancyKind, DiscrepancySeverity};
pub use audit::{Actor, AuditEvent};
pub use batch::{Batch, BatchSource, Line, LineStatus, Party, PaymentType};
pub use crrak::{AuditTrailEvent, ComplianceStatus, CrrakReport, RiskBreakdown};
pub use ledger::{LedgerEntry, LedgerSide, LedgerState};
pub use money::Paise;
pub use pdr::{
    Contribution, PdrDecision, PdrExecutionStatus, RawFeatures, ScoredRail, ScoringWeights,
};
pub use rail::{RailConfig, RailPerformance, RailType, WorkingHours};
pub use rca::{IssueSource, RcaResult, RootCause, Severity};

/// Deterministic key derivation for object-store blobs, centralized here so
/// no call site synthesizes a key independently (§9 redesign flag:
/// "Implicit coupling via filesystem/S3 key conventions").
pub mod keys {
    pub fn invoice_raw(tenant: &str, batch_id: &str) -> String {
        format!("invoices/raw/{tenant}/{batch_id}/source")
    }

    pub fn invoice_processed(tenant: &str, batch_id: &str, line_id: &str, phase: &str) -> String {
        format!("invoices/processed/{tenant}/{batch_id}/{line_id}/{phase}.json")
    }

    pub fn audit_report(tenant: &str, batch_id: &str, line_id: &str) -> String {
        format!("audit/{tenant}/{batch_id}/{line_id}/report.pdf")
    }
}
