use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Paise;

/// Source that originated a batch submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchSource {
    Frontend,
    BankApi,
}

/// A set of payment lines submitted together under one `batch_id`. Created
/// on ingestion; immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub tenant_id: String,
    pub source: BatchSource,
    pub upload_ts: DateTime<Utc>,
    pub policy_version: String,
    pub line_count: u32,
    pub schema_version: u16,
}

/// One of the canonical business purposes a line can be classified into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Payroll,
    VendorPayment,
    LoanDisbursement,
    Utility,
    Tax,
    Refund,
    Transfer,
    Unknown,
}

/// Counterparty details on one side of a payment (sender or receiver).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub account: String,
    pub ifsc: String,
    pub bank: String,
}

impl Party {
    /// First 4 characters of the IFSC, used by the intrabank eligibility
    /// check (`sender.ifsc[0:4] == receiver.ifsc[0:4]`).
    pub fn ifsc_prefix(&self) -> &str {
        let end = self.ifsc.char_indices().nth(4).map(|(i, _)| i).unwrap_or(self.ifsc.len());
        &self.ifsc[..end]
    }
}

/// Exclusive status states for a [`Line`]. Only the orchestrator mutates
/// this; transitions are append-only to the audit log.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Hold,
}

/// A single payment instruction within a batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Line {
    pub line_id: String,
    pub batch_id: String,
    pub transaction_id: String,
    pub payment_type: PaymentType,
    pub amount: Paise,
    pub currency: String,
    pub purpose_code: String,
    pub sender: Party,
    pub receiver: Party,
    pub schedule_ts: DateTime<Utc>,
    /// Unknown upstream fields preserved verbatim for audit (the "extensions
    /// bag" called for by the module-level-state redesign flag).
    pub additional_fields: BTreeMap<String, serde_json::Value>,
    pub status: LineStatus,
}
