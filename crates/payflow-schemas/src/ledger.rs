use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Paise;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerSide {
    Debit,
    Credit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerState {
    Pending,
    Posted,
    Reconciled,
}

impl LedgerState {
    /// `PENDING -> POSTED -> RECONCILED`, no backward transition.
    pub fn can_advance_to(self, next: LedgerState) -> bool {
        matches!(
            (self, next),
            (LedgerState::Pending, LedgerState::Posted)
                | (LedgerState::Posted, LedgerState::Reconciled)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: String,
    pub account: String,
    pub side: LedgerSide,
    pub amount: Paise,
    pub currency: String,
    /// `batch_id` + `line_id`.
    pub reference: String,
    pub ts: DateTime<Utc>,
    pub state: LedgerState,
}
