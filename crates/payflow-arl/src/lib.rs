//! ARL: ledger/transaction reconciliation. Deterministic content comparison
//! in the style of the teacher's `mqk_reconcile::engine::reconcile` — no
//! partial credit for "close enough" on completeness, only on amount/time.
//!
//! Grounded on `original_source/services/arl/arl_agent.py`'s
//! `_perform_reconciliation`: same `0.01`-rupee amount tolerance, same
//! 300-second timestamp tolerance, same pair-completeness check, same
//! `matched/total*100` score, same three-way verdict split.

use chrono::{DateTime, Utc};
use payflow_schemas::{
    ArlResult, ArlVerdict, Discrepancy, DiscrepancyKind, DiscrepancySeverity, LedgerEntry,
    LedgerSide,
};

/// One side's settlement facts as reported by the rail executor, used to
/// check amount and timestamp agreement against the ledger entries.
#[derive(Clone, Debug)]
pub struct SettlementFact {
    pub amount: payflow_schemas::Paise,
    pub settled_at: DateTime<Utc>,
}

/// §: a line reconciles iff it has exactly one DEBIT and one CREDIT entry,
/// each within 0.01 rupee of the settlement amount and within 300 seconds of
/// the settlement timestamp.
pub fn reconcile_line(line_id: &str, entries: &[LedgerEntry], fact: &SettlementFact) -> ArlResult {
    let mut discrepancies = Vec::new();
    let total_count = entries.len() as u32;
    let mut matched_count = 0u32;

    for entry in entries {
        let amount_ok = entry.amount.approx_eq(fact.amount);
        let time_ok = (entry.ts - fact.settled_at).num_seconds().abs() <= 300;

        if !amount_ok {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::AmountMismatch,
                severity: DiscrepancySeverity::High,
                detail: format!(
                    "entry {} amount {} does not match settlement amount {}",
                    entry.entry_id, entry.amount, fact.amount
                ),
            });
        }
        if !time_ok {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::TimestampMismatch,
                severity: DiscrepancySeverity::Medium,
                detail: format!(
                    "entry {} timestamp {} is more than 300s from settlement time {}",
                    entry.entry_id, entry.ts, fact.settled_at
                ),
            });
        }
        if amount_ok && time_ok {
            matched_count += 1;
        }
    }

    let debit_count = entries.iter().filter(|e| e.side == LedgerSide::Debit).count();
    let credit_count = entries.iter().filter(|e| e.side == LedgerSide::Credit).count();

    if debit_count != 1 {
        discrepancies.push(Discrepancy {
            kind: DiscrepancyKind::MissingEntry,
            severity: DiscrepancySeverity::Critical,
            detail: format!("expected 1 debit entry, found {debit_count}"),
        });
    }
    if credit_count != 1 {
        discrepancies.push(Discrepancy {
            kind: DiscrepancyKind::MissingEntry,
            severity: DiscrepancySeverity::Critical,
            detail: format!("expected 1 credit entry, found {credit_count}"),
        });
    }

    let score = if total_count == 0 {
        0.0
    } else {
        (matched_count as f64 / total_count as f64) * 100.0
    };

    let has_critical_or_high = discrepancies
        .iter()
        .any(|d| matches!(d.severity, DiscrepancySeverity::Critical | DiscrepancySeverity::High));

    let state = if discrepancies.is_empty() {
        ArlVerdict::Reconciled
    } else if !has_critical_or_high {
        ArlVerdict::Partial
    } else {
        ArlVerdict::Failed
    };

    ArlResult {
        line_id: line_id.to_string(),
        state,
        matched_count,
        total_count,
        discrepancies,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use payflow_schemas::{LedgerState, Paise};

    fn debit(amount: f64, ts: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            entry_id: "DEBIT_B1_L1".to_string(),
            account: "91402004****3081".to_string(),
            side: LedgerSide::Debit,
            amount: Paise::from_rupees(amount),
            currency: "INR".to_string(),
            reference: "B1_L1".to_string(),
            ts,
            state: LedgerState::Posted,
        }
    }

    fn credit(amount: f64, ts: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            entry_id: "CREDIT_B1_L1".to_string(),
            account: "0052050****597".to_string(),
            side: LedgerSide::Credit,
            amount: Paise::from_rupees(amount),
            currency: "INR".to_string(),
            reference: "B1_L1".to_string(),
            ts,
            state: LedgerState::Posted,
        }
    }

    #[test]
    fn exact_pair_match_reconciles() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let entries = vec![debit(1000.0, now), credit(1000.0, now)];
        let fact = SettlementFact { amount: Paise::from_rupees(1000.0), settled_at: now };
        let result = reconcile_line("L1", &entries, &fact);
        assert_eq!(result.state, ArlVerdict::Reconciled);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn amount_within_one_paisa_still_reconciles() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let entries = vec![debit(1000.0, now), credit(1000.0, now)];
        let fact = SettlementFact { amount: Paise(100_001), settled_at: now };
        let result = reconcile_line("L1", &entries, &fact);
        assert_eq!(result.state, ArlVerdict::Reconciled);
    }

    #[test]
    fn missing_credit_entry_is_failed() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let entries = vec![debit(1000.0, now)];
        let fact = SettlementFact { amount: Paise::from_rupees(1000.0), settled_at: now };
        let result = reconcile_line("L1", &entries, &fact);
        assert_eq!(result.state, ArlVerdict::Failed);
    }

    #[test]
    fn timestamp_just_over_tolerance_is_partial() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let drifted = now + chrono::Duration::seconds(301);
        let entries = vec![debit(1000.0, drifted), credit(1000.0, now)];
        let fact = SettlementFact { amount: Paise::from_rupees(1000.0), settled_at: now };
        let result = reconcile_line("L1", &entries, &fact);
        assert_eq!(result.state, ArlVerdict::Partial);
    }

    #[test]
    fn timestamp_at_exact_tolerance_boundary_matches() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let boundary = now + chrono::Duration::seconds(300);
        let entries = vec![debit(1000.0, boundary), credit(1000.0, now)];
        let fact = SettlementFact { amount: Paise::from_rupees(1000.0), settled_at: now };
        let result = reconcile_line("L1", &entries, &fact);
        assert_eq!(result.state, ArlVerdict::Reconciled);
    }
}
