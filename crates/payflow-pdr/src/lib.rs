//! Payment Decisioning & Routing: hard-constraint filtering, cross-rail
//! scoring with explainability, and the execution cascade that turns a
//! ranked rail list into an actual settlement attempt (§4.4-§4.5).

pub mod cascade;
pub mod filter;
pub mod mock_rail;
pub mod registry;
pub mod scoring;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use payflow_schemas::{
    AccDecision, AccVerdict, Line, PdrDecision, PdrExecutionStatus, RailConfig, RailPerformance,
    ScoringWeights,
};

use filter::FilterOutcome;

/// §4.4 steps 1-6: filter, extract features, normalize, score, rank, and
/// produce the explainability snapshot. Does not execute anything; callers
/// pass the resulting `PdrDecision` to [`cascade::RailGateway`] to run it.
pub fn decide(
    rails: &[RailConfig],
    line: &Line,
    acc: &AccDecision,
    is_new_user: bool,
    recent_performance: &[RailPerformance],
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> PdrDecision {
    let mut filtered_out_reasons = BTreeMap::new();
    let mut eligible = Vec::new();

    for rail in rails {
        match filter::filter_rail(rail, line, is_new_user, acc.decision, now) {
            FilterOutcome::Eligible => eligible.push(rail),
            FilterOutcome::Rejected(reason) => {
                filtered_out_reasons.insert(rail.rail_name.clone(), reason);
            }
        }
    }

    if eligible.is_empty() {
        return PdrDecision {
            line_id: line.line_id.clone(),
            primary_rail: String::new(),
            primary_score: 0.0,
            fallback_rails: Vec::new(),
            feature_snapshot: Vec::new(),
            normalized_snapshot: BTreeMap::new(),
            weight_snapshot: weights.clone(),
            top_contributions: Vec::new(),
            filtered_out_reasons,
            execution_status: PdrExecutionStatus::Failed,
            current_attempt_rail: None,
            attempt_count: 0,
            final_rail_used: None,
            final_utr: None,
            final_status: Some(PdrExecutionStatus::Failed),
        };
    }

    let raw: Vec<_> = eligible
        .iter()
        .map(|rail| scoring::extract_raw_features(rail, line, acc, recent_performance, now))
        .collect();

    let normalized = scoring::normalize(&raw);

    let mut scores = BTreeMap::new();
    for rail_name in normalized.keys() {
        scores.insert(rail_name.clone(), scoring::score_rail(&normalized[rail_name], weights));
    }

    let ordered = scoring::order_rails(&raw, &scores);
    let primary = ordered.first().cloned().expect("eligible set is non-empty");
    let fallback_rails = ordered.iter().skip(1).cloned().collect();

    let primary_normalized = &normalized[&primary.rail_name];
    let top_contributions = scoring::top_contributions(primary_normalized, weights);

    PdrDecision {
        line_id: line.line_id.clone(),
        primary_rail: primary.rail_name.clone(),
        primary_score: primary.score,
        fallback_rails,
        feature_snapshot: raw,
        normalized_snapshot: normalized,
        weight_snapshot: weights.clone(),
        top_contributions,
        filtered_out_reasons,
        execution_status: PdrExecutionStatus::Pending,
        current_attempt_rail: Some(primary.rail_name),
        attempt_count: 0,
        final_rail_used: None,
        final_utr: None,
        final_status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use payflow_schemas::{LineStatus, Paise, Party, PaymentType, RailType, WorkingHours};

    fn rail(name: &str, rail_type: RailType) -> RailConfig {
        RailConfig {
            rail_name: name.to_string(),
            rail_type,
            min_amount: Paise::ZERO,
            max_amount: Paise::from_rupees(10_000_000.0),
            new_user_limit: Paise::from_rupees(50_000.0),
            working_hours: WorkingHours {
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                weekdays: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                    Weekday::Sun,
                ],
            },
            avg_eta_ms: 5_000,
            cost_bps: 5,
            success_probability: 0.95,
            settlement_type: "INSTANT".to_string(),
            settlement_certainty: 0.95,
            daily_limit: Paise::from_rupees(1_000_000.0),
            daily_limit_remaining: Paise::from_rupees(1_000_000.0),
            is_active: true,
        }
    }

    fn line() -> Line {
        Line {
            line_id: "L1".to_string(),
            batch_id: "B1".to_string(),
            transaction_id: "T1".to_string(),
            payment_type: PaymentType::VendorPayment,
            amount: Paise::from_rupees(10_000.0),
            currency: "INR".to_string(),
            purpose_code: "VENDOR_PAYMENT".to_string(),
            sender: Party {
                name: "A".to_string(),
                account: "1".to_string(),
                ifsc: "HDFC0000001".to_string(),
                bank: "HDFC".to_string(),
            },
            receiver: Party {
                name: "B".to_string(),
                account: "2".to_string(),
                ifsc: "ICIC0000099".to_string(),
                bank: "ICICI".to_string(),
            },
            schedule_ts: Utc::now(),
            additional_fields: Default::default(),
            status: LineStatus::Pending,
        }
    }

    fn acc_pass() -> AccDecision {
        AccDecision {
            line_id: "L1".to_string(),
            decision: AccVerdict::Pass,
            policy_version: "v1".to_string(),
            reasons: Vec::new(),
            evidence_refs: Vec::new(),
            compliance_penalty: 0,
            risk_score: 0,
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn picks_a_primary_rail_among_eligible_candidates() {
        let rails = vec![rail("UPI", RailType::Instant), rail("IMPS", RailType::Instant)];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let decision = decide(&rails, &line(), &acc_pass(), false, &[], &ScoringWeights::defaults(), now);
        assert!(!decision.primary_rail.is_empty());
        assert_eq!(decision.fallback_rails.len(), 1);
        assert_eq!(decision.execution_status, PdrExecutionStatus::Pending);
    }

    #[test]
    fn no_eligible_rails_yields_failed_decision() {
        let mut rtgs = rail("RTGS", RailType::Realtime);
        rtgs.is_active = false;
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let decision = decide(&[rtgs], &line(), &acc_pass(), false, &[], &ScoringWeights::defaults(), now);
        assert_eq!(decision.execution_status, PdrExecutionStatus::Failed);
        assert!(decision.primary_rail.is_empty());
        assert_eq!(decision.filtered_out_reasons.len(), 1);
    }

    #[test]
    fn decision_is_deterministic_for_identical_inputs() {
        let rails = vec![rail("UPI", RailType::Instant), rail("NEFT", RailType::Batch)];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let d1 = decide(&rails, &line(), &acc_pass(), false, &[], &ScoringWeights::defaults(), now);
        let d2 = decide(&rails, &line(), &acc_pass(), false, &[], &ScoringWeights::defaults(), now);
        assert_eq!(d1.primary_rail, d2.primary_rail);
        assert_eq!(d1.primary_score, d2.primary_score);
    }
}
