//! CRRAK: compliance score / risk assessment / audit trail synthesis for the
//! terminal report attached to every line. Deduction amounts, thresholds,
//! and the risk-factor list are grounded on
//! `original_source/services/crrak/crrak_agent.py`'s `_assess_compliance`
//! and `_assess_risk`.

use chrono::{DateTime, Utc};
use payflow_schemas::{AuditTrailEvent, ComplianceStatus, CrrakReport, RiskBreakdown};

/// Everything CRRAK needs about the underlying transaction and its upstream
/// decisions. Counterparty facts are supplied by the caller rather than
/// fetched here, since this crate has no I/O of its own.
pub struct CrrakInputs<'a> {
    pub line_id: &'a str,
    pub report_ref: &'a str,
    pub amount_rupees: f64,
    pub acc_fail: bool,
    pub acc_reasons: &'a [String],
    pub acc_risk_score: u8,
    pub kyc_verified: bool,
    pub counterparty_credit_score: u32,
    pub pdr_failed: bool,
    pub audit_events: Vec<AuditTrailEvent>,
}

fn assess_compliance(inputs: &CrrakInputs) -> (f64, bool, bool) {
    let mut score = 100.0f64;
    let mut sanctions_clear = true;

    if inputs.acc_fail {
        score -= 30.0;
        sanctions_clear = false;
    }
    if inputs.acc_reasons.iter().any(|r| r.to_uppercase().contains("SANCTION")) {
        sanctions_clear = false;
        score -= 50.0;
    }
    if !inputs.kyc_verified {
        score -= 20.0;
    }
    if inputs.amount_rupees > 1_000_000.0 {
        score -= 10.0;
    }

    (score.max(0.0), sanctions_clear, inputs.kyc_verified)
}

fn compliance_status_for(score: f64) -> ComplianceStatus {
    if score >= 80.0 {
        ComplianceStatus::Compliant
    } else if score >= 60.0 {
        ComplianceStatus::Pending
    } else {
        ComplianceStatus::NonCompliant
    }
}

fn assess_risk(inputs: &CrrakInputs) -> (RiskBreakdown, Vec<String>) {
    let mut transaction_risk = 0.0f64;
    let mut counterparty_risk = 0.0f64;
    let mut operational_risk = 0.0f64;
    let mut risk_factors = Vec::new();

    if inputs.amount_rupees > 5_000_000.0 {
        transaction_risk += 30.0;
        risk_factors.push("High transaction amount".to_string());
    } else if inputs.amount_rupees > 1_000_000.0 {
        transaction_risk += 15.0;
        risk_factors.push("Medium transaction amount".to_string());
    }

    if !inputs.kyc_verified {
        counterparty_risk += 40.0;
        risk_factors.push("Counterparty KYC not verified".to_string());
    }
    if inputs.counterparty_credit_score < 600 {
        counterparty_risk += 20.0;
        risk_factors.push("Low counterparty credit score".to_string());
    }

    if inputs.pdr_failed {
        operational_risk += 25.0;
        risk_factors.push("Payment execution failed".to_string());
    }
    if inputs.acc_risk_score > 50 {
        operational_risk += inputs.acc_risk_score as f64 * 0.3;
        risk_factors.push("High ACC risk score".to_string());
    }

    let overall = ((transaction_risk + counterparty_risk + operational_risk) / 3.0).min(100.0);

    (
        RiskBreakdown {
            overall,
            transaction: transaction_risk.min(100.0),
            counterparty: counterparty_risk.min(100.0),
            operational: operational_risk.min(100.0),
        },
        risk_factors,
    )
}

fn generate_recommendations(
    compliance_score: f64,
    sanctions_clear: bool,
    kyc_verified: bool,
    risk: &RiskBreakdown,
) -> Vec<String> {
    let mut recs = Vec::new();
    if !sanctions_clear {
        recs.push("Review sanctions list and update compliance rules".to_string());
    }
    if !kyc_verified {
        recs.push("Complete KYC verification for counterparty".to_string());
    }
    if compliance_score < 80.0 {
        recs.push("Review transaction for compliance issues".to_string());
    }
    if risk.overall > 70.0 {
        recs.push("Consider additional risk mitigation measures".to_string());
    }
    if risk.counterparty > 50.0 {
        recs.push("Verify counterparty credentials and creditworthiness".to_string());
    }
    if risk.operational > 50.0 {
        recs.push("Review operational processes and controls".to_string());
    }
    if recs.is_empty() {
        recs.push("Transaction appears compliant and low risk".to_string());
    }
    recs
}

pub fn generate_report(inputs: CrrakInputs) -> CrrakReport {
    let (compliance_score, sanctions_clear, kyc_verified) = assess_compliance(&inputs);
    let status = compliance_status_for(compliance_score);
    let (risk, risk_factors) = assess_risk(&inputs);
    let recommendations =
        generate_recommendations(compliance_score, sanctions_clear, kyc_verified, &risk);

    let mut audit_trail = inputs.audit_events;
    audit_trail.sort_by_key(|e| e.ts);

    CrrakReport {
        line_id: inputs.line_id.to_string(),
        compliance_status: status,
        compliance_score: compliance_score.round() as u8,
        sanctions_clear,
        kyc_verified,
        risk,
        risk_factors,
        audit_trail,
        recommendations,
        report_ref: inputs.report_ref.to_string(),
    }
}

/// Convenience constructor for one audit-trail row.
pub fn audit_event(ts: DateTime<Utc>, actor: &str, action: &str, detail: &str) -> AuditTrailEvent {
    AuditTrailEvent {
        ts,
        actor: actor.to_string(),
        action: action.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_inputs() -> CrrakInputs<'static> {
        CrrakInputs {
            line_id: "L1",
            report_ref: "ref",
            amount_rupees: 10_000.0,
            acc_fail: false,
            acc_reasons: &[],
            acc_risk_score: 0,
            kyc_verified: true,
            counterparty_credit_score: 750,
            pdr_failed: false,
            audit_events: Vec::new(),
        }
    }

    #[test]
    fn clean_transaction_is_compliant_and_low_risk() {
        let report = generate_report(base_inputs());
        assert_eq!(report.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(report.compliance_score, 100);
        assert_eq!(report.recommendations, vec!["Transaction appears compliant and low risk"]);
    }

    #[test]
    fn acc_fail_and_sanction_reason_compound_deductions() {
        let mut inputs = base_inputs();
        inputs.acc_fail = true;
        let acc_reasons = ["SANCTION_LIST_MATCH".to_string()];
        inputs.acc_reasons = &acc_reasons;
        let report = generate_report(inputs);
        assert_eq!(report.compliance_score, 20);
        assert!(!report.sanctions_clear);
        assert_eq!(report.compliance_status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn large_amount_above_ten_lakh_is_flagged_and_deducted() {
        let mut inputs = base_inputs();
        inputs.amount_rupees = 2_000_000.0;
        let report = generate_report(inputs);
        assert_eq!(report.compliance_score, 90);
        assert_eq!(report.risk.transaction, 15.0);
    }

    #[test]
    fn score_never_goes_below_zero() {
        let mut inputs = base_inputs();
        inputs.acc_fail = true;
        let acc_reasons = ["SANCTION".to_string()];
        inputs.acc_reasons = &acc_reasons;
        inputs.kyc_verified = false;
        inputs.amount_rupees = 2_000_000.0;
        let report = generate_report(inputs);
        assert_eq!(report.compliance_score, 0);
    }

    #[test]
    fn audit_trail_is_sorted_chronologically() {
        let mut inputs = base_inputs();
        let t1 = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap();
        inputs.audit_events = vec![
            audit_event(t1, "ACC_AGENT", "ACC_DECISION", "pass"),
            audit_event(t2, "SYSTEM", "INVOICE_CREATED", "created"),
        ];
        let report = generate_report(inputs);
        assert_eq!(report.audit_trail[0].action, "INVOICE_CREATED");
        assert_eq!(report.audit_trail[1].action, "ACC_DECISION");
    }
}
