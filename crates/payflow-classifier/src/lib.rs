//! Intent classifier (§4.2): maps purpose/remarks/amount to a canonical
//! intent plus a risk and confidence score.

mod fuzzy;
mod keywords;

use payflow_schemas::{Paise, PaymentType};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
    None,
}

/// Receiver-account familiarity, feeding `account_risk`/`account_conf`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccountStatus {
    Normal,
    New,
    Flagged,
}

#[derive(Clone, Debug)]
pub struct ClassifyInput {
    pub purpose: String,
    pub remarks: Option<String>,
    pub amount: Paise,
    pub is_domestic: bool,
    pub account_status: AccountStatus,
    /// Whether all required KYC/counterparty fields are present.
    pub fields_complete: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntentClassification {
    pub intent: PaymentType,
    pub match_kind: MatchKind,
    pub risk_score: f64,
    pub confidence: f64,
}

const FUZZY_THRESHOLD: f64 = 0.6;

/// Classify a line per the spec's 6-step algorithm.
pub fn classify(input: &ClassifyInput) -> IntentClassification {
    let purpose_upper = normalize(&input.purpose);
    let (intent, match_kind) = rule_based(&purpose_upper);

    let intent = if match_kind == MatchKind::None {
        bucket_by_amount(input.amount)
    } else {
        intent
    };

    let risk_score = risk_score(input, match_kind);
    let confidence = confidence(input, match_kind);

    IntentClassification {
        intent,
        match_kind,
        risk_score: round2(risk_score),
        confidence: round2(confidence),
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

/// Step 1 + 2: exact keyword match, else best fuzzy match above threshold.
fn rule_based(purpose_upper: &str) -> (PaymentType, MatchKind) {
    for (key, intent) in keywords::KEYWORDS {
        if *key == purpose_upper {
            return (*intent, MatchKind::Exact);
        }
    }

    let mut best: Option<(PaymentType, f64)> = None;
    for (key, intent) in keywords::KEYWORDS {
        let sim = fuzzy::similarity_ratio(purpose_upper, key);
        let better = match &best {
            Some((_, best_sim)) => sim > *best_sim,
            None => true,
        };
        if better && sim >= FUZZY_THRESHOLD {
            best = Some((*intent, sim));
        }
    }

    match best {
        Some((intent, _)) => (intent, MatchKind::Fuzzy),
        None => (PaymentType::Unknown, MatchKind::None),
    }
}

/// Step 3: amount-bucket fallback intent when no keyword match at all.
fn bucket_by_amount(amount: Paise) -> PaymentType {
    let rupees = amount.rupees();
    if rupees > 1_000_000.0 {
        PaymentType::VendorPayment
    } else if rupees >= 100_000.0 {
        PaymentType::Payroll
    } else {
        PaymentType::Utility
    }
}

/// Step 4: `0.4*amount_risk + 0.2*zone_risk + 0.25*purpose_risk + 0.15*account_risk`.
fn risk_score(input: &ClassifyInput, match_kind: MatchKind) -> f64 {
    let amount_risk = (input.amount.rupees() / 100_000.0).min(1.0);
    let zone_risk = if input.is_domestic { 0.1 } else { 0.3 };
    let purpose_risk = if match_kind == MatchKind::Exact { 0.1 } else { 0.2 };
    let account_risk = match input.account_status {
        AccountStatus::Normal => 0.0,
        AccountStatus::New => 0.05,
        AccountStatus::Flagged => 0.2,
    };
    0.4 * amount_risk + 0.2 * zone_risk + 0.25 * purpose_risk + 0.15 * account_risk
}

/// Step 5: `match_confidence^0.5 * completeness^0.3 * account_conf^0.2`.
fn confidence(input: &ClassifyInput, match_kind: MatchKind) -> f64 {
    let match_confidence: f64 = match match_kind {
        MatchKind::Exact => 0.9,
        MatchKind::Fuzzy => 0.7,
        MatchKind::None => 0.5,
    };
    let completeness: f64 = if input.fields_complete { 1.0 } else { 0.7 };
    let account_conf: f64 = match input.account_status {
        AccountStatus::Normal => 0.95,
        AccountStatus::New => 0.7,
        AccountStatus::Flagged => 0.5,
    };
    match_confidence.powf(0.5) * completeness.powf(0.3) * account_conf.powf(0.2)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Standalone advisory threshold check over a classifier risk score (§9 open
/// question #1): `> 0.7` surfaces as an advisory FAIL-equivalent, `> 0.4` as
/// an advisory HOLD-equivalent. This never overrides ACC's own violation-tag
/// decision rule (§4.3) — it is exposed only as an extra field callers may
/// log or alert on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Elevated,
    High,
}

pub fn risk_band(risk_score: f64) -> RiskBand {
    if risk_score > 0.7 {
        RiskBand::High
    } else if risk_score > 0.4 {
        RiskBand::Elevated
    } else {
        RiskBand::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> ClassifyInput {
        ClassifyInput {
            purpose: "VENDOR_PAYMENT".to_string(),
            remarks: None,
            amount: Paise::from_rupees(5000.0),
            is_domestic: true,
            account_status: AccountStatus::Normal,
            fields_complete: true,
        }
    }

    #[test]
    fn exact_keyword_match_yields_exact() {
        let result = classify(&base_input());
        assert_eq!(result.intent, PaymentType::VendorPayment);
        assert_eq!(result.match_kind, MatchKind::Exact);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let mut input = base_input();
        input.purpose = "VENDR_PAYMNT".to_string();
        let result = classify(&input);
        assert_eq!(result.intent, PaymentType::VendorPayment);
        assert_eq!(result.match_kind, MatchKind::Fuzzy);
    }

    #[test]
    fn unmatched_purpose_falls_back_to_amount_bucket() {
        let mut input = base_input();
        input.purpose = "ZZZZZZZ_NONSENSE".to_string();
        input.amount = Paise::from_rupees(2_000_000.0);
        let result = classify(&input);
        assert_eq!(result.match_kind, MatchKind::None);
        assert_eq!(result.intent, PaymentType::VendorPayment);
    }

    #[test]
    fn amount_bucket_boundaries() {
        let mut input = base_input();
        input.purpose = "ZZZZZZZ_NONSENSE".to_string();

        input.amount = Paise::from_rupees(100_000.0);
        assert_eq!(classify(&input).intent, PaymentType::Payroll);

        input.amount = Paise::from_rupees(99_999.0);
        assert_eq!(classify(&input).intent, PaymentType::Utility);
    }

    #[test]
    fn flagged_account_raises_risk_and_lowers_confidence() {
        let mut normal = base_input();
        let mut flagged = base_input();
        flagged.account_status = AccountStatus::Flagged;

        let normal_result = classify(&normal);
        let flagged_result = classify(&flagged);
        assert!(flagged_result.risk_score > normal_result.risk_score);
        assert!(flagged_result.confidence < normal_result.confidence);
        normal.account_status = AccountStatus::Normal;
    }

    #[test]
    fn risk_band_thresholds() {
        assert_eq!(risk_band(0.71), RiskBand::High);
        assert_eq!(risk_band(0.41), RiskBand::Elevated);
        assert_eq!(risk_band(0.40), RiskBand::Low);
    }
}
