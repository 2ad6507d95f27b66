//! Shared fixtures for the crate test suites: sample lines, sample rail
//! configs, and a configurable fake policy evaluator, so each crate's
//! `tests/` directory stops redefining the same builders.

use chrono::{NaiveTime, Weekday};
use payflow_acc::{PolicyEvaluator, PolicyRequest, PolicyResponse, PolicyResult};
use payflow_classifier::{AccountStatus, ClassifyInput};
use payflow_schemas::{Line, Paise, Party, PaymentType, RailConfig, RailType, WorkingHours};

/// Monday through Sunday, for rail configs that operate every day.
pub fn all_week() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}

/// A UPI-shaped instant rail open 24x7 with generous limits, the default
/// shape most scenario tests route against.
pub fn sample_rail(name: &str) -> RailConfig {
    RailConfig {
        rail_name: name.to_string(),
        rail_type: RailType::Instant,
        min_amount: Paise::ZERO,
        max_amount: Paise::from_rupees(10_000_000.0),
        new_user_limit: Paise::from_rupees(50_000.0),
        working_hours: WorkingHours {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            weekdays: all_week(),
        },
        avg_eta_ms: 5_000,
        cost_bps: 5,
        success_probability: 0.99,
        settlement_type: "INSTANT".to_string(),
        settlement_certainty: 0.99,
        daily_limit: Paise::from_rupees(1_000_000.0),
        daily_limit_remaining: Paise::from_rupees(1_000_000.0),
        is_active: true,
    }
}

/// A clean vendor payment of a given amount between two fixed parties.
/// Callers overwrite whichever fields their scenario cares about.
pub fn sample_line(line_id: &str, batch_id: &str, amount: Paise) -> Line {
    Line {
        line_id: line_id.to_string(),
        batch_id: batch_id.to_string(),
        transaction_id: format!("T-{line_id}"),
        payment_type: PaymentType::VendorPayment,
        amount,
        currency: "INR".to_string(),
        purpose_code: "VENDOR_PAYMENT".to_string(),
        sender: Party {
            name: "Sender Co".to_string(),
            account: "1".to_string(),
            ifsc: "HDFC0000001".to_string(),
            bank: "HDFC".to_string(),
        },
        receiver: Party {
            name: "Receiver Co".to_string(),
            account: "2".to_string(),
            ifsc: "ICIC0000099".to_string(),
            bank: "ICICI".to_string(),
        },
        schedule_ts: chrono::Utc::now(),
        additional_fields: Default::default(),
        status: payflow_schemas::LineStatus::Pending,
    }
}

/// A classifier input matching [`sample_line`]'s purpose and amount, with a
/// complete, domestic, normal-account shape.
pub fn sample_classify_input(amount: Paise) -> ClassifyInput {
    ClassifyInput {
        purpose: "VENDOR_PAYMENT".to_string(),
        remarks: None,
        amount,
        is_domestic: true,
        account_status: AccountStatus::Normal,
        fields_complete: true,
    }
}

/// Fake policy evaluator returning a fixed verdict, used ONLY for tests.
/// Real evaluation goes over HTTP via [`payflow_acc::HttpPolicyEvaluator`].
pub struct StubPolicyEvaluator {
    pub allow: bool,
    pub violations: Vec<String>,
}

impl StubPolicyEvaluator {
    pub fn allow() -> Self {
        Self { allow: true, violations: Vec::new() }
    }

    pub fn hold(violation: &str) -> Self {
        Self { allow: false, violations: vec![violation.to_string()] }
    }

    pub fn fail(violation: &str) -> Self {
        Self { allow: false, violations: vec![violation.to_string()] }
    }
}

impl PolicyEvaluator for StubPolicyEvaluator {
    fn evaluate(
        &self,
        _req: &PolicyRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyResponse> + Send + '_>> {
        let allow = self.allow;
        let violations = self.violations.clone();
        Box::pin(async move { PolicyResponse { result: PolicyResult { allow, violations } } })
    }
}
