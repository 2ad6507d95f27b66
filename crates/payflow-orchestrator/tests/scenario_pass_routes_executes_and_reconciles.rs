//! Scenario: a clean vendor payment clears ACC, gets routed and executed by
//! PDR, reconciles under ARL, and ends in CRRAK with a compliant report.

use chrono::{NaiveTime, TimeZone, Utc, Weekday};
use payflow_acc::{PolicyEvaluator, PolicyRequest, PolicyResponse};
use payflow_classifier::{AccountStatus, ClassifyInput};
use payflow_orchestrator::state_machine::WorkflowState;
use payflow_orchestrator::{LineContext, Orchestrator};
use payflow_pdr::registry::RailRegistry;
use payflow_schemas::{
    LineStatus, Paise, Party, PaymentType, RailConfig, RailType, WorkingHours,
};

struct AlwaysAllow;

impl PolicyEvaluator for AlwaysAllow {
    fn evaluate(
        &self,
        _req: &PolicyRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyResponse> + Send + '_>> {
        Box::pin(async {
            PolicyResponse {
                result: payflow_acc::PolicyResult { allow: true, violations: Vec::new() },
            }
        })
    }
}

fn all_week() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun]
}

fn rail(name: &str) -> RailConfig {
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

fn line() -> payflow_schemas::Line {
    payflow_schemas::Line {
        line_id: "L1".to_string(),
        batch_id: "B1".to_string(),
        transaction_id: "T1".to_string(),
        payment_type: PaymentType::VendorPayment,
        amount: Paise::from_rupees(5_000.0),
        currency: "INR".to_string(),
        purpose_code: "VENDOR_PAYMENT".to_string(),
        sender: Party { name: "A".to_string(), account: "1".to_string(), ifsc: "HDFC0000001".to_string(), bank: "HDFC".to_string() },
        receiver: Party { name: "B".to_string(), account: "2".to_string(), ifsc: "ICIC0000099".to_string(), bank: "ICICI".to_string() },
        schedule_ts: Utc::now(),
        additional_fields: Default::default(),
        status: LineStatus::Pending,
    }
}

#[tokio::test]
async fn clean_vendor_payment_completes_with_a_compliant_report() {
    let rails = RailRegistry::new(vec![rail("UPI"), rail("IMPS")]);
    let orchestrator = Orchestrator::new(AlwaysAllow, rails, "v1");
    let line = line();
    orchestrator.start_batch(&line.batch_id, std::slice::from_ref(&line)).await.unwrap();

    let classify_input = ClassifyInput {
        purpose: "VENDOR_PAYMENT".to_string(),
        remarks: None,
        amount: line.amount,
        is_domestic: true,
        account_status: AccountStatus::Normal,
        fields_complete: true,
    };
    let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
    let ctx = LineContext {
        classify_input: &classify_input,
        is_new_user: false,
        kyc_verified: true,
        counterparty_credit_score: 750,
    };

    let outcome = orchestrator.run_line(&line, ctx, now).await.unwrap();

    assert_eq!(outcome.acc_verdict, Some(payflow_schemas::AccVerdict::Pass));
    assert!(outcome.pdr_decision.is_some());
    assert!(outcome.arl_result.is_some());
    assert!(outcome.crrak_report.is_some());
    assert_eq!(outcome.final_status, LineStatus::Completed);
    assert_eq!(orchestrator.workflow_status(&line.line_id).await, Some(WorkflowState::Completed));
}
