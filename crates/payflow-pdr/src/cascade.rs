//! Execution cascade: the SINGLE choke-point through which a scored rail
//! ranking is turned into an actual rail attempt. Generalizes the teacher's
//! `BrokerGateway` / `OrderRouter` split — `RailRouter` is private to this
//! crate and only reachable through the public `RailGateway`, so no caller
//! can debit a rail's daily limit or invoke an executor directly.

use chrono::{DateTime, Utc};
use payflow_schemas::{Line, Paise, PdrExecutionStatus, RailConfig, ScoredRail};

use crate::mock_rail::RailExecutionResult;
use crate::registry::RailRegistry;

/// Seam over the rail-execution backend, mirroring the teacher's
/// `BrokerAdapter` trait.
pub trait RailExecutor {
    fn execute(
        &mut self,
        rail: &RailConfig,
        line: &Line,
        attempt_no: u32,
        now: DateTime<Utc>,
    ) -> RailExecutionResult;
}

/// Outcome of running the full cascade for one line.
#[derive(Clone, Debug)]
pub struct CascadeOutcome {
    pub final_status: PdrExecutionStatus,
    pub final_rail_used: Option<String>,
    pub final_utr: Option<String>,
    pub attempt_count: u32,
    pub attempted_rails: Vec<String>,
    pub last_error: Option<String>,
}

/// Private router: owns the rail registry, walks the ordered candidate list,
/// and is the only code path that calls into a `RailExecutor`.
pub(crate) struct RailRouter<E: RailExecutor> {
    executor: E,
    registry: RailRegistry,
    max_attempts: u32,
}

impl<E: RailExecutor> RailRouter<E> {
    fn new(executor: E, registry: RailRegistry, max_attempts: u32) -> Self {
        Self {
            executor,
            registry,
            max_attempts,
        }
    }

    async fn run_cascade(
        &mut self,
        candidates: &[ScoredRail],
        line: &Line,
        now: DateTime<Utc>,
    ) -> CascadeOutcome {
        let mut attempt_count = 0u32;
        let mut attempted_rails = Vec::new();
        let mut last_error = None;

        for candidate in candidates {
            if attempt_count >= self.max_attempts {
                break;
            }
            let rail = match self.registry.get(&candidate.rail_name).await {
                Some(r) => r,
                None => continue,
            };
            attempt_count += 1;
            attempted_rails.push(rail.rail_name.clone());

            let result = self.executor.execute(&rail, line, attempt_count, now);
            match result {
                RailExecutionResult::Success { utr, .. } => {
                    // The rail already moved the money; a failed daily-limit
                    // debit is a bookkeeping problem, not a payment failure.
                    // Falling through to another candidate here would pay
                    // the line a second time, so this always returns
                    // Success once the executor reports one.
                    if let Err(err) = self.registry.debit(&rail.rail_name, line.amount).await {
                        tracing::warn!(
                            rail_name = %rail.rail_name,
                            line_id = %line.line_id,
                            error = %err,
                            "cascade/debit_failed_after_success"
                        );
                    }
                    return CascadeOutcome {
                        final_status: PdrExecutionStatus::Success,
                        final_rail_used: Some(rail.rail_name.clone()),
                        final_utr: Some(utr),
                        attempt_count,
                        attempted_rails,
                        last_error: None,
                    };
                }
                RailExecutionResult::Failure { error_code, error_message } => {
                    last_error = Some(format!("{error_code}: {error_message}"));
                }
            }
        }

        CascadeOutcome {
            final_status: PdrExecutionStatus::Failed,
            final_rail_used: None,
            final_utr: None,
            attempt_count,
            attempted_rails,
            last_error,
        }
    }
}

/// Public entry point. Every caller outside this crate reaches rail
/// execution only through [`RailGateway::execute`].
pub struct RailGateway<E: RailExecutor> {
    router: RailRouter<E>,
}

impl<E: RailExecutor> RailGateway<E> {
    pub fn new(executor: E, registry: RailRegistry, max_attempts: u32) -> Self {
        Self {
            router: RailRouter::new(executor, registry, max_attempts),
        }
    }

    /// Run the cascade for `candidates` in the given order (primary first,
    /// then fallbacks), stopping at the first verified success or once
    /// `max_attempts` rails have been tried.
    pub async fn execute(
        &mut self,
        candidates: &[ScoredRail],
        line: &Line,
        now: DateTime<Utc>,
    ) -> CascadeOutcome {
        self.router.run_cascade(candidates, line, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use payflow_schemas::{LineStatus, PaymentType, Party, RailType, WorkingHours};

    struct ScriptedExecutor {
        results: Vec<RailExecutionResult>,
        idx: usize,
    }

    impl RailExecutor for ScriptedExecutor {
        fn execute(
            &mut self,
            _rail: &RailConfig,
            _line: &Line,
            _attempt_no: u32,
            _now: DateTime<Utc>,
        ) -> RailExecutionResult {
            let r = self.results[self.idx].clone();
            self.idx += 1;
            r
        }
    }

    fn rail(name: &str) -> RailConfig {
        RailConfig {
            rail_name: name.to_string(),
            rail_type: RailType::Instant,
            min_amount: Paise::ZERO,
            max_amount: Paise::from_rupees(1_000_000.0),
            new_user_limit: Paise::from_rupees(10_000.0),
            working_hours: WorkingHours {
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                weekdays: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun],
            },
            avg_eta_ms: 1000,
            cost_bps: 0,
            success_probability: 0.9,
            settlement_type: "INSTANT".to_string(),
            settlement_certainty: 0.9,
            daily_limit: Paise::from_rupees(1000.0),
            daily_limit_remaining: Paise::from_rupees(1000.0),
            is_active: true,
        }
    }

    fn line() -> Line {
        Line {
            line_id: "L1".to_string(),
            batch_id: "B1".to_string(),
            transaction_id: "T1".to_string(),
            payment_type: PaymentType::VendorPayment,
            amount: Paise::from_rupees(50.0),
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
    async fn falls_through_to_fallback_on_primary_failure() {
        let registry = RailRegistry::new(vec![rail("UPI"), rail("IMPS")]);
        let executor = ScriptedExecutor {
            results: vec![
                RailExecutionResult::Failure { error_code: "X".to_string(), error_message: "x".to_string() },
                RailExecutionResult::Success { utr: "UTR1".to_string(), actual_eta_ms: 100 },
            ],
            idx: 0,
        };
        let mut gw = RailGateway::new(executor, registry, 3);
        let candidates = vec![
            ScoredRail { rail_name: "UPI".to_string(), score: 0.9 },
            ScoredRail { rail_name: "IMPS".to_string(), score: 0.8 },
        ];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let outcome = gw.execute(&candidates, &line(), now).await;
        assert_eq!(outcome.final_status, PdrExecutionStatus::Success);
        assert_eq!(outcome.final_rail_used, Some("IMPS".to_string()));
        assert_eq!(outcome.attempt_count, 2);
    }

    #[tokio::test]
    async fn exhausting_all_candidates_fails() {
        let registry = RailRegistry::new(vec![rail("UPI")]);
        let executor = ScriptedExecutor {
            results: vec![RailExecutionResult::Failure { error_code: "X".to_string(), error_message: "x".to_string() }],
            idx: 0,
        };
        let mut gw = RailGateway::new(executor, registry, 3);
        let candidates = vec![ScoredRail { rail_name: "UPI".to_string(), score: 0.9 }];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let outcome = gw.execute(&candidates, &line(), now).await;
        assert_eq!(outcome.final_status, PdrExecutionStatus::Failed);
        assert!(outcome.final_rail_used.is_none());
    }

    #[tokio::test]
    async fn successful_debit_reduces_daily_limit_remaining() {
        let registry = RailRegistry::new(vec![rail("UPI")]);
        let executor = ScriptedExecutor {
            results: vec![RailExecutionResult::Success { utr: "UTR1".to_string(), actual_eta_ms: 100 }],
            idx: 0,
        };
        let mut gw = RailGateway::new(executor, registry.clone(), 3);
        let candidates = vec![ScoredRail { rail_name: "UPI".to_string(), score: 0.9 }];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        gw.execute(&candidates, &line(), now).await;
        let r = registry.get("UPI").await.unwrap();
        assert_eq!(r.daily_limit_remaining, Paise::from_rupees(950.0));
    }

    #[tokio::test]
    async fn debit_failure_after_success_does_not_retry_another_rail() {
        let mut upi = rail("UPI");
        upi.daily_limit_remaining = Paise::from_rupees(10.0);
        let registry = RailRegistry::new(vec![upi, rail("IMPS")]);
        let executor = ScriptedExecutor {
            results: vec![RailExecutionResult::Success { utr: "UTR1".to_string(), actual_eta_ms: 100 }],
            idx: 0,
        };
        let mut gw = RailGateway::new(executor, registry, 3);
        let candidates = vec![
            ScoredRail { rail_name: "UPI".to_string(), score: 0.9 },
            ScoredRail { rail_name: "IMPS".to_string(), score: 0.8 },
        ];
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let outcome = gw.execute(&candidates, &line(), now).await;
        assert_eq!(outcome.final_status, PdrExecutionStatus::Success);
        assert_eq!(outcome.final_rail_used, Some("UPI".to_string()));
        assert_eq!(outcome.final_utr, Some("UTR1".to_string()));
        assert_eq!(outcome.attempt_count, 1, "must not execute a second rail after a successful transfer");
    }
}
