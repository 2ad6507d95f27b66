use chrono::{DateTime, Datelike, Utc};
use payflow_schemas::{AccVerdict, Line, Paise, RailConfig, RailType};

/// Result of the hard-constraint filter for one rail: either eligible, or
/// rejected with a structured reason string.
pub enum FilterOutcome {
    Eligible,
    Rejected(String),
}

/// §4.4 step 1: a rail is eligible iff every clause holds.
pub fn filter_rail(
    rail: &RailConfig,
    line: &Line,
    is_new_user: bool,
    acc_decision: AccVerdict,
    now: DateTime<Utc>,
) -> FilterOutcome {
    if !rail.is_active {
        return FilterOutcome::Rejected("Rail is not active".to_string());
    }
    if line.amount < rail.min_amount || line.amount > rail.max_amount {
        return FilterOutcome::Rejected(format!(
            "Amount {} outside rail bounds [{}, {}]",
            line.amount, rail.min_amount, rail.max_amount
        ));
    }
    if rail.daily_limit_remaining < line.amount {
        return FilterOutcome::Rejected("Daily limit remaining insufficient".to_string());
    }
    if is_new_user && line.amount > rail.new_user_limit {
        return FilterOutcome::Rejected("Amount exceeds new-user limit".to_string());
    }

    let weekday = now.date_naive().weekday();
    let time = now.time();
    if !rail.working_hours.admits(weekday, time) {
        return FilterOutcome::Rejected("Outside working hours".to_string());
    }

    if rail.rail_type == RailType::Intrabank
        && line.sender.ifsc_prefix() != line.receiver.ifsc_prefix()
    {
        return FilterOutcome::Rejected("Sender/receiver not same bank".to_string());
    }

    if acc_decision == AccVerdict::Fail {
        return FilterOutcome::Rejected("ACC decision is FAIL".to_string());
    }

    FilterOutcome::Eligible
}

/// Amount bucketing used by [`filter_rail`] callers to decide `is_new_user`
/// is intentionally NOT owned here — new-user classification belongs to the
/// caller's customer record, outside this crate's responsibility.
pub fn within(amount: Paise, min: Paise, max: Paise) -> bool {
    amount >= min && amount <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use payflow_schemas::{Party, WorkingHours};

    fn rail() -> RailConfig {
        RailConfig {
            rail_name: "NEFT".to_string(),
            rail_type: RailType::Batch,
            min_amount: Paise::from_rupees(1.0),
            max_amount: Paise::from_rupees(10_000_000.0),
            new_user_limit: Paise::from_rupees(50_000.0),
            working_hours: WorkingHours {
                start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                weekdays: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                ],
            },
            avg_eta_ms: 60_000,
            cost_bps: 5,
            success_probability: 0.94,
            settlement_type: "BATCH".to_string(),
            settlement_certainty: 0.95,
            daily_limit: Paise::from_rupees(100_000_000.0),
            daily_limit_remaining: Paise::from_rupees(100_000_000.0),
            is_active: true,
        }
    }

    fn line(amount: f64) -> Line {
        Line {
            line_id: "L1".to_string(),
            batch_id: "B1".to_string(),
            transaction_id: "T1".to_string(),
            payment_type: payflow_schemas::PaymentType::VendorPayment,
            amount: Paise::from_rupees(amount),
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
            status: payflow_schemas::LineStatus::Pending,
        }
    }

    #[test]
    fn amount_at_min_is_included() {
        let r = rail();
        let l = line(1.0);
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        assert!(matches!(
            filter_rail(&r, &l, false, AccVerdict::Pass, now),
            FilterOutcome::Eligible
        ));
    }

    #[test]
    fn acc_fail_rejects_every_rail() {
        let r = rail();
        let l = line(1000.0);
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        assert!(matches!(
            filter_rail(&r, &l, false, AccVerdict::Fail, now),
            FilterOutcome::Rejected(_)
        ));
    }
}
