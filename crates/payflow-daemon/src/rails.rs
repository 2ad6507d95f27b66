//! Builds the daemon's rail fleet from `AppConfig::rail_success_rates`,
//! filling in the static shape (limits, working hours, settlement type) for
//! each of the five Indian payment rails the way `payflow-pdr`'s test rail
//! builders do, since only the success probability is expected to vary
//! between environments.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Weekday};
use payflow_schemas::{Paise, RailConfig, RailType, WorkingHours};

fn always_open() -> WorkingHours {
    WorkingHours {
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
    }
}

fn business_hours() -> WorkingHours {
    WorkingHours {
        start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        weekdays: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
    }
}

struct RailSpec {
    name: &'static str,
    rail_type: RailType,
    min_amount: f64,
    max_amount: f64,
    new_user_limit: f64,
    daily_limit: f64,
    avg_eta_ms: u32,
    cost_bps: u32,
    settlement_type: &'static str,
    settlement_certainty: f64,
    hours: fn() -> WorkingHours,
}

const SPECS: [RailSpec; 5] = [
    RailSpec {
        name: "UPI",
        rail_type: RailType::Instant,
        min_amount: 1.0,
        max_amount: 100_000.0,
        new_user_limit: 5_000.0,
        daily_limit: 10_000_000.0,
        avg_eta_ms: 3_000,
        cost_bps: 0,
        settlement_type: "INSTANT",
        settlement_certainty: 0.97,
        hours: always_open,
    },
    RailSpec {
        name: "IMPS",
        rail_type: RailType::Instant,
        min_amount: 1.0,
        max_amount: 500_000.0,
        new_user_limit: 10_000.0,
        daily_limit: 20_000_000.0,
        avg_eta_ms: 5_000,
        cost_bps: 5,
        settlement_type: "INSTANT",
        settlement_certainty: 0.95,
        hours: always_open,
    },
    RailSpec {
        name: "NEFT",
        rail_type: RailType::Batch,
        min_amount: 1.0,
        max_amount: 1_000_000_000.0,
        new_user_limit: 50_000.0,
        daily_limit: 1_000_000_000.0,
        avg_eta_ms: 1_800_000,
        cost_bps: 2,
        settlement_type: "BATCHED",
        settlement_certainty: 0.9,
        hours: business_hours,
    },
    RailSpec {
        name: "RTGS",
        rail_type: RailType::Realtime,
        min_amount: 200_000.0,
        max_amount: 1_000_000_000.0,
        new_user_limit: 200_000.0,
        daily_limit: 1_000_000_000.0,
        avg_eta_ms: 1_800_000,
        cost_bps: 3,
        settlement_type: "REALTIME_GROSS",
        settlement_certainty: 0.92,
        hours: business_hours,
    },
    RailSpec {
        name: "IFT",
        rail_type: RailType::Intrabank,
        min_amount: 1.0,
        max_amount: 1_000_000_000.0,
        new_user_limit: 100_000.0,
        daily_limit: 1_000_000_000.0,
        avg_eta_ms: 500,
        cost_bps: 0,
        settlement_type: "INSTANT",
        settlement_certainty: 0.99,
        hours: always_open,
    },
];

/// Default success probability used for a rail absent from
/// `rail_success_rates` (a fresh environment with no tuned config yet).
const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.9;

pub fn default_rails(success_rates: &BTreeMap<String, f64>) -> Vec<RailConfig> {
    SPECS
        .iter()
        .map(|spec| RailConfig {
            rail_name: spec.name.to_string(),
            rail_type: spec.rail_type,
            min_amount: Paise::from_rupees(spec.min_amount),
            max_amount: Paise::from_rupees(spec.max_amount),
            new_user_limit: Paise::from_rupees(spec.new_user_limit),
            working_hours: (spec.hours)(),
            avg_eta_ms: spec.avg_eta_ms,
            cost_bps: spec.cost_bps,
            success_probability: success_rates.get(spec.name).copied().unwrap_or(DEFAULT_SUCCESS_PROBABILITY),
            settlement_type: spec.settlement_type.to_string(),
            settlement_certainty: spec.settlement_certainty,
            daily_limit: Paise::from_rupees(spec.daily_limit),
            daily_limit_remaining: Paise::from_rupees(spec.daily_limit),
            is_active: true,
        })
        .collect()
}
