//! Raw feature extraction, cross-rail normalization, and weighted linear
//! scoring (§4.4 steps 2-6). Grounded on
//! `original_source/services/pdr/scoring_engine.py`, whose amount-match and
//! working-hours-penalty piecewise functions are reproduced exactly.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use payflow_schemas::{
    AccDecision, Contribution, Line, RailConfig, RailPerformance, RailType, RawFeatures,
    ScoredRail, ScoringWeights,
};

/// Features where a lower raw value is better; these are inverted during
/// normalization so 1.0 is always best.
const LOWER_IS_BETTER: &[&str] = &[
    "eta_ms",
    "cost_bps",
    "compliance_penalty",
    "risk_score",
    "critic_penalty_decay",
    "working_hours_penalty",
];

pub fn extract_raw_features(
    rail: &RailConfig,
    line: &Line,
    acc: &AccDecision,
    recent_performance: &[RailPerformance],
    now: DateTime<Utc>,
) -> RawFeatures {
    RawFeatures {
        rail_name: rail.rail_name.clone(),
        eta_ms: rail.avg_eta_ms as f64,
        cost_bps: rail.cost_bps as f64,
        success_prob: rail.success_probability,
        compliance_penalty: acc.compliance_penalty as f64 / 100.0,
        risk_score: acc.risk_score as f64 / 100.0,
        critic_penalty_decay: critic_penalty_decay(rail, recent_performance),
        window_bonus: window_bonus(rail, now),
        amount_match_bonus: amount_match_bonus(rail, line.amount.rupees()),
        working_hours_penalty: working_hours_penalty(rail, now),
        settlement_certainty: rail.settlement_certainty,
    }
}

/// Exponentially-decayed penalty from rolling recent-failure statistics: each
/// of the last failures (most-recent-first) contributes `0.5 * 0.5^age`, so a
/// failure on the immediately preceding attempt weighs most and the
/// contribution halves per attempt further back.
fn critic_penalty_decay(rail: &RailConfig, recent: &[RailPerformance]) -> f64 {
    let mut relevant: Vec<&RailPerformance> =
        recent.iter().filter(|p| p.rail_name == rail.rail_name).collect();
    relevant.sort_by_key(|p| std::cmp::Reverse(p.initiated_at));

    let mut penalty = 0.0f64;
    for (age, perf) in relevant.iter().take(5).enumerate() {
        if !perf.success {
            penalty += 0.5 * 0.5f64.powi(age as i32);
        }
    }
    penalty.min(1.0)
}

/// Small load-balancing bonus favoring instant rails outside peak hours and
/// RTGS in the afternoon settlement window.
fn window_bonus(rail: &RailConfig, now: DateTime<Utc>) -> f64 {
    match rail.rail_type {
        RailType::Instant => 0.3,
        RailType::Realtime if now.hour() >= 14 => 0.2,
        _ => 0.0,
    }
}

/// §4.4: exact per-rail piecewise amount-match function.
fn amount_match_bonus(rail: &RailConfig, amount_rupees: f64) -> f64 {
    match rail.rail_name.as_str() {
        "UPI" => {
            if amount_rupees <= 25_000.0 {
                1.0
            } else if amount_rupees <= 100_000.0 {
                0.7
            } else {
                0.3
            }
        }
        "IMPS" => {
            if (1_000.0..=200_000.0).contains(&amount_rupees) {
                1.0
            } else if amount_rupees <= 500_000.0 {
                0.8
            } else {
                0.4
            }
        }
        "NEFT" => {
            if amount_rupees >= 50_000.0 {
                1.0
            } else if amount_rupees >= 10_000.0 {
                0.8
            } else {
                0.5
            }
        }
        "RTGS" => {
            if amount_rupees >= 500_000.0 {
                1.0
            } else if amount_rupees >= 200_000.0 {
                0.8
            } else {
                0.3
            }
        }
        "IFT" => 0.9,
        _ => 0.5,
    }
}

fn working_hours_penalty(rail: &RailConfig, now: DateTime<Utc>) -> f64 {
    let admits = rail.working_hours.admits(now.weekday(), now.time());
    if admits {
        return 0.0;
    }
    match rail.rail_type {
        RailType::Batch => 0.8,
        RailType::Realtime => 0.9,
        RailType::Instant | RailType::Intrabank => 0.0,
    }
}

/// §4.4 step 3: min-max normalize each feature across the eligible set,
/// inverting lower-is-better features so 1.0 is always best, with a 0.5
/// neutral value when `max == min`.
pub fn normalize(raw: &[RawFeatures]) -> BTreeMap<String, BTreeMap<String, f64>> {
    let field_names = [
        "eta_ms",
        "cost_bps",
        "success_prob",
        "compliance_penalty",
        "risk_score",
        "critic_penalty_decay",
        "window_bonus",
        "amount_match_bonus",
        "working_hours_penalty",
        "settlement_certainty",
    ];

    let mut out: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for rail_features in raw {
        out.insert(rail_features.rail_name.clone(), BTreeMap::new());
    }

    for field in field_names {
        let values: Vec<f64> = raw.iter().map(|r| get_field(r, field)).collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lower_is_better = LOWER_IS_BETTER.contains(&field);

        for (r, &v) in raw.iter().zip(values.iter()) {
            let normalized = if (max - min).abs() < f64::EPSILON {
                0.5
            } else {
                let n = (v - min) / (max - min);
                if lower_is_better {
                    1.0 - n
                } else {
                    n
                }
            };
            out.get_mut(&r.rail_name).unwrap().insert(field.to_string(), normalized);
        }
    }

    out
}

fn get_field(r: &RawFeatures, field: &str) -> f64 {
    match field {
        "eta_ms" => r.eta_ms,
        "cost_bps" => r.cost_bps,
        "success_prob" => r.success_prob,
        "compliance_penalty" => r.compliance_penalty,
        "risk_score" => r.risk_score,
        "critic_penalty_decay" => r.critic_penalty_decay,
        "window_bonus" => r.window_bonus,
        "amount_match_bonus" => r.amount_match_bonus,
        "working_hours_penalty" => r.working_hours_penalty,
        "settlement_certainty" => r.settlement_certainty,
        _ => unreachable!("unknown feature {field}"),
    }
}

fn weight_for(weights: &ScoringWeights, field: &str) -> f64 {
    match field {
        "eta_ms" => weights.eta_ms,
        "cost_bps" => weights.cost_bps,
        "success_prob" => weights.success_prob,
        "compliance_penalty" => weights.compliance_penalty,
        "risk_score" => weights.risk_score,
        "critic_penalty_decay" => weights.critic_penalty_decay,
        "window_bonus" => weights.window_bonus,
        "amount_match_bonus" => weights.amount_match_bonus,
        "working_hours_penalty" => weights.working_hours_penalty,
        "settlement_certainty" => weights.settlement_certainty,
        _ => unreachable!("unknown feature {field}"),
    }
}

/// §4.4 step 4: weighted linear score, clamped to `[0, 1]`.
pub fn score_rail(normalized: &BTreeMap<String, f64>, weights: &ScoringWeights) -> f64 {
    let raw_score: f64 = normalized
        .iter()
        .map(|(field, value)| value * weight_for(weights, field))
        .sum();
    raw_score.clamp(0.0, 1.0)
}

/// §4.4 step 5: sort by descending score, ties broken by lower `eta_ms` then
/// rail name ascending.
pub fn order_rails(raw: &[RawFeatures], scores: &BTreeMap<String, f64>) -> Vec<ScoredRail> {
    let mut ranked: Vec<ScoredRail> = scores
        .iter()
        .map(|(rail_name, &score)| ScoredRail {
            rail_name: rail_name.clone(),
            score,
        })
        .collect();

    let eta_of = |name: &str| -> f64 {
        raw.iter()
            .find(|r| r.rail_name == name)
            .map(|r| r.eta_ms)
            .unwrap_or(f64::MAX)
    };

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| eta_of(&a.rail_name).partial_cmp(&eta_of(&b.rail_name)).unwrap())
            .then_with(|| a.rail_name.cmp(&b.rail_name))
    });
    ranked
}

/// §4.4 step 6: top-3 `weight * normalized_feature` contributions for the
/// primary rail.
pub fn top_contributions(
    normalized: &BTreeMap<String, f64>,
    weights: &ScoringWeights,
) -> Vec<Contribution> {
    let mut terms: Vec<Contribution> = normalized
        .iter()
        .map(|(field, value)| Contribution {
            feature: field.clone(),
            weighted_value: value * weight_for(weights, field),
        })
        .collect();
    terms.sort_by(|a, b| b.weighted_value.partial_cmp(&a.weighted_value).unwrap());
    terms.truncate(3);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feat(rail: &str, eta: f64) -> RawFeatures {
        RawFeatures {
            rail_name: rail.to_string(),
            eta_ms: eta,
            cost_bps: 5.0,
            success_prob: 0.9,
            compliance_penalty: 0.1,
            risk_score: 0.1,
            critic_penalty_decay: 0.0,
            window_bonus: 0.0,
            amount_match_bonus: 0.8,
            working_hours_penalty: 0.0,
            settlement_certainty: 0.9,
        }
    }

    #[test]
    fn identical_feature_values_normalize_to_neutral() {
        let raw = vec![feat("A", 1000.0), feat("B", 1000.0)];
        let normalized = normalize(&raw);
        assert_eq!(normalized["A"]["eta_ms"], 0.5);
        assert_eq!(normalized["B"]["eta_ms"], 0.5);
    }

    #[test]
    fn lower_is_better_feature_is_inverted() {
        let raw = vec![feat("FAST", 1000.0), feat("SLOW", 5000.0)];
        let normalized = normalize(&raw);
        assert_eq!(normalized["FAST"]["eta_ms"], 1.0);
        assert_eq!(normalized["SLOW"]["eta_ms"], 0.0);
    }

    #[test]
    fn score_is_clamped_and_deterministic() {
        let raw = vec![feat("A", 1000.0), feat("B", 2000.0)];
        let normalized = normalize(&raw);
        let weights = ScoringWeights::defaults();
        let s1 = score_rail(&normalized["A"], &weights);
        let s2 = score_rail(&normalized["A"], &weights);
        assert_eq!(s1, s2);
        assert!((0.0..=1.0).contains(&s1));
    }

    #[test]
    fn ties_break_by_lower_eta_then_name() {
        let raw = vec![feat("ZZZ", 500.0), feat("AAA", 500.0)];
        let mut scores = BTreeMap::new();
        scores.insert("ZZZ".to_string(), 0.5);
        scores.insert("AAA".to_string(), 0.5);
        let ordered = order_rails(&raw, &scores);
        assert_eq!(ordered[0].rail_name, "AAA");
    }

    #[test]
    fn amount_match_bonus_matches_reference_breakpoints() {
        let mut upi = RailConfig {
            rail_name: "UPI".to_string(),
            rail_type: RailType::Instant,
            min_amount: payflow_schemas::Paise::ZERO,
            max_amount: payflow_schemas::Paise::from_rupees(1_000_000.0),
            new_user_limit: payflow_schemas::Paise::from_rupees(10_000.0),
            working_hours: payflow_schemas::WorkingHours {
                start: chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                weekdays: vec![
                    chrono::Weekday::Mon,
                    chrono::Weekday::Tue,
                    chrono::Weekday::Wed,
                    chrono::Weekday::Thu,
                    chrono::Weekday::Fri,
                    chrono::Weekday::Sat,
                    chrono::Weekday::Sun,
                ],
            },
            avg_eta_ms: 2_000,
            cost_bps: 0,
            success_probability: 0.98,
            settlement_type: "INSTANT".to_string(),
            settlement_certainty: 0.98,
            daily_limit: payflow_schemas::Paise::from_rupees(1_000_000.0),
            daily_limit_remaining: payflow_schemas::Paise::from_rupees(1_000_000.0),
            is_active: true,
        };
        assert_eq!(amount_match_bonus(&upi, 25_000.0), 1.0);
        assert_eq!(amount_match_bonus(&upi, 25_000.01), 0.7);
        upi.rail_name = "RTGS".to_string();
        assert_eq!(amount_match_bonus(&upi, 500_000.0), 1.0);
        assert_eq!(amount_match_bonus(&upi, 199_999.0), 0.3);
    }
}
