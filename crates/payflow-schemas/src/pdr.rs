use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PdrExecutionStatus {
    Pending,
    Executing,
    Success,
    Failed,
}

/// A scored rail together with its composite score, kept for the
/// explainability snapshot and the fallback ordering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredRail {
    pub rail_name: String,
    pub score: f64,
}

/// Raw (pre-normalization) feature vector for one eligible rail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawFeatures {
    pub rail_name: String,
    pub eta_ms: f64,
    pub cost_bps: f64,
    pub success_prob: f64,
    pub compliance_penalty: f64,
    pub risk_score: f64,
    pub critic_penalty_decay: f64,
    pub window_bonus: f64,
    pub amount_match_bonus: f64,
    pub working_hours_penalty: f64,
    pub settlement_certainty: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub eta_ms: f64,
    pub cost_bps: f64,
    pub success_prob: f64,
    pub compliance_penalty: f64,
    pub risk_score: f64,
    pub critic_penalty_decay: f64,
    pub window_bonus: f64,
    pub amount_match_bonus: f64,
    pub working_hours_penalty: f64,
    pub settlement_certainty: f64,
}

impl ScoringWeights {
    /// Default weight vector, summing to 1.0. `amount_match_bonus` and
    /// `success_prob` dominate since rail fit and reliability matter most
    /// for this domain; `settlement_certainty` and `window_bonus` are
    /// tie-breaking signals.
    pub fn defaults() -> Self {
        Self {
            eta_ms: 0.12,
            cost_bps: 0.10,
            success_prob: 0.20,
            compliance_penalty: 0.08,
            risk_score: 0.08,
            critic_penalty_decay: 0.10,
            window_bonus: 0.05,
            amount_match_bonus: 0.17,
            working_hours_penalty: 0.05,
            settlement_certainty: 0.05,
        }
    }
}

/// One `(weight, normalized_feature)` contribution term for explainability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    pub weighted_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PdrDecision {
    pub line_id: String,
    pub primary_rail: String,
    pub primary_score: f64,
    pub fallback_rails: Vec<ScoredRail>,
    pub feature_snapshot: Vec<RawFeatures>,
    pub normalized_snapshot: BTreeMap<String, BTreeMap<String, f64>>,
    pub weight_snapshot: ScoringWeights,
    pub top_contributions: Vec<Contribution>,
    pub filtered_out_reasons: BTreeMap<String, String>,
    pub execution_status: PdrExecutionStatus,
    pub current_attempt_rail: Option<String>,
    pub attempt_count: u32,
    pub final_rail_used: Option<String>,
    pub final_utr: Option<String>,
    pub final_status: Option<PdrExecutionStatus>,
}
