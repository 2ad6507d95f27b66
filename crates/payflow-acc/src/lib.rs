//! Compliance adapter (ACC, §4.3): bundles counterparty verifications into a
//! request to an external policy evaluator and translates its answer into a
//! `{decision, reasons, evidence_refs}` triple.

mod evaluator;
mod penalty;

pub use evaluator::{HttpPolicyEvaluator, PolicyEvaluator, PolicyRequest, PolicyResponse, PolicyResult};

use chrono::Utc;
use payflow_schemas::{AccDecision, AccVerdict};

/// Violation tags that force a `FAIL` instead of `HOLD` regardless of the
/// overall `allow` flag.
const CRITICAL_TAGS: [&str; 3] = ["SANCTION", "LIMIT_EXCEEDED", "INVALID_BENEFICIARY"];

/// Run ACC for one line: call the policy evaluator, then apply the
/// deterministic decision rule. Network/timeout errors are callers'
/// responsibility to turn into a synthetic `POLICY_UNAVAILABLE` violation
/// before calling this (see [`evaluator::PolicyEvaluator::evaluate`]).
pub fn decide(
    line_id: &str,
    policy_version: &str,
    response: &PolicyResponse,
    evidence_refs: Vec<String>,
) -> AccDecision {
    let violations = &response.result.violations;

    let decision = if response.result.allow {
        AccVerdict::Pass
    } else if violations
        .iter()
        .any(|v| CRITICAL_TAGS.iter().any(|tag| v.contains(tag)))
    {
        AccVerdict::Fail
    } else {
        AccVerdict::Hold
    };

    let (compliance_penalty, risk_score) = penalty::score_violations(violations);

    AccDecision {
        line_id: line_id.to_string(),
        decision,
        policy_version: policy_version.to_string(),
        reasons: violations.clone(),
        evidence_refs,
        compliance_penalty,
        risk_score,
        issued_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evaluator::PolicyResult;

    fn resp(allow: bool, violations: &[&str]) -> PolicyResponse {
        PolicyResponse {
            result: PolicyResult {
                allow,
                violations: violations.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn allow_true_is_pass() {
        let d = decide("L1", "v1", &resp(true, &[]), vec![]);
        assert_eq!(d.decision, AccVerdict::Pass);
    }

    #[test]
    fn critical_violation_is_fail() {
        let d = decide("L1", "v1", &resp(false, &["SANCTION_LIST_MATCH"]), vec![]);
        assert_eq!(d.decision, AccVerdict::Fail);
    }

    #[test]
    fn noncritical_violation_is_hold() {
        let d = decide("L1", "v1", &resp(false, &["NAME_MISMATCH_MINOR"]), vec![]);
        assert_eq!(d.decision, AccVerdict::Hold);
    }

    #[test]
    fn synthetic_policy_unavailable_is_hold_not_fail() {
        let d = decide("L1", "v1", &resp(false, &["POLICY_UNAVAILABLE"]), vec![]);
        assert_eq!(d.decision, AccVerdict::Hold);
    }
}
