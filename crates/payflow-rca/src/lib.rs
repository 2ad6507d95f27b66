//! Root-cause mapping for failed or held lines. Grounded on
//! `original_source/services/rca/rca_agent.py`'s `issue_mapping` table and
//! `_calculate_confidence`/`_analyze_generic_failure` fallbacks.

use payflow_schemas::{IssueSource, RcaResult, RootCause, Severity};

struct IssueMapping {
    code: &'static str,
    source: IssueSource,
    recommendation: &'static str,
    severity: Severity,
}

const ISSUE_MAPPINGS: &[IssueMapping] = &[
    IssueMapping {
        code: "INVALID_IFSC",
        source: IssueSource::PdrValidation,
        recommendation: "Verify IFSC code with bank or use correct IFSC",
        severity: Severity::High,
    },
    IssueMapping {
        code: "SANCTIONED",
        source: IssueSource::AccCompliance,
        recommendation: "Review sanctions list and update compliance rules",
        severity: Severity::Critical,
    },
    IssueMapping {
        code: "INSUFFICIENT_FUNDS",
        source: IssueSource::BankApi,
        recommendation: "Check account balance and retry transaction",
        severity: Severity::Medium,
    },
    IssueMapping {
        code: "ACCOUNT_BLOCKED",
        source: IssueSource::BankApi,
        recommendation: "Contact bank to unblock account",
        severity: Severity::High,
    },
    IssueMapping {
        code: "DAILY_LIMIT_EXCEEDED",
        source: IssueSource::PdrValidation,
        recommendation: "Check daily limits or use a different rail",
        severity: Severity::Medium,
    },
    IssueMapping {
        code: "BANK_UNAVAILABLE",
        source: IssueSource::BankApi,
        recommendation: "Retry transaction or use an alternative rail",
        severity: Severity::Low,
    },
    IssueMapping {
        code: "INVALID_ACCOUNT",
        source: IssueSource::BankApi,
        recommendation: "Verify account number and IFSC",
        severity: Severity::High,
    },
];

/// Evidence available when computing confidence: which upstream artifacts
/// were retrievable, and whether the matched issue code appears verbatim in
/// PDR's own `issues` list.
#[derive(Clone, Debug, Default)]
pub struct AnalysisEvidence {
    pub has_pdr_result: bool,
    pub has_acc_decision: bool,
    pub has_invoice_data: bool,
    pub pdr_issues: Vec<String>,
    pub pdr_channel: Option<String>,
}

fn calculate_confidence(issue_code: &str, evidence: &AnalysisEvidence) -> f64 {
    let mut confidence: f64 = 0.5;
    if evidence.has_pdr_result {
        confidence += 0.2;
    }
    if evidence.has_acc_decision {
        confidence += 0.2;
    }
    if evidence.has_invoice_data {
        confidence += 0.1;
    }
    if evidence.has_pdr_result && evidence.pdr_issues.iter().any(|i| i == issue_code) {
        confidence = 0.9;
    }
    confidence.min(1.0)
}

fn analyze_generic_failure(evidence: &AnalysisEvidence) -> RootCause {
    if let Some(channel) = &evidence.pdr_channel {
        return RootCause {
            issue_code: "RAIL_FAILURE".to_string(),
            source: IssueSource::PdrValidation,
            recommendation: format!("Try an alternative rail or contact {channel} support"),
            severity: Severity::Medium,
            confidence: 0.6,
        };
    }
    RootCause {
        issue_code: "UNKNOWN_FAILURE".to_string(),
        source: IssueSource::System,
        recommendation: "Review transaction logs and contact support".to_string(),
        severity: Severity::Low,
        confidence: 0.3,
    }
}

/// Analyze the first mapped issue code found in `issues`, in order; falls
/// back to generic analysis when none matches.
pub fn analyze(line_id: &str, issues: &[String], evidence: &AnalysisEvidence) -> RcaResult {
    for issue in issues {
        if let Some(mapping) = ISSUE_MAPPINGS.iter().find(|m| m.code == issue) {
            let confidence = calculate_confidence(issue, evidence);
            let root_cause = RootCause {
                issue_code: mapping.code.to_string(),
                source: mapping.source,
                recommendation: mapping.recommendation.to_string(),
                severity: mapping.severity,
                confidence,
            };
            return RcaResult {
                line_id: line_id.to_string(),
                root_cause,
                analysis_details: format!("matched mapped issue code {issue}"),
            };
        }
    }

    RcaResult {
        line_id: line_id.to_string(),
        root_cause: analyze_generic_failure(evidence),
        analysis_details: "no mapped issue code present; generic analysis applied".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_issue_returns_its_recommendation() {
        let evidence = AnalysisEvidence::default();
        let result = analyze("L1", &["SANCTIONED".to_string()], &evidence);
        assert_eq!(result.root_cause.issue_code, "SANCTIONED");
        assert_eq!(result.root_cause.severity, Severity::Critical);
        assert_eq!(result.root_cause.confidence, 0.5);
    }

    #[test]
    fn confidence_boosts_when_issue_in_pdr_issues_list() {
        let evidence = AnalysisEvidence {
            has_pdr_result: true,
            pdr_issues: vec!["INVALID_IFSC".to_string()],
            ..Default::default()
        };
        let result = analyze("L1", &["INVALID_IFSC".to_string()], &evidence);
        assert_eq!(result.root_cause.confidence, 0.9);
    }

    #[test]
    fn confidence_accumulates_from_available_evidence() {
        let evidence = AnalysisEvidence {
            has_pdr_result: true,
            has_acc_decision: true,
            has_invoice_data: true,
            ..Default::default()
        };
        let result = analyze("L1", &["BANK_UNAVAILABLE".to_string()], &evidence);
        assert_eq!(result.root_cause.confidence, 1.0);
    }

    #[test]
    fn unmapped_issue_with_pdr_channel_falls_back_to_rail_failure() {
        let evidence = AnalysisEvidence {
            pdr_channel: Some("NEFT".to_string()),
            ..Default::default()
        };
        let result = analyze("L1", &["SOMETHING_UNKNOWN".to_string()], &evidence);
        assert_eq!(result.root_cause.issue_code, "RAIL_FAILURE");
        assert!(result.root_cause.recommendation.contains("NEFT"));
    }

    #[test]
    fn no_issues_and_no_channel_falls_back_to_unknown() {
        let evidence = AnalysisEvidence::default();
        let result = analyze("L1", &[], &evidence);
        assert_eq!(result.root_cause.issue_code, "UNKNOWN_FAILURE");
    }
}
