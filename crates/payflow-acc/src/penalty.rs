/// Fixed per-code weights for `compliance_penalty`/`risk_score` derivation.
/// Unmatched codes fall back to a generic minor-violation weight so every
/// violation contributes something observable to the score.
const WEIGHTS: &[(&str, u8, u8)] = &[
    // (substring, compliance_penalty, risk_score)
    ("SANCTION", 80, 90),
    ("LIMIT_EXCEEDED", 40, 35),
    ("INVALID_BENEFICIARY", 50, 45),
    ("POLICY_UNAVAILABLE", 20, 20),
    ("NAME_MISMATCH", 15, 10),
    ("KYC", 25, 20),
];

const DEFAULT_WEIGHT: (u8, u8) = (10, 10);

/// Sum per-code weights across all violations, clamped to `[0, 100]`.
pub fn score_violations(violations: &[String]) -> (u8, u8) {
    let mut penalty: u32 = 0;
    let mut risk: u32 = 0;
    for v in violations {
        let (p, r) = WEIGHTS
            .iter()
            .find(|(tag, _, _)| v.contains(tag))
            .map(|(_, p, r)| (*p, *r))
            .unwrap_or(DEFAULT_WEIGHT);
        penalty += p as u32;
        risk += r as u32;
    }
    (penalty.min(100) as u8, risk.min(100) as u8)
}
