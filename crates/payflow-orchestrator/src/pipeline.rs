//! Stage derivation: which downstream stages a line visits depends on its
//! ACC verdict. A failure partway through the PASS pipeline splices RCA in
//! ahead of the terminal CRRAK stage so every line, successful or not, ends
//! with a compliance/risk report.

use payflow_schemas::AccVerdict;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Pdr,
    Execute,
    Arl,
    Rca,
    Crrak,
}

pub fn derive_pipeline(verdict: AccVerdict) -> Vec<Stage> {
    match verdict {
        AccVerdict::Pass => vec![Stage::Pdr, Stage::Execute, Stage::Arl, Stage::Crrak],
        AccVerdict::Hold => vec![Stage::Pdr, Stage::Rca, Stage::Crrak],
        AccVerdict::Fail => vec![Stage::Rca, Stage::Crrak],
    }
}

/// Insert RCA ahead of the terminal CRRAK stage if it isn't already
/// present. Safe to call more than once; a second call is a no-op.
pub fn splice_rca_before_crrak(stages: &mut Vec<Stage>) {
    if stages.contains(&Stage::Rca) {
        return;
    }
    match stages.iter().position(|s| *s == Stage::Crrak) {
        Some(pos) => stages.insert(pos, Stage::Rca),
        None => {
            stages.push(Stage::Rca);
            stages.push(Stage::Crrak);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_runs_execution_and_reconciliation() {
        assert_eq!(
            derive_pipeline(AccVerdict::Pass),
            vec![Stage::Pdr, Stage::Execute, Stage::Arl, Stage::Crrak]
        );
    }

    #[test]
    fn hold_skips_execution_entirely() {
        assert_eq!(derive_pipeline(AccVerdict::Hold), vec![Stage::Pdr, Stage::Rca, Stage::Crrak]);
    }

    #[test]
    fn fail_skips_routing_entirely() {
        assert_eq!(derive_pipeline(AccVerdict::Fail), vec![Stage::Rca, Stage::Crrak]);
    }

    #[test]
    fn splice_inserts_rca_immediately_before_crrak() {
        let mut stages = vec![Stage::Pdr, Stage::Execute, Stage::Arl, Stage::Crrak];
        splice_rca_before_crrak(&mut stages);
        assert_eq!(stages, vec![Stage::Pdr, Stage::Execute, Stage::Arl, Stage::Rca, Stage::Crrak]);
    }

    #[test]
    fn splice_is_idempotent() {
        let mut stages = vec![Stage::Pdr, Stage::Rca, Stage::Crrak];
        splice_rca_before_crrak(&mut stages);
        assert_eq!(stages, vec![Stage::Pdr, Stage::Rca, Stage::Crrak]);
    }
}
