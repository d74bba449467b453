//! Agent 3: Auditor. Runs the constitution against the proposal and
//! nothing else — no market data, no opinion on whether the proposal is a
//! good idea, only whether it is a constitutionally legal one.

use crate::constitution::{validate_proposal, validate_proposal_raw};
use crate::schemas::{Audit, ConstitutionalViolation, Proposal, RawProposal, ViolationSeverity};

fn rule_name_for(violation: &str) -> String {
    if violation.contains("is forbidden by constitution") {
        "forbidden_proposal_type".to_string()
    } else if violation.contains("is not an allowed type") {
        "invalid_proposal_type".to_string()
    } else if violation.contains("does not match the allowed pattern") {
        "symbol_format".to_string()
    } else if violation.contains("lists no symbols") {
        "symbol_presence".to_string()
    } else if violation.contains("exceeding the per-proposal limit") {
        "symbol_count_by_type".to_string()
    } else if violation.contains("exceeding the absolute limit") {
        "max_proposal_size".to_string()
    } else if violation.contains("forbidden word") {
        "forbidden_language".to_string()
    } else if violation.contains("auto-apply") {
        "no_auto_apply".to_string()
    } else if violation.contains("non_binding") {
        "non_binding_invariant".to_string()
    } else {
        "unclassified".to_string()
    }
}

fn severity_for(rule_name: &str) -> ViolationSeverity {
    match rule_name {
        "non_binding_invariant" | "no_auto_apply" | "forbidden_language" | "forbidden_proposal_type" => {
            ViolationSeverity::Critical
        }
        "max_proposal_size" | "symbol_count_by_type" | "invalid_proposal_type" => {
            ViolationSeverity::Major
        }
        _ => ViolationSeverity::Minor,
    }
}

fn violations_from(raw_violations: Vec<String>) -> Vec<ConstitutionalViolation> {
    raw_violations
        .into_iter()
        .map(|violation| {
            let rule_name = rule_name_for(&violation);
            let severity = severity_for(&rule_name);
            ConstitutionalViolation {
                rule_name,
                violation,
                severity,
            }
        })
        .collect()
}

pub fn audit(proposal: &Proposal) -> Audit {
    let violations = violations_from(validate_proposal(proposal));
    Audit {
        proposal_id: proposal.proposal_id.clone(),
        constitution_passed: violations.is_empty(),
        violations,
    }
}

/// Audits a proposal whose `proposal_type` arrived as a plain string
/// rather than [`crate::schemas::ProposalType`] — the only path that can
/// ever surface a forbidden type like `"EXECUTE_TRADE"` to the
/// constitution, since nothing built through [`Proposal::new`] can carry
/// one. Zero market analysis here, same as [`audit`]: only whether the
/// proposal is constitutionally legal.
pub fn audit_raw(proposal: &RawProposal) -> Audit {
    let violations = violations_from(validate_proposal_raw(proposal));
    Audit {
        proposal_id: proposal.proposal_id.clone(),
        constitution_passed: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Environment, ProposalEvidence, ProposalType};
    use chrono::Utc;

    #[test]
    fn clean_proposal_passes_the_constitution() {
        let p = Proposal::new(
            "p1".to_string(),
            Environment::Paper,
            ProposalType::AddSymbols,
            vec!["BTC".to_string()],
            "strong momentum over the lookback window".to_string(),
            ProposalEvidence::default(),
            "standard sizing applies".to_string(),
            0.6,
            Utc::now(),
        );
        let a = audit(&p);
        assert!(a.constitution_passed);
        assert!(a.violations.is_empty());
    }

    #[test]
    fn forbidden_word_surfaces_as_critical() {
        let p = Proposal::new(
            "p1".to_string(),
            Environment::Paper,
            ProposalType::AdjustRule,
            vec!["BTC".to_string()],
            "bypass the cooldown entirely".to_string(),
            ProposalEvidence::default(),
            String::new(),
            0.6,
            Utc::now(),
        );
        let a = audit(&p);
        assert!(!a.constitution_passed);
        assert!(a
            .violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Critical));
    }

    #[test]
    fn execute_the_trade_rationale_is_flagged_critical() {
        let p = Proposal::new(
            "p1".to_string(),
            Environment::Paper,
            ProposalType::AdjustRule,
            vec!["BTC".to_string()],
            "execute the trade as soon as the signal confirms".to_string(),
            ProposalEvidence::default(),
            String::new(),
            0.6,
            Utc::now(),
        );
        let a = audit(&p);
        assert!(!a.constitution_passed);
        assert!(a
            .violations
            .iter()
            .any(|v| v.rule_name == "forbidden_language" && v.severity == ViolationSeverity::Critical));
    }

    #[test]
    fn inject_language_is_flagged_critical() {
        let p = Proposal::new(
            "p1".to_string(),
            Environment::Paper,
            ProposalType::AdjustThreshold,
            vec!["BTC".to_string()],
            "inject a tighter threshold for the next cycle".to_string(),
            ProposalEvidence::default(),
            String::new(),
            0.6,
            Utc::now(),
        );
        let a = audit(&p);
        assert!(!a.constitution_passed);
        assert!(a
            .violations
            .iter()
            .any(|v| v.rule_name == "forbidden_language" && v.severity == ViolationSeverity::Critical));
    }

    /// §8 scenario 6: a proposal with `proposal_type = "EXECUTE_TRADE"` must
    /// yield `constitution_passed = false` with a CRITICAL violation.
    #[test]
    fn scenario_6_execute_trade_proposal_type_is_critical() {
        let raw = RawProposal {
            proposal_id: "p1".to_string(),
            environment: Environment::Paper,
            proposal_type: "EXECUTE_TRADE".to_string(),
            symbols: vec!["BTC".to_string()],
            rationale: "strong momentum over the lookback window".to_string(),
            evidence: ProposalEvidence::default(),
            risk_notes: String::new(),
            confidence: 0.9,
            non_binding: true,
            created_at_utc: Utc::now(),
        };
        let a = audit_raw(&raw);
        assert!(!a.constitution_passed);
        assert!(a
            .violations
            .iter()
            .any(|v| v.rule_name == "forbidden_proposal_type" && v.severity == ViolationSeverity::Critical));

        let criticism = crate::agents::critic::critique_raw(&raw, &crate::agents::critic::CritiqueContext::default());
        let synthesis = crate::agents::synthesizer::synthesize_raw(&raw, &criticism, &a);
        assert_eq!(synthesis.final_recommendation, crate::schemas::FinalRecommendation::Reject);
    }

    #[test]
    fn unknown_proposal_type_name_is_major() {
        let raw = RawProposal {
            proposal_id: "p1".to_string(),
            environment: Environment::Paper,
            proposal_type: "RESIZE_POSITIONS".to_string(),
            symbols: vec!["BTC".to_string()],
            rationale: "strong momentum over the lookback window".to_string(),
            evidence: ProposalEvidence::default(),
            risk_notes: String::new(),
            confidence: 0.9,
            non_binding: true,
            created_at_utc: Utc::now(),
        };
        let a = audit_raw(&raw);
        assert!(!a.constitution_passed);
        assert!(a
            .violations
            .iter()
            .any(|v| v.rule_name == "invalid_proposal_type" && v.severity == ViolationSeverity::Major));
    }
}
