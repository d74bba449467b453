//! Agent 4: Synthesizer. Combines the Proposer, Critic, and Auditor
//! artifacts into one human-readable packet — the last thing this pipeline
//! produces on its own authority. Nothing downstream is binding.
//!
//! Rule (§4.7): a constitutional failure forces `REJECT`. A Critic
//! `REJECT` forces `REJECT`. A Critic `CAUTION` forces `DEFER`. Otherwise
//! `APPROVE` iff proposal confidence > 0.65, else `DEFER`.

use crate::schemas::{
    Audit, CriticRecommendation, Criticism, FinalRecommendation, Proposal, RawProposal, Synthesis,
};

const APPROVE_CONFIDENCE_THRESHOLD: f64 = 0.65;

fn determine_recommendation(confidence: f64, criticism: &Criticism, audit: &Audit) -> FinalRecommendation {
    if !audit.constitution_passed {
        return FinalRecommendation::Reject;
    }
    if criticism.recommendation == CriticRecommendation::Reject {
        return FinalRecommendation::Reject;
    }
    if criticism.recommendation == CriticRecommendation::Caution {
        return FinalRecommendation::Defer;
    }
    if confidence > APPROVE_CONFIDENCE_THRESHOLD {
        FinalRecommendation::Approve
    } else {
        FinalRecommendation::Defer
    }
}

fn build_summary(
    proposal_type_name: &str,
    symbol_count: usize,
    confidence: f64,
    criticism: &Criticism,
    audit: &Audit,
    recommendation: FinalRecommendation,
) -> String {
    format!(
        "{proposal_type_name} proposal touching {symbol_count} symbol(s), confidence {confidence:.2}, critic={:?}, constitution_passed={} -> {recommendation:?}",
        criticism.recommendation, audit.constitution_passed,
    )
}

fn build_key_risks(risk_notes: &str, criticism: &Criticism, audit: &Audit) -> Vec<String> {
    let mut risks = Vec::new();

    for violation in &audit.violations {
        risks.push(format!("{:?}: {}", violation.severity, violation.violation));
    }
    risks.extend(criticism.criticisms.iter().cloned());
    if !criticism.counter_evidence.is_empty() {
        risks.push(criticism.counter_evidence.clone());
    }
    if !risk_notes.is_empty() {
        risks.push(risk_notes.to_string());
    }

    risks
}

fn synthesize_named(
    proposal_id: &str,
    proposal_type_name: &str,
    symbol_count: usize,
    confidence: f64,
    risk_notes: &str,
    criticism: &Criticism,
    audit: &Audit,
) -> Synthesis {
    let final_recommendation = determine_recommendation(confidence, criticism, audit);
    let summary = build_summary(
        proposal_type_name,
        symbol_count,
        confidence,
        criticism,
        audit,
        final_recommendation,
    );
    let key_risks = build_key_risks(risk_notes, criticism, audit);

    Synthesis {
        proposal_id: proposal_id.to_string(),
        summary,
        key_risks,
        final_recommendation,
        confidence,
    }
}

pub fn synthesize(proposal: &Proposal, criticism: &Criticism, audit: &Audit) -> Synthesis {
    synthesize_named(
        &proposal.proposal_id,
        proposal.proposal_type.as_str(),
        proposal.symbols.len(),
        proposal.confidence,
        &proposal.risk_notes,
        criticism,
        audit,
    )
}

/// Synthesizes a proposal whose `proposal_type` arrived as a plain string
/// — see [`crate::schemas::RawProposal`]. A forbidden type like
/// `"EXECUTE_TRADE"` always carries a failed [`Audit`], so
/// `determine_recommendation` rejects it here regardless of the Critic's
/// recommendation or the proposal's confidence.
pub fn synthesize_raw(proposal: &RawProposal, criticism: &Criticism, audit: &Audit) -> Synthesis {
    synthesize_named(
        &proposal.proposal_id,
        &proposal.proposal_type,
        proposal.symbols.len(),
        proposal.confidence,
        &proposal.risk_notes,
        criticism,
        audit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{ConstitutionalViolation, Environment, ProposalEvidence, ProposalType, ViolationSeverity};
    use chrono::Utc;

    fn proposal(confidence: f64) -> Proposal {
        Proposal::new(
            "p1".to_string(),
            Environment::Paper,
            ProposalType::AddSymbols,
            vec!["BTC".to_string()],
            "strong momentum over the lookback window".to_string(),
            ProposalEvidence::default(),
            "standard sizing applies".to_string(),
            confidence,
            Utc::now(),
        )
    }

    fn clean_audit() -> Audit {
        Audit {
            proposal_id: "p1".to_string(),
            constitution_passed: true,
            violations: Vec::new(),
        }
    }

    fn criticism(recommendation: CriticRecommendation) -> Criticism {
        Criticism {
            proposal_id: "p1".to_string(),
            criticisms: Vec::new(),
            counter_evidence: String::new(),
            recommendation,
        }
    }

    #[test]
    fn constitutional_failure_always_rejects() {
        let p = proposal(0.9);
        let a = Audit {
            proposal_id: "p1".to_string(),
            constitution_passed: false,
            violations: vec![ConstitutionalViolation {
                rule_name: "forbidden_language".to_string(),
                violation: "contains 'bypass'".to_string(),
                severity: ViolationSeverity::Critical,
            }],
        };
        let s = synthesize(&p, &criticism(CriticRecommendation::Proceed), &a);
        assert_eq!(s.final_recommendation, FinalRecommendation::Reject);
        assert!(!s.key_risks.is_empty());
    }

    #[test]
    fn critic_reject_forces_reject_even_with_clean_audit() {
        let p = proposal(0.9);
        let s = synthesize(&p, &criticism(CriticRecommendation::Reject), &clean_audit());
        assert_eq!(s.final_recommendation, FinalRecommendation::Reject);
    }

    #[test]
    fn critic_caution_forces_defer() {
        let p = proposal(0.9);
        let s = synthesize(&p, &criticism(CriticRecommendation::Caution), &clean_audit());
        assert_eq!(s.final_recommendation, FinalRecommendation::Defer);
    }

    #[test]
    fn high_confidence_clean_proposal_approves() {
        let p = proposal(0.7);
        let s = synthesize(&p, &criticism(CriticRecommendation::Proceed), &clean_audit());
        assert_eq!(s.final_recommendation, FinalRecommendation::Approve);
    }

    #[test]
    fn low_confidence_clean_proposal_defers() {
        let p = proposal(0.5);
        let s = synthesize(&p, &criticism(CriticRecommendation::Proceed), &clean_audit());
        assert_eq!(s.final_recommendation, FinalRecommendation::Defer);
    }

    #[test]
    fn confidence_exactly_at_threshold_defers() {
        let p = proposal(0.65);
        let s = synthesize(&p, &criticism(CriticRecommendation::Proceed), &clean_audit());
        assert_eq!(s.final_recommendation, FinalRecommendation::Defer);
    }

    #[test]
    fn forbidden_proposal_type_rejects_via_raw_path() {
        let raw = RawProposal {
            proposal_id: "p1".to_string(),
            environment: Environment::Paper,
            proposal_type: "EXECUTE_TRADE".to_string(),
            symbols: vec!["BTC".to_string()],
            rationale: "strong momentum over the lookback window".to_string(),
            evidence: ProposalEvidence::default(),
            risk_notes: String::new(),
            confidence: 0.95,
            non_binding: true,
            created_at_utc: Utc::now(),
        };
        let a = Audit {
            proposal_id: "p1".to_string(),
            constitution_passed: false,
            violations: vec![ConstitutionalViolation {
                rule_name: "forbidden_proposal_type".to_string(),
                violation: "proposal_type 'EXECUTE_TRADE' is forbidden by constitution".to_string(),
                severity: ViolationSeverity::Critical,
            }],
        };
        let s = synthesize_raw(&raw, &criticism(CriticRecommendation::Proceed), &a);
        assert_eq!(s.final_recommendation, FinalRecommendation::Reject);
    }
}
