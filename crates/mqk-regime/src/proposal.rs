//! Stage 3: turn a confirmed drift into a non-binding governance proposal.
//!
//! The Drift Detector never changes regime directly (§4.5) — it hands off
//! to [`mqk_governance`]'s pipeline exactly the way the Universe Scorer and
//! any other caller would: build a `Proposal`, let the constitutional
//! pipeline run over it, require a human approval artifact before anything
//! downstream treats it as real.

use chrono::{DateTime, Utc};
use mqk_governance::{Environment, Proposal, ProposalEvidence, ProposalType};
use uuid::Uuid;

use crate::types::{DriftDetectionResult, RegimeValidationContext};

/// Builds an `ADJUST_RULE` proposal recommending the regime be treated as
/// drifted. Returns `None` when drift was not confirmed — callers must not
/// propose anything off a result where `drift_detected` is false.
pub fn drift_to_governance_proposal(
    ctx: &RegimeValidationContext,
    drift: &DriftDetectionResult,
    environment: Environment,
    proposal_id: Uuid,
    now: DateTime<Utc>,
) -> Option<Proposal> {
    if !drift.drift_detected {
        return None;
    }

    let rationale = format!(
        "regime drift confirmed for scope '{}': all five drift conditions held ({})",
        ctx.scope,
        drift
            .conditions
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let risk_notes = format!(
        "suggested_regime={:?}; current={:?}; confidence={:.2}{}",
        drift.suggested_regime,
        ctx.current_regime,
        drift.confidence,
        if drift.emergency_override {
            "; emergency drawdown override was active for dwell time"
        } else {
            ""
        }
    );

    let evidence = ProposalEvidence {
        missed_signals: 0,
        scan_starvation: Vec::new(),
        performance_notes: format!(
            "duration_hours={:.1} volatility={:.1} drawdown={:.1}",
            ctx.current_regime_duration_hours, ctx.volatility, ctx.drawdown
        ),
        dead_symbols: Vec::new(),
    };

    Some(Proposal::new(
        proposal_id.to_string(),
        environment,
        ProposalType::AdjustRule,
        Vec::new(),
        rationale,
        evidence,
        risk_notes,
        drift.confidence,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DriftCondition, ExternalVerdict, Regime};

    fn ctx() -> RegimeValidationContext {
        RegimeValidationContext {
            scope: "crypto-binance-spot".to_string(),
            current_regime: Some(Regime::RiskOn),
            current_regime_confidence: 0.9,
            recalculated_regime: Some(Regime::Panic),
            recalculated_confidence: 0.8,
            external_verdict: Some(ExternalVerdict {
                verdict_type: "REGIME_QUESTIONABLE".to_string(),
                regime_confidence: 0.5,
            }),
            cross_asset_regime: None,
            volatility: 90.0,
            volatility_percentile: 95.0,
            drawdown: -5.0,
            current_regime_duration_hours: 100.0,
            historical_regime_durations: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            num_external_sources: 6,
            entry_volatility: 10.0,
        }
    }

    fn confirmed_drift() -> DriftDetectionResult {
        DriftDetectionResult {
            drift_detected: true,
            conditions: vec![DriftCondition {
                name: "external_confidence_delta",
                met: true,
                reason: "delta=0.4 > 0.25".to_string(),
            }],
            suggested_regime: Some(Regime::Panic),
            confidence: 0.72,
            emergency_override: false,
        }
    }

    #[test]
    fn no_drift_yields_no_proposal() {
        let mut drift = confirmed_drift();
        drift.drift_detected = false;
        let p = drift_to_governance_proposal(&ctx(), &drift, Environment::Paper, Uuid::nil(), Utc::now());
        assert!(p.is_none());
    }

    #[test]
    fn confirmed_drift_yields_non_binding_adjust_rule_proposal() {
        let p = drift_to_governance_proposal(&ctx(), &confirmed_drift(), Environment::Paper, Uuid::nil(), Utc::now())
            .unwrap();
        assert_eq!(p.proposal_type, ProposalType::AdjustRule);
        assert!(p.non_binding);
        assert_eq!(p.confidence, 0.72);
        assert!(p.rationale.contains("crypto-binance-spot"));
    }
}
