//! Stage 4: sequential, first-failure-wins guardrails gating whether a
//! drift-confirmed regime change may actually be applied.
//!
//! Five checks, in order: cooldown/minimum dwell, liquidity, Phase F data
//! sufficiency, external disagreement cap, max flips per week. Any failure
//! blocks with `REGIME_CHANGE_DEFERRED` and short-circuits the remaining
//! checks.

use chrono::Utc;

use crate::drift::{min_dwell_hours, EMERGENCY_DRAWDOWN_THRESHOLD};
use crate::types::{DriftCondition, GuardrailVerdict, RegimeChangeProposal, RegimeRunState};

pub const MAX_FLIPS_PER_WEEK: usize = 2;
pub const MAX_EXTERNAL_DISAGREEMENT: f64 = 0.40;

pub fn check_proposal(
    proposal: &RegimeChangeProposal,
    run_state: &RegimeRunState,
    current_drawdown: f64,
) -> GuardrailVerdict {
    let mut checks = Vec::new();

    // 1. Cooldown / minimum dwell time.
    let emergency = proposal.scope_type == "crypto" && current_drawdown < EMERGENCY_DRAWDOWN_THRESHOLD;
    let min_dwell = min_dwell_hours(&proposal.scope_type);
    let duration_hours = (Utc::now() - run_state.regime_entered_utc).num_seconds() as f64 / 3600.0;
    let dwell_ok = duration_hours >= min_dwell || emergency;
    checks.push(DriftCondition {
        name: "cooldown_dwell",
        met: dwell_ok,
        reason: format!(
            "duration={duration_hours:.1}h {} {min_dwell}h{}",
            if dwell_ok { ">=" } else { "<" },
            if emergency { " [EMERGENCY OVERRIDE]" } else { "" }
        ),
    });
    if !dwell_ok {
        return blocked(
            format!("REGIME_CHANGE_DEFERRED: minimum dwell not met (duration={duration_hours:.1}h < {min_dwell}h)"),
            checks,
        );
    }

    // 2. Insufficient liquidity.
    let liquidity_ok = !proposal.low_liquidity;
    checks.push(DriftCondition {
        name: "liquidity",
        met: liquidity_ok,
        reason: if liquidity_ok {
            "liquidity sufficient".to_string()
        } else {
            "low liquidity flagged".to_string()
        },
    });
    if !liquidity_ok {
        return blocked(
            "REGIME_CHANGE_DEFERRED: insufficient liquidity".to_string(),
            checks,
        );
    }

    // 3. Phase F data sufficiency.
    let data_sufficient = !matches!(
        proposal.phase_f_verdict_type.as_deref(),
        None | Some("INSUFFICIENT_DATA")
    );
    checks.push(DriftCondition {
        name: "phase_f_data_sufficiency",
        met: data_sufficient,
        reason: format!(
            "phase_f_verdict_type={:?}",
            proposal.phase_f_verdict_type
        ),
    });
    if !data_sufficient {
        return blocked(
            "REGIME_CHANGE_DEFERRED: Phase F data insufficient".to_string(),
            checks,
        );
    }

    // 4. External disagreement threshold.
    let external_disagreement = 1.0 - proposal.cross_asset_score;
    let disagreement_ok = external_disagreement <= MAX_EXTERNAL_DISAGREEMENT;
    checks.push(DriftCondition {
        name: "external_disagreement",
        met: disagreement_ok,
        reason: format!(
            "disagreement {:.1}% {} {:.0}%",
            external_disagreement * 100.0,
            if disagreement_ok { "<=" } else { ">" },
            MAX_EXTERNAL_DISAGREEMENT * 100.0
        ),
    });
    if !disagreement_ok {
        return blocked(
            format!(
                "REGIME_CHANGE_DEFERRED: external disagreement {:.1}% > {:.0}%",
                external_disagreement * 100.0,
                MAX_EXTERNAL_DISAGREEMENT * 100.0
            ),
            checks,
        );
    }

    // 5. Maximum flips per week.
    let cutoff = Utc::now() - chrono::Duration::days(7);
    let flips = run_state
        .regime_changes_this_week
        .iter()
        .filter(|&&ts| ts >= cutoff)
        .count();
    let flips_ok = flips < MAX_FLIPS_PER_WEEK;
    checks.push(DriftCondition {
        name: "max_flips_per_week",
        met: flips_ok,
        reason: format!(
            "flips this week: {flips} {} {MAX_FLIPS_PER_WEEK}",
            if flips_ok { "<" } else { ">=" }
        ),
    });
    if !flips_ok {
        return blocked(
            format!("REGIME_CHANGE_DEFERRED: max regime flips per week reached ({flips})"),
            checks,
        );
    }

    GuardrailVerdict {
        approved: true,
        reason: "all guardrails passed".to_string(),
        checks,
    }
}

fn blocked(reason: String, checks: Vec<DriftCondition>) -> GuardrailVerdict {
    GuardrailVerdict {
        approved: false,
        reason,
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Regime;
    use chrono::Duration;

    fn proposal() -> RegimeChangeProposal {
        RegimeChangeProposal {
            scope_type: "crypto".to_string(),
            suggested_regime: Regime::Panic,
            phase_f_verdict_type: Some("REGIME_VALIDATED".to_string()),
            cross_asset_score: 0.8,
            low_liquidity: false,
        }
    }

    fn run_state(entered_hours_ago: i64) -> RegimeRunState {
        RegimeRunState {
            regime_entered_utc: Utc::now() - Duration::hours(entered_hours_ago),
            regime_changes_this_week: Vec::new(),
        }
    }

    #[test]
    fn all_guardrails_pass_approves() {
        let verdict = check_proposal(&proposal(), &run_state(10), -2.0);
        assert!(verdict.approved);
        assert_eq!(verdict.checks.len(), 5);
    }

    #[test]
    fn insufficient_dwell_blocks() {
        let verdict = check_proposal(&proposal(), &run_state(0), -2.0);
        assert!(!verdict.approved);
        assert!(verdict.reason.contains("minimum dwell"));
        assert_eq!(verdict.checks.len(), 1);
    }

    #[test]
    fn emergency_drawdown_bypasses_dwell() {
        let verdict = check_proposal(&proposal(), &run_state(0), -30.0);
        assert!(verdict.checks[0].met);
    }

    #[test]
    fn low_liquidity_blocks_after_dwell_passes() {
        let mut p = proposal();
        p.low_liquidity = true;
        let verdict = check_proposal(&p, &run_state(10), -2.0);
        assert!(!verdict.approved);
        assert!(verdict.reason.contains("liquidity"));
        assert_eq!(verdict.checks.len(), 2);
    }

    #[test]
    fn insufficient_phase_f_data_blocks() {
        let mut p = proposal();
        p.phase_f_verdict_type = Some("INSUFFICIENT_DATA".to_string());
        let verdict = check_proposal(&p, &run_state(10), -2.0);
        assert!(!verdict.approved);
        assert!(verdict.reason.contains("Phase F data insufficient"));
    }

    #[test]
    fn missing_phase_f_verdict_blocks() {
        let mut p = proposal();
        p.phase_f_verdict_type = None;
        let verdict = check_proposal(&p, &run_state(10), -2.0);
        assert!(!verdict.approved);
    }

    #[test]
    fn high_external_disagreement_blocks() {
        let mut p = proposal();
        p.cross_asset_score = 0.5; // disagreement 0.5 > 0.4
        let verdict = check_proposal(&p, &run_state(10), -2.0);
        assert!(!verdict.approved);
        assert!(verdict.reason.contains("external disagreement"));
    }

    #[test]
    fn max_flips_per_week_blocks() {
        let mut rs = run_state(10);
        rs.regime_changes_this_week = vec![Utc::now() - Duration::days(1), Utc::now() - Duration::days(2)];
        let verdict = check_proposal(&proposal(), &rs, -2.0);
        assert!(!verdict.approved);
        assert!(verdict.reason.contains("max regime flips"));
    }

    #[test]
    fn flips_older_than_a_week_are_pruned() {
        let mut rs = run_state(10);
        rs.regime_changes_this_week = vec![Utc::now() - Duration::days(10), Utc::now() - Duration::days(9)];
        let verdict = check_proposal(&proposal(), &rs, -2.0);
        assert!(verdict.approved);
    }
}
