//! Stage 1: compute the four validation scores and determine a verdict.
//!
//! Conservative by design — defaults to `RegimeValidated` when uncertain,
//! and only declares drift when internal agreement is low AND the
//! composite drift score is high.

use crate::alignment::{duration_percentile, regime_agreement_score, volatility_shift_detected};
use crate::types::{
    RegimeValidationContext, RegimeValidationResult, RegimeValidationScores, ValidationVerdict,
};

pub fn validate(ctx: &RegimeValidationContext, run_id: &str) -> RegimeValidationResult {
    if ctx.current_regime.is_none() && ctx.recalculated_regime.is_none() {
        return RegimeValidationResult {
            run_id: run_id.to_string(),
            scope: ctx.scope.clone(),
            current_regime: ctx.current_regime,
            recalculated_regime: ctx.recalculated_regime,
            scores: RegimeValidationScores {
                internal_score: 0.5,
                external_score: 0.5,
                drift_score: 0.0,
                cross_asset_score: 0.5,
            },
            verdict: ValidationVerdict::RegimeInsufficientData,
            reason: "no regime data available".to_string(),
        };
    }

    if ctx.recalculated_regime.is_none() {
        return RegimeValidationResult {
            run_id: run_id.to_string(),
            scope: ctx.scope.clone(),
            current_regime: ctx.current_regime,
            recalculated_regime: ctx.recalculated_regime,
            scores: RegimeValidationScores {
                internal_score: 0.5,
                external_score: 0.5,
                drift_score: 0.0,
                cross_asset_score: 0.5,
            },
            verdict: ValidationVerdict::RegimeInsufficientData,
            reason: "could not recalculate regime from data".to_string(),
        };
    }

    let internal = regime_agreement_score(ctx.current_regime, ctx.recalculated_regime);
    let external = compute_external_score(ctx);
    let drift = compute_drift_score(ctx);
    let cross_asset = compute_cross_asset_score(ctx);

    let scores = RegimeValidationScores {
        internal_score: round4(internal),
        external_score: round4(external),
        drift_score: round4(drift),
        cross_asset_score: round4(cross_asset),
    };

    let verdict = determine_verdict(&scores);

    RegimeValidationResult {
        run_id: run_id.to_string(),
        scope: ctx.scope.clone(),
        current_regime: ctx.current_regime,
        recalculated_regime: ctx.recalculated_regime,
        scores,
        verdict,
        reason: verdict_reason(verdict, &scores),
    }
}

/// Phase F verdict confidence mapped to [0, 1].
fn compute_external_score(ctx: &RegimeValidationContext) -> f64 {
    let Some(v) = &ctx.external_verdict else {
        return 0.5;
    };
    let base = match v.verdict_type.as_str() {
        "REGIME_VALIDATED" => 0.85,
        "POSSIBLE_STRUCTURAL_SHIFT_OBSERVE" => 0.50,
        "REGIME_QUESTIONABLE" => 0.30,
        "HIGH_NOISE_NO_ACTION" => 0.20,
        _ => 0.5,
    };
    let score = base * 0.6 + v.regime_confidence * 0.4;
    score.clamp(0.0, 1.0)
}

/// Composite drift signal: regime disagreement (50%), duration anomaly
/// (30%), volatility shift (20%). Higher = more evidence of drift.
fn compute_drift_score(ctx: &RegimeValidationContext) -> f64 {
    let agreement = regime_agreement_score(ctx.current_regime, ctx.recalculated_regime);
    let disagreement = 1.0 - agreement;

    let pct = duration_percentile(
        ctx.current_regime_duration_hours,
        &ctx.historical_regime_durations,
    );
    let duration_anomaly = ((pct - 50.0) / 50.0).max(0.0);

    let vol_shifted = volatility_shift_detected(ctx.entry_volatility, ctx.volatility);

    let total = disagreement * 0.5 + duration_anomaly * 0.3 + if vol_shifted { 0.2 } else { 0.0 };
    total.min(1.0)
}

/// Agreement between internal regime and cross-asset regime.
fn compute_cross_asset_score(ctx: &RegimeValidationContext) -> f64 {
    if ctx.cross_asset_regime.is_none() {
        return 0.5;
    }
    regime_agreement_score(ctx.current_regime, ctx.cross_asset_regime)
}

fn determine_verdict(scores: &RegimeValidationScores) -> ValidationVerdict {
    if scores.internal_score >= 0.6 && scores.drift_score < 0.4 {
        return ValidationVerdict::RegimeValidated;
    }
    if scores.internal_score < 0.5 && scores.drift_score >= 0.5 {
        return ValidationVerdict::RegimeDriftDetected;
    }
    ValidationVerdict::RegimeUncertain
}

fn verdict_reason(verdict: ValidationVerdict, scores: &RegimeValidationScores) -> String {
    match verdict {
        ValidationVerdict::RegimeValidated => format!(
            "internal_score {:.2} >= 0.6 and drift_score {:.2} < 0.4",
            scores.internal_score, scores.drift_score
        ),
        ValidationVerdict::RegimeDriftDetected => format!(
            "internal_score {:.2} < 0.5 and drift_score {:.2} >= 0.5",
            scores.internal_score, scores.drift_score
        ),
        ValidationVerdict::RegimeUncertain => "no conservative rule matched".to_string(),
        ValidationVerdict::RegimeInsufficientData => "insufficient regime data".to_string(),
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
