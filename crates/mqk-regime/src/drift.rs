//! Stage 2: five-condition AND-logic drift detector.
//!
//! Drift is declared ONLY if all five conditions hold simultaneously:
//! 1. External confidence delta > 0.25
//! 2. Minimum dwell time satisfied (or emergency drawdown override)
//! 3. Historical duration anomaly (>= 80th percentile)
//! 4. Volatility regime shift confirmed
//! 5. At least 5 independent external sources used
//!
//! If any condition fails, no drift and no proposal. Intentionally
//! conservative.

use crate::alignment::{duration_percentile, volatility_shift_detected};
use crate::types::{DriftCondition, DriftDetectionResult, RegimeValidationContext, RegimeValidationScores};

pub const CONFIDENCE_DELTA_THRESHOLD: f64 = 0.25;
pub const DURATION_PERCENTILE_THRESHOLD: f64 = 80.0;
pub const MIN_EXTERNAL_SOURCES: u32 = 5;

pub fn min_dwell_hours(scope_type: &str) -> f64 {
    match scope_type {
        "crypto" => 4.0,
        "swing" => 72.0,
        _ => 4.0,
    }
}

/// Emergency drawdown override (crypto only): bypasses the dwell-time
/// requirement when drawdown is below this threshold.
pub const EMERGENCY_DRAWDOWN_THRESHOLD: f64 = -25.0;

pub fn detect(
    ctx: &RegimeValidationContext,
    validation_scores: &RegimeValidationScores,
    scope_type: &str,
) -> DriftDetectionResult {
    let mut conditions = Vec::with_capacity(5);
    let mut emergency = false;

    // 1. External confidence delta > 0.25
    let phase_f_confidence = ctx
        .external_verdict
        .as_ref()
        .map(|v| v.regime_confidence)
        .unwrap_or(0.5);
    let delta = (ctx.current_regime_confidence - phase_f_confidence).abs();
    let delta_met = delta > CONFIDENCE_DELTA_THRESHOLD;
    conditions.push(DriftCondition {
        name: "external_confidence_delta",
        met: delta_met,
        reason: format!(
            "delta={delta:.3} {} {CONFIDENCE_DELTA_THRESHOLD}",
            if delta_met { ">" } else { "<=" }
        ),
    });

    // 2. Minimum dwell satisfied (emergency override for crypto)
    let min_dwell = min_dwell_hours(scope_type);
    let duration = ctx.current_regime_duration_hours;
    let mut dwell_met = duration >= min_dwell;
    if scope_type == "crypto" && ctx.drawdown < EMERGENCY_DRAWDOWN_THRESHOLD {
        dwell_met = true;
        emergency = true;
    }
    conditions.push(DriftCondition {
        name: "minimum_dwell",
        met: dwell_met,
        reason: format!(
            "duration={duration:.1}h {} {min_dwell}h{}",
            if dwell_met { ">=" } else { "<" },
            if emergency { " [EMERGENCY OVERRIDE]" } else { "" }
        ),
    });

    // 3. Historical duration anomaly (>= 80th percentile)
    let pct = duration_percentile(
        ctx.current_regime_duration_hours,
        &ctx.historical_regime_durations,
    );
    let duration_anomaly = pct >= DURATION_PERCENTILE_THRESHOLD;
    conditions.push(DriftCondition {
        name: "duration_anomaly",
        met: duration_anomaly,
        reason: format!(
            "percentile={pct:.1}% {} {DURATION_PERCENTILE_THRESHOLD}%",
            if duration_anomaly { ">" } else { "<=" }
        ),
    });

    // 4. Volatility regime shift confirmed
    let vol_shifted = volatility_shift_detected(ctx.entry_volatility, ctx.volatility);
    conditions.push(DriftCondition {
        name: "volatility_shift",
        met: vol_shifted,
        reason: if vol_shifted {
            format!(
                "vol shifted from {:.1}% to {:.1}%",
                ctx.entry_volatility, ctx.volatility
            )
        } else {
            format!(
                "vol stable at {:.1}% (same band as entry {:.1}%)",
                ctx.volatility, ctx.entry_volatility
            )
        },
    });

    // 5. At least 5 independent sources
    let enough_sources = ctx.num_external_sources >= MIN_EXTERNAL_SOURCES;
    conditions.push(DriftCondition {
        name: "minimum_sources",
        met: enough_sources,
        reason: format!(
            "sources={} {} {MIN_EXTERNAL_SOURCES}",
            ctx.num_external_sources,
            if enough_sources { ">=" } else { "<" }
        ),
    });

    let all_met = conditions.iter().all(|c| c.met);
    let suggested = if all_met { ctx.recalculated_regime } else { None };

    let met_count = conditions.iter().filter(|c| c.met).count();
    let confidence = if all_met {
        (met_count as f64 / conditions.len() as f64) * validation_scores.drift_score
    } else {
        0.0
    };

    DriftDetectionResult {
        drift_detected: all_met,
        conditions,
        suggested_regime: suggested,
        confidence: (confidence * 10_000.0).round() / 10_000.0,
        emergency_override: emergency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExternalVerdict, Regime::*};

    fn base_ctx() -> RegimeValidationContext {
        RegimeValidationContext {
            scope: "crypto-binance-spot".to_string(),
            current_regime: Some(RiskOn),
            current_regime_confidence: 0.9,
            recalculated_regime: Some(Panic),
            recalculated_confidence: 0.8,
            external_verdict: Some(ExternalVerdict {
                verdict_type: "REGIME_QUESTIONABLE".to_string(),
                regime_confidence: 0.5,
            }),
            cross_asset_regime: None,
            volatility: 90.0,
            volatility_percentile: 95.0,
            drawdown: -5.0,
            current_regime_duration_hours: 10.0,
            historical_regime_durations: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            num_external_sources: 6,
            entry_volatility: 10.0,
        }
    }

    fn scores() -> RegimeValidationScores {
        RegimeValidationScores {
            internal_score: 0.1,
            external_score: 0.3,
            drift_score: 0.9,
            cross_asset_score: 0.5,
        }
    }

    #[test]
    fn all_five_conditions_met_confirms_drift() {
        let result = detect(&base_ctx(), &scores(), "crypto");
        assert!(result.drift_detected);
        assert_eq!(result.suggested_regime, Some(Panic));
        assert!(!result.emergency_override);
    }

    #[test]
    fn missing_one_condition_blocks_drift() {
        let mut ctx = base_ctx();
        ctx.num_external_sources = 2; // fails condition 5
        let result = detect(&ctx, &scores(), "crypto");
        assert!(!result.drift_detected);
        assert_eq!(result.suggested_regime, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn emergency_drawdown_overrides_dwell_for_crypto() {
        let mut ctx = base_ctx();
        ctx.current_regime_duration_hours = 0.5; // below the 4h minimum
        ctx.drawdown = -30.0; // below EMERGENCY_DRAWDOWN_THRESHOLD
        let result = detect(&ctx, &scores(), "crypto");
        assert!(result.conditions[1].met);
        assert!(result.emergency_override);
    }

    #[test]
    fn emergency_override_does_not_apply_outside_crypto() {
        let mut ctx = base_ctx();
        ctx.current_regime_duration_hours = 0.5;
        ctx.drawdown = -30.0;
        let result = detect(&ctx, &scores(), "swing");
        assert!(!result.conditions[1].met);
        assert!(!result.emergency_override);
    }

    #[test]
    fn swing_scope_uses_72_hour_dwell() {
        assert_eq!(min_dwell_hours("swing"), 72.0);
        assert_eq!(min_dwell_hours("crypto"), 4.0);
    }
}
