//! Helper functions shared by the validator (Stage 1) and drift detector
//! (Stage 2): cross-asset agreement, historical duration analysis, and
//! volatility band shifts.

use crate::types::Regime;

/// Distance between two regimes on the risk_on→neutral→risk_off→panic
/// ladder. `None` on either side is treated as a moderate (2) distance.
pub fn regime_distance(a: Option<Regime>, b: Option<Regime>) -> i32 {
    match (a, b) {
        (Some(a), Some(b)) => (a.rank() - b.rank()).abs(),
        _ => 2,
    }
}

/// Agreement score between two regimes: 1.0 identical, 0.6 adjacent, 0.3
/// two steps apart, 0.1 maximally different.
pub fn regime_agreement_score(a: Option<Regime>, b: Option<Regime>) -> f64 {
    match regime_distance(a, b) {
        0 => 1.0,
        1 => 0.6,
        2 => 0.3,
        3 => 0.1,
        _ => 0.5,
    }
}

/// Percentile rank (0-100) of `current_hours` against `history`. Returns 50
/// (assume median) when there's insufficient history (<3 samples).
pub fn duration_percentile(current_hours: f64, history: &[f64]) -> f64 {
    if history.len() < 3 {
        return 50.0;
    }
    let below = history.iter().filter(|&&d| d <= current_hours).count();
    (below as f64 / history.len() as f64) * 100.0
}

/// Volatility band boundaries (annualized %): low < 20, medium < 50, high < 80,
/// else extreme.
const VOL_BANDS: [(f64, &str); 3] = [(20.0, "low"), (50.0, "medium"), (80.0, "high")];

pub fn volatility_band(vol: f64) -> &'static str {
    for (threshold, label) in VOL_BANDS {
        if vol < threshold {
            return label;
        }
    }
    "extreme"
}

/// Whether volatility has crossed into a different band since regime entry.
pub fn volatility_shift_detected(entry_vol: f64, current_vol: f64) -> bool {
    if entry_vol <= 0.0 || current_vol <= 0.0 {
        return false;
    }
    volatility_band(entry_vol) != volatility_band(current_vol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Regime::*;

    #[test]
    fn identical_regimes_agree_fully() {
        assert_eq!(regime_agreement_score(Some(RiskOn), Some(RiskOn)), 1.0);
    }

    #[test]
    fn adjacent_regimes_score_point_six() {
        assert_eq!(regime_agreement_score(Some(RiskOn), Some(Neutral)), 0.6);
    }

    #[test]
    fn opposite_ends_score_point_one() {
        assert_eq!(regime_agreement_score(Some(RiskOn), Some(Panic)), 0.1);
    }

    #[test]
    fn unknown_regime_is_moderate_distance() {
        assert_eq!(regime_distance(None, Some(RiskOn)), 2);
    }

    #[test]
    fn percentile_with_insufficient_history_is_median() {
        assert_eq!(duration_percentile(100.0, &[10.0, 20.0]), 50.0);
    }

    #[test]
    fn percentile_ranks_against_history() {
        let history = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(duration_percentile(35.0, &history), 60.0);
    }

    #[test]
    fn volatility_shift_requires_band_change() {
        assert!(!volatility_shift_detected(15.0, 18.0));
        assert!(volatility_shift_detected(15.0, 55.0));
    }

    #[test]
    fn non_positive_volatility_never_shifts() {
        assert!(!volatility_shift_detected(0.0, 55.0));
        assert!(!volatility_shift_detected(15.0, -1.0));
    }
}
