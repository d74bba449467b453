//! Five-dimension weighted universe scorer (§4.6).
//!
//! Each dimension produces a 0-100 score; the total is the fixed-weight
//! blend: performance 0.45, regime 0.25, liquidity 0.15, volatility 0.10,
//! sentiment 0.05. Pure function of [`CandidateInputs`] — no IO, no
//! network, deterministic (§8 scoring round-trip law: identical inputs and
//! weights score identically to at least four decimal places).

use chrono::Utc;

use crate::types::{CandidateInputs, DimensionScores, Regime, ScoredCandidate, WeightedScores};

pub const WEIGHT_PERFORMANCE: f64 = 0.45;
pub const WEIGHT_REGIME: f64 = 0.25;
pub const WEIGHT_LIQUIDITY: f64 = 0.15;
pub const WEIGHT_VOLATILITY: f64 = 0.10;
pub const WEIGHT_SENTIMENT: f64 = 0.05;

const TRAILING_TRADE_WINDOW: usize = 30;

pub fn score_candidate(inputs: &CandidateInputs) -> ScoredCandidate {
    let dimension_scores = DimensionScores {
        performance: score_performance(inputs),
        regime: score_regime(inputs.regime),
        liquidity: score_liquidity(inputs.avg_volume_20d, inputs.universe_median_volume),
        volatility: score_volatility(inputs.annualized_volatility_pct),
        sentiment: score_sentiment(inputs),
    };

    let weighted_scores = WeightedScores {
        performance: round4(dimension_scores.performance * WEIGHT_PERFORMANCE),
        regime: round4(dimension_scores.regime * WEIGHT_REGIME),
        liquidity: round4(dimension_scores.liquidity * WEIGHT_LIQUIDITY),
        volatility: round4(dimension_scores.volatility * WEIGHT_VOLATILITY),
        sentiment: round4(dimension_scores.sentiment * WEIGHT_SENTIMENT),
    };

    let total_score = round4(
        weighted_scores.performance
            + weighted_scores.regime
            + weighted_scores.liquidity
            + weighted_scores.volatility
            + weighted_scores.sentiment,
    );

    ScoredCandidate {
        symbol: inputs.symbol.clone(),
        total_score,
        dimension_scores,
        weighted_scores,
        regime_label: inputs.regime,
        timestamp: Utc::now(),
    }
}

/// Win-rate (60%) + Sharpe-proxy (40%) over the trailing 30 closed trades.
/// 50 with no history — neither a reward nor a penalty for being new.
fn score_performance(inputs: &CandidateInputs) -> f64 {
    if inputs.recent_trades.is_empty() {
        return 50.0;
    }

    let window: Vec<f64> = inputs
        .recent_trades
        .iter()
        .rev()
        .take(TRAILING_TRADE_WINDOW)
        .map(|t| t.return_pct)
        .collect();

    let n = window.len() as f64;
    let wins = window.iter().filter(|&&r| r > 0.0).count() as f64;
    let win_rate_score = (wins / n) * 100.0;

    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stdev = variance.sqrt();
    let sharpe_proxy = if stdev > 0.0 { mean / stdev } else { 0.0 };
    // Sharpe-proxy of 0 maps to a neutral 50; +/-2 saturates the score.
    let sharpe_score = (50.0 + sharpe_proxy * 25.0).clamp(0.0, 100.0);

    (win_rate_score * 0.6 + sharpe_score * 0.4).clamp(0.0, 100.0)
}

fn score_regime(regime: Option<Regime>) -> f64 {
    match regime {
        Some(Regime::RiskOn) => 100.0,
        Some(Regime::Neutral) => 70.0,
        Some(Regime::RiskOff) => 40.0,
        Some(Regime::Panic) => 10.0,
        None => 50.0,
    }
}

/// `min(100, 50 + 25*log2(avg_volume_20d / universe_median_volume))`;
/// 50 if the median (or the candidate's own volume) is unavailable.
fn score_liquidity(avg_volume_20d: Option<f64>, universe_median_volume: Option<f64>) -> f64 {
    let (Some(avg), Some(median)) = (avg_volume_20d, universe_median_volume) else {
        return 50.0;
    };
    if median <= 0.0 || avg <= 0.0 {
        return 50.0;
    }
    (50.0 + 25.0 * (avg / median).log2()).min(100.0).max(0.0)
}

/// Piecewise sweet-spot curve peaking across 40-70% annualized volatility,
/// degrading linearly on either side. `None` scores neutral (50).
fn score_volatility(annualized_volatility_pct: Option<f64>) -> f64 {
    let Some(vol) = annualized_volatility_pct else {
        return 50.0;
    };
    if !(0.0..=500.0).contains(&vol) {
        return 0.0;
    }
    let below = (40.0 - vol).max(0.0) * 2.5;
    let above = (vol - 70.0).max(0.0) * 1.25;
    (100.0 - below - above).clamp(0.0, 100.0)
}

/// Base from the external verdict type, adjusted +/-10 for confidence and
/// +/-10 for narrative consistency. `None` scores neutral (50).
fn score_sentiment(inputs: &CandidateInputs) -> f64 {
    let Some(sentiment) = &inputs.sentiment else {
        return 50.0;
    };
    let base = match sentiment.verdict_type.as_str() {
        "BULLISH" => 80.0,
        "NEUTRAL" => 50.0,
        "BEARISH" => 20.0,
        _ => 50.0,
    };
    let confidence_adjustment = (sentiment.confidence - 0.5) * 20.0;
    let consistency_adjustment = if sentiment.narrative_consistent { 10.0 } else { -10.0 };
    (base + confidence_adjustment + consistency_adjustment).clamp(0.0, 100.0)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClosedTrade, SentimentVerdict};

    fn base_inputs() -> CandidateInputs {
        CandidateInputs {
            symbol: "BTC".to_string(),
            recent_trades: Vec::new(),
            regime: None,
            avg_volume_20d: None,
            universe_median_volume: None,
            annualized_volatility_pct: None,
            sentiment: None,
        }
    }

    #[test]
    fn no_history_scores_neutral_fifty() {
        let score = score_candidate(&base_inputs());
        assert_eq!(score.dimension_scores.performance, 50.0);
        assert_eq!(score.dimension_scores.regime, 50.0);
        assert_eq!(score.dimension_scores.liquidity, 50.0);
        assert_eq!(score.dimension_scores.volatility, 50.0);
        assert_eq!(score.dimension_scores.sentiment, 50.0);
        assert_eq!(score.total_score, 50.0);
    }

    #[test]
    fn risk_on_regime_scores_full_marks() {
        let mut inputs = base_inputs();
        inputs.regime = Some(Regime::RiskOn);
        let score = score_candidate(&inputs);
        assert_eq!(score.dimension_scores.regime, 100.0);
    }

    #[test]
    fn panic_regime_scores_near_zero() {
        let mut inputs = base_inputs();
        inputs.regime = Some(Regime::Panic);
        let score = score_candidate(&inputs);
        assert_eq!(score.dimension_scores.regime, 10.0);
    }

    #[test]
    fn volatility_sweet_spot_scores_maximum() {
        assert_eq!(score_volatility(Some(40.0)), 100.0);
        assert_eq!(score_volatility(Some(55.0)), 100.0);
        assert_eq!(score_volatility(Some(70.0)), 100.0);
    }

    #[test]
    fn volatility_degrades_on_either_side() {
        assert!(score_volatility(Some(10.0)) < 100.0);
        assert!(score_volatility(Some(150.0)) < 100.0);
        assert!(score_volatility(Some(10.0)) < score_volatility(Some(30.0)));
    }

    #[test]
    fn liquidity_above_median_scores_above_fifty() {
        let score = score_liquidity(Some(4_000_000.0), Some(1_000_000.0));
        assert!(score > 50.0);
    }

    #[test]
    fn liquidity_missing_median_is_neutral() {
        assert_eq!(score_liquidity(Some(1.0), None), 50.0);
    }

    #[test]
    fn win_rate_and_sharpe_blend_for_performance() {
        let mut inputs = base_inputs();
        inputs.recent_trades = vec![
            ClosedTrade { return_pct: 2.0 },
            ClosedTrade { return_pct: 3.0 },
            ClosedTrade { return_pct: -1.0 },
        ];
        let score = score_candidate(&inputs);
        assert!(score.dimension_scores.performance > 50.0);
    }

    #[test]
    fn sentiment_bullish_high_confidence_consistent_scores_high() {
        let mut inputs = base_inputs();
        inputs.sentiment = Some(SentimentVerdict {
            verdict_type: "BULLISH".to_string(),
            confidence: 0.9,
            narrative_consistent: true,
        });
        let score = score_candidate(&inputs);
        assert_eq!(score.dimension_scores.sentiment, 80.0 + 8.0 + 10.0);
    }

    #[test]
    fn scoring_is_deterministic_for_identical_inputs() {
        let mut inputs = base_inputs();
        inputs.regime = Some(Regime::Neutral);
        inputs.avg_volume_20d = Some(2_000_000.0);
        inputs.universe_median_volume = Some(1_000_000.0);
        inputs.annualized_volatility_pct = Some(55.0);
        let a = score_candidate(&inputs);
        let b = score_candidate(&inputs);
        assert_eq!(a.total_score, b.total_score);
        assert_eq!(a.dimension_scores.liquidity, b.dimension_scores.liquidity);
    }

    #[test]
    fn weights_sum_to_one() {
        assert!(
            (WEIGHT_PERFORMANCE + WEIGHT_REGIME + WEIGHT_LIQUIDITY + WEIGHT_VOLATILITY + WEIGHT_SENTIMENT - 1.0)
                .abs()
                < 1e-9
        );
    }
}
