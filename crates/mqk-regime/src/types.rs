use serde::{Deserialize, Serialize};

/// Natural ordering: risk_on(0) → neutral(1) → risk_off(2) → panic(3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    RiskOn,
    Neutral,
    RiskOff,
    Panic,
}

impl Regime {
    pub fn rank(&self) -> i32 {
        match self {
            Regime::RiskOn => 0,
            Regime::Neutral => 1,
            Regime::RiskOff => 2,
            Regime::Panic => 3,
        }
    }
}

/// External (Phase F style) verdict, carried opaquely through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalVerdict {
    pub verdict_type: String,
    pub regime_confidence: f64,
}

/// All inputs needed for one regime validation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeValidationContext {
    pub scope: String,
    pub current_regime: Option<Regime>,
    pub current_regime_confidence: f64,
    pub recalculated_regime: Option<Regime>,
    pub recalculated_confidence: f64,
    pub external_verdict: Option<ExternalVerdict>,
    pub cross_asset_regime: Option<Regime>,
    pub volatility: f64,
    pub volatility_percentile: f64,
    pub drawdown: f64,
    pub current_regime_duration_hours: f64,
    pub historical_regime_durations: Vec<f64>,
    pub num_external_sources: u32,
    pub entry_volatility: f64,
}

/// Four validation dimension scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeValidationScores {
    pub internal_score: f64,
    pub external_score: f64,
    pub drift_score: f64,
    pub cross_asset_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationVerdict {
    RegimeValidated,
    RegimeInsufficientData,
    RegimeUncertain,
    RegimeDriftDetected,
}

/// Output of one validation cycle (Stage 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeValidationResult {
    pub run_id: String,
    pub scope: String,
    pub current_regime: Option<Regime>,
    pub recalculated_regime: Option<Regime>,
    pub scores: RegimeValidationScores,
    pub verdict: ValidationVerdict,
    pub reason: String,
}

/// One of the five drift conditions evaluated in Stage 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftCondition {
    pub name: &'static str,
    pub met: bool,
    pub reason: String,
}

/// Output of Stage 2 (five-condition AND logic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftDetectionResult {
    pub drift_detected: bool,
    pub conditions: Vec<DriftCondition>,
    pub suggested_regime: Option<Regime>,
    pub confidence: f64,
    pub emergency_override: bool,
}

/// A candidate regime change, subject to Stage 4 guardrails before it can be
/// applied or surfaced as a governance proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeChangeProposal {
    pub scope_type: String,
    pub suggested_regime: Regime,
    pub phase_f_verdict_type: Option<String>,
    pub cross_asset_score: f64,
    pub low_liquidity: bool,
}

/// Per-scope running state carried between guardrail evaluations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeRunState {
    pub regime_entered_utc: chrono::DateTime<chrono::Utc>,
    pub regime_changes_this_week: Vec<chrono::DateTime<chrono::Utc>>,
}

/// Outcome of Stage 4 guardrail evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub approved: bool,
    pub reason: String,
    pub checks: Vec<DriftCondition>,
}
