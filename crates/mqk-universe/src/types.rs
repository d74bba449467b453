//! Shared types for the Universe Scorer & Guardrails (§4.6, §3 "Universe
//! Scored Candidate").

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    RiskOn,
    Neutral,
    RiskOff,
    Panic,
}

/// External (Phase F style) sentiment verdict, carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub verdict_type: String,
    pub confidence: f64,
    pub narrative_consistent: bool,
}

/// One closed trade, for the performance dimension's win-rate/Sharpe-proxy
/// computation over the trailing 30.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub return_pct: f64,
}

/// Raw inputs for scoring a single candidate symbol. Everything here is
/// read from elsewhere (price/volume feeds, trade history, regime state,
/// sentiment provider) — this crate never fetches any of it itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInputs {
    pub symbol: String,
    pub recent_trades: Vec<ClosedTrade>,
    pub regime: Option<Regime>,
    pub avg_volume_20d: Option<f64>,
    pub universe_median_volume: Option<f64>,
    pub annualized_volatility_pct: Option<f64>,
    pub sentiment: Option<SentimentVerdict>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub performance: f64,
    pub regime: f64,
    pub liquidity: f64,
    pub volatility: f64,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedScores {
    pub performance: f64,
    pub regime: f64,
    pub liquidity: f64,
    pub volatility: f64,
    pub sentiment: f64,
}

/// §3 "Universe Scored Candidate".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub symbol: String,
    pub total_score: f64,
    pub dimension_scores: DimensionScores,
    pub weighted_scores: WeightedScores,
    pub regime_label: Option<Regime>,
    pub timestamp: DateTime<Utc>,
}

/// The active trading universe, persisted as `universe/active_universe.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveUniverse {
    pub symbols: Vec<String>,
    pub updated_at_utc: Option<DateTime<Utc>>,
}

/// A single symbol's cooldown-after-removal record, persisted as
/// `universe/cooldowns.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub symbol: String,
    pub removed_on_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cooldowns {
    pub entries: Vec<CooldownEntry>,
}

impl Cooldowns {
    pub fn is_cooling_down(&self, symbol: &str, now: DateTime<Utc>, cooldown_days: i64) -> bool {
        self.entries.iter().any(|e| {
            e.symbol == symbol && now - e.removed_on_utc < chrono::Duration::days(cooldown_days)
        })
    }

    pub fn record_removal(&mut self, symbol: &str, removed_on_utc: DateTime<Utc>) {
        self.entries.retain(|e| e.symbol != symbol);
        self.entries.push(CooldownEntry {
            symbol: symbol.to_string(),
            removed_on_utc,
        });
    }
}

/// A proposed (but not yet guardrail-checked) change set for one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub additions: Vec<String>,
    pub removals: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Per-cycle context the guardrails need beyond the raw change set: which
/// candidate symbols have open positions (can never be removed) and which
/// are currently cooling down (can never be re-added).
#[derive(Debug, Clone, Default)]
pub struct GuardrailContext {
    pub symbols_with_open_positions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailViolation {
    pub rule: &'static str,
    pub detail: String,
}

/// Outcome of applying guardrails to one cycle's change set (§4.6). If
/// `violations` is non-empty the entire change set is discarded and the
/// previous universe is retained — there is no partial application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub accepted: bool,
    pub resulting_universe: Vec<String>,
    pub violations: Vec<GuardrailViolation>,
}

/// One line of `universe/decisions.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseDecisionEvent {
    pub schema_version: u32,
    pub ts_utc: DateTime<Utc>,
    pub change_set: ChangeSet,
    pub accepted: bool,
    pub violations: Vec<GuardrailViolation>,
    pub resulting_size: usize,
}

/// A symbol's corporate-event blackout window (§9 open question: event
/// sourcing is pluggable; behavior when the provider is unavailable is
/// fail-safe — block).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlackoutWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BlackoutWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
