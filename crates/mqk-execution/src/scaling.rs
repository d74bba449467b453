//! Scaling Policy Engine (§4.4): ordered hard-safety checks, then
//! qualification checks, first-failure-wins.
//!
//! Mirrors the ordered-check, sticky-state style of `mqk_risk::engine` —
//! each check is a free function returning `Option<ScalingDecision>`
//! (`None` means "passed, continue to the next check"). `evaluate` runs
//! them in the exact order of the spec's decision table; no check may
//! observe state a later check would have produced.
//!
//! BLOCK means a safety violation — don't retry on the same bar. SKIP
//! means conditions aren't currently met — a later signal may qualify.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalingType {
    Pyramid,
    Average,
}

/// Per-strategy, static scaling configuration (§3 Scaling Policy).
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingPolicy {
    pub allows_multiple_entries: bool,
    pub max_entries_per_symbol: u32,
    pub max_total_position_pct: f64,
    pub scaling_type: ScalingType,
    pub min_bars_between_entries: u32,
    pub min_time_between_entries_s: i64,
    pub min_signal_strength_for_add: f64,
    pub max_atr_drawdown_multiple: f64,
    pub require_no_lower_low: bool,
    pub require_volatility_above_median: bool,
    pub max_correlation_allowed: f64,
}

impl Default for ScalingPolicy {
    /// Single-entry, no-scaling default — matches the reference
    /// implementation's backward-compatible default.
    fn default() -> Self {
        Self {
            allows_multiple_entries: false,
            max_entries_per_symbol: 1,
            max_total_position_pct: 5.0,
            scaling_type: ScalingType::Pyramid,
            min_bars_between_entries: 0,
            min_time_between_entries_s: 0,
            min_signal_strength_for_add: 0.0,
            max_atr_drawdown_multiple: 2.0,
            require_no_lower_low: true,
            require_volatility_above_median: true,
            max_correlation_allowed: 0.85,
        }
    }
}

/// Snapshot of everything the engine needs for one decision (§3 Scaling
/// Context). Constructed per decision by the caller; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingContext {
    pub current_signal_strength: f64,
    pub proposed_entry_price: f64,
    pub proposed_entry_size: f64,
    pub current_price: f64,

    pub broker_position_qty: f64,
    pub ledger_position_qty: f64,
    pub ledger_entry_count: u32,
    pub ledger_last_entry_price: f64,

    pub has_pending_buy: bool,
    pub has_conflicting_sell: bool,

    pub atr: f64,
    pub atr_rolling_median: f64,
    pub bars_since_last_entry: u32,
    pub seconds_since_last_entry: i64,
    pub price_lowest_since_last_entry: f64,
    pub has_lower_low: bool,

    pub has_bearish_divergence: bool,
    pub signal_matches_position_direction: bool,

    pub account_equity: f64,
    pub available_risk_budget: f64,
    pub proposed_risk_amount: f64,
    pub min_order_qty: f64,
    pub min_order_notional: f64,

    pub policy: Option<ScalingPolicy>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalingDecisionKind {
    Block,
    Skip,
    Scale,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalingReasonCode {
    StrategyDisallowsScaling,
    MaxEntriesExceeded,
    MaxPositionSizeExceeded,
    PendingBuyExists,
    ConflictingSellExists,
    BrokerLedgerMismatch,
    RiskBudgetExceeded,
    OrderSizeBelowMinimum,
    MinimumBarsNotMet,
    MinimumTimeNotMet,
    SignalConfidenceTooLow,
    SignalQualityInsufficient,
    PriceStructureViolation,
    VolatilityRegimeInvalid,
}

impl fmt::Display for ScalingReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrategyDisallowsScaling => "strategy_disallows_scaling",
            Self::MaxEntriesExceeded => "max_entries_exceeded",
            Self::MaxPositionSizeExceeded => "max_position_size_exceeded",
            Self::PendingBuyExists => "pending_buy_exists",
            Self::ConflictingSellExists => "conflicting_sell_exists",
            Self::BrokerLedgerMismatch => "broker_ledger_mismatch",
            Self::RiskBudgetExceeded => "risk_budget_exceeded",
            Self::OrderSizeBelowMinimum => "order_size_below_minimum",
            Self::MinimumBarsNotMet => "minimum_bars_not_met",
            Self::MinimumTimeNotMet => "minimum_time_not_met",
            Self::SignalConfidenceTooLow => "signal_confidence_too_low",
            Self::SignalQualityInsufficient => "signal_quality_insufficient",
            Self::PriceStructureViolation => "price_structure_violation",
            Self::VolatilityRegimeInvalid => "volatility_regime_invalid",
        };
        write!(f, "{s}")
    }
}

/// Output of one scaling evaluation (§3 Scaling Decision). Persisted to
/// an audit trail by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingDecision {
    pub decision: ScalingDecisionKind,
    pub reason_code: Option<ScalingReasonCode>,
    pub reason_text: String,
    pub current_entry_count: u32,
    pub proposed_position_pct: f64,
    pub estimated_risk: f64,
}

fn proposed_position_pct(ctx: &ScalingContext) -> f64 {
    if ctx.account_equity <= 0.0 {
        return f64::INFINITY;
    }
    let current_value = ctx.broker_position_qty * ctx.current_price;
    let proposed_notional = ctx.proposed_entry_size * ctx.proposed_entry_price;
    (current_value + proposed_notional) / ctx.account_equity * 100.0
}

fn block(ctx: &ScalingContext, code: ScalingReasonCode, text: String) -> ScalingDecision {
    ScalingDecision {
        decision: ScalingDecisionKind::Block,
        reason_code: Some(code),
        reason_text: text,
        current_entry_count: ctx.ledger_entry_count,
        proposed_position_pct: proposed_position_pct(ctx),
        estimated_risk: ctx.proposed_risk_amount,
    }
}

fn skip(ctx: &ScalingContext, code: ScalingReasonCode, text: String) -> ScalingDecision {
    ScalingDecision {
        decision: ScalingDecisionKind::Skip,
        reason_code: Some(code),
        reason_text: text,
        current_entry_count: ctx.ledger_entry_count,
        proposed_position_pct: proposed_position_pct(ctx),
        estimated_risk: ctx.proposed_risk_amount,
    }
}

// ---------------------------------------------------------------------------
// Hard safety checks (BLOCK). Order matters.
// ---------------------------------------------------------------------------

fn check_strategy_permits_scaling(ctx: &ScalingContext) -> Option<ScalingDecision> {
    let allows = ctx.policy.as_ref().map(|p| p.allows_multiple_entries).unwrap_or(false);
    if !allows {
        return Some(block(
            ctx,
            ScalingReasonCode::StrategyDisallowsScaling,
            "strategy does not permit multiple entries".to_string(),
        ));
    }
    None
}

fn check_max_entries_not_exceeded(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    if ctx.ledger_entry_count >= policy.max_entries_per_symbol {
        return Some(block(
            ctx,
            ScalingReasonCode::MaxEntriesExceeded,
            format!(
                "{} entries already open, max is {}",
                ctx.ledger_entry_count, policy.max_entries_per_symbol
            ),
        ));
    }
    None
}

fn check_max_position_size(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    let pct = proposed_position_pct(ctx);
    if pct > policy.max_total_position_pct {
        return Some(block(
            ctx,
            ScalingReasonCode::MaxPositionSizeExceeded,
            format!(
                "proposed position {:.2}% exceeds cap of {:.2}%",
                pct, policy.max_total_position_pct
            ),
        ));
    }
    None
}

fn check_pending_order_conflicts(ctx: &ScalingContext) -> Option<ScalingDecision> {
    if ctx.has_pending_buy {
        return Some(block(
            ctx,
            ScalingReasonCode::PendingBuyExists,
            "a pending buy order already exists for this symbol".to_string(),
        ));
    }
    if ctx.has_conflicting_sell {
        return Some(block(
            ctx,
            ScalingReasonCode::ConflictingSellExists,
            "a conflicting pending sell order exists for this symbol".to_string(),
        ));
    }
    None
}

fn check_broker_ledger_consistency(ctx: &ScalingContext) -> Option<ScalingDecision> {
    if (ctx.broker_position_qty - ctx.ledger_position_qty).abs() > 1e-6 {
        return Some(block(
            ctx,
            ScalingReasonCode::BrokerLedgerMismatch,
            format!(
                "broker qty {} does not match ledger qty {}",
                ctx.broker_position_qty, ctx.ledger_position_qty
            ),
        ));
    }
    None
}

fn check_risk_budget(ctx: &ScalingContext) -> Option<ScalingDecision> {
    if ctx.proposed_risk_amount > ctx.available_risk_budget {
        return Some(block(
            ctx,
            ScalingReasonCode::RiskBudgetExceeded,
            format!(
                "proposed risk {:.2} exceeds available budget {:.2}",
                ctx.proposed_risk_amount, ctx.available_risk_budget
            ),
        ));
    }
    None
}

fn check_execution_feasibility(ctx: &ScalingContext) -> Option<ScalingDecision> {
    if ctx.proposed_entry_size < ctx.min_order_qty {
        return Some(block(
            ctx,
            ScalingReasonCode::OrderSizeBelowMinimum,
            format!(
                "order size {} below minimum {}",
                ctx.proposed_entry_size, ctx.min_order_qty
            ),
        ));
    }
    let notional = ctx.proposed_entry_size * ctx.proposed_entry_price;
    if notional < ctx.min_order_notional {
        return Some(block(
            ctx,
            ScalingReasonCode::OrderSizeBelowMinimum,
            format!(
                "order notional {:.2} below minimum {:.2}",
                notional, ctx.min_order_notional
            ),
        ));
    }
    None
}

// ---------------------------------------------------------------------------
// Qualification checks (SKIP). Order matters.
// ---------------------------------------------------------------------------

fn check_minimum_bars_since_entry(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    if ctx.bars_since_last_entry < policy.min_bars_between_entries {
        return Some(skip(
            ctx,
            ScalingReasonCode::MinimumBarsNotMet,
            format!(
                "{} bars since last entry, need {}",
                ctx.bars_since_last_entry, policy.min_bars_between_entries
            ),
        ));
    }
    None
}

fn check_minimum_time_since_entry(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    if ctx.seconds_since_last_entry < policy.min_time_between_entries_s {
        return Some(skip(
            ctx,
            ScalingReasonCode::MinimumTimeNotMet,
            format!(
                "{}s since last entry, need {}s",
                ctx.seconds_since_last_entry, policy.min_time_between_entries_s
            ),
        ));
    }
    None
}

fn check_signal_quality(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    if ctx.current_signal_strength < policy.min_signal_strength_for_add {
        return Some(skip(
            ctx,
            ScalingReasonCode::SignalConfidenceTooLow,
            format!(
                "signal strength {} below minimum {}",
                ctx.current_signal_strength, policy.min_signal_strength_for_add
            ),
        ));
    }
    if ctx.has_bearish_divergence || !ctx.signal_matches_position_direction {
        return Some(skip(
            ctx,
            ScalingReasonCode::SignalQualityInsufficient,
            "bearish divergence or direction mismatch detected".to_string(),
        ));
    }
    None
}

fn check_price_structure(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    match policy.scaling_type {
        ScalingType::Pyramid => {
            if ctx.proposed_entry_price <= ctx.ledger_last_entry_price {
                return Some(skip(
                    ctx,
                    ScalingReasonCode::PriceStructureViolation,
                    format!(
                        "pyramid requires entry > last entry price ({} <= {})",
                        ctx.proposed_entry_price, ctx.ledger_last_entry_price
                    ),
                ));
            }
            if policy.require_no_lower_low && ctx.has_lower_low {
                return Some(skip(
                    ctx,
                    ScalingReasonCode::PriceStructureViolation,
                    "lower low detected since last entry".to_string(),
                ));
            }
        }
        ScalingType::Average => {
            if ctx.proposed_entry_price >= ctx.ledger_last_entry_price {
                return Some(skip(
                    ctx,
                    ScalingReasonCode::PriceStructureViolation,
                    format!(
                        "average requires entry < last entry price ({} >= {})",
                        ctx.proposed_entry_price, ctx.ledger_last_entry_price
                    ),
                ));
            }
            let drawdown = ctx.ledger_last_entry_price - ctx.price_lowest_since_last_entry;
            let max_drawdown = policy.max_atr_drawdown_multiple * ctx.atr;
            if ctx.atr > 0.0 && drawdown > max_drawdown {
                return Some(skip(
                    ctx,
                    ScalingReasonCode::PriceStructureViolation,
                    format!(
                        "drawdown {:.2} exceeds {} ATR ({:.2})",
                        drawdown, policy.max_atr_drawdown_multiple, max_drawdown
                    ),
                ));
            }
        }
    }
    None
}

fn check_volatility_regime(ctx: &ScalingContext, policy: &ScalingPolicy) -> Option<ScalingDecision> {
    if policy.require_volatility_above_median && ctx.atr <= ctx.atr_rolling_median {
        return Some(skip(
            ctx,
            ScalingReasonCode::VolatilityRegimeInvalid,
            format!(
                "ATR {} not above rolling median {}",
                ctx.atr, ctx.atr_rolling_median
            ),
        ));
    }
    None
}

/// Run every check in §4.4 order; return the first failure, or `SCALE` if
/// all pass. No check observes state a later check would produce.
pub fn evaluate(ctx: &ScalingContext) -> ScalingDecision {
    if let Some(d) = check_strategy_permits_scaling(ctx) {
        return d;
    }
    // Strategy permits scaling, so a policy is guaranteed present from here.
    let policy = ctx.policy.as_ref().expect("checked above");

    if let Some(d) = check_max_entries_not_exceeded(ctx, policy) {
        return d;
    }
    if let Some(d) = check_max_position_size(ctx, policy) {
        return d;
    }
    if let Some(d) = check_pending_order_conflicts(ctx) {
        return d;
    }
    if let Some(d) = check_broker_ledger_consistency(ctx) {
        return d;
    }
    if let Some(d) = check_risk_budget(ctx) {
        return d;
    }
    if let Some(d) = check_execution_feasibility(ctx) {
        return d;
    }
    if let Some(d) = check_minimum_bars_since_entry(ctx, policy) {
        return d;
    }
    if let Some(d) = check_minimum_time_since_entry(ctx, policy) {
        return d;
    }
    if let Some(d) = check_signal_quality(ctx, policy) {
        return d;
    }
    if let Some(d) = check_price_structure(ctx, policy) {
        return d;
    }
    if let Some(d) = check_volatility_regime(ctx, policy) {
        return d;
    }

    ScalingDecision {
        decision: ScalingDecisionKind::Scale,
        reason_code: None,
        reason_text: "all checks passed".to_string(),
        current_entry_count: ctx.ledger_entry_count,
        proposed_position_pct: proposed_position_pct(ctx),
        estimated_risk: ctx.proposed_risk_amount,
    }
}
