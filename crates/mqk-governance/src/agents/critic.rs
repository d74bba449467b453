//! Agent 2: Critic. Argues against the proposal — its only job is to
//! surface reasons the Proposer's read of the data might be wrong. Five
//! heuristics only (§4.7(2)): recency bias, overfitting to a hot streak,
//! altcoin liquidity risk, add-capacity risk, and timing risk under
//! volatility. No other criticism is ever raised.

use crate::schemas::{CriticRecommendation, Criticism, Proposal, RawProposal};

const RECENCY_BIAS_ADJUSTMENT: f64 = 0.1;
const OVERFITTING_ADJUSTMENT: f64 = 0.1;
const LIQUIDITY_RISK_ADJUSTMENT: f64 = 0.05;
const CAPACITY_RISK_ADJUSTMENT: f64 = 0.05;
const TIMING_RISK_ADJUSTMENT: f64 = 0.05;

const OVERFITTING_PNL_THRESHOLD: f64 = 500.0;
const MAX_SYMBOLS_BEFORE_CAPACITY_RISK: usize = 3;
const MAX_DATA_ISSUES_BEFORE_TIMING_RISK: u32 = 2;
const REJECT_CRITICISM_COUNT: usize = 4;
const REJECT_ADJUSTMENT_FACTOR: f64 = 0.3;
const CAUTION_CRITICISM_COUNT: usize = 2;
const CAUTION_ADJUSTMENT_FACTOR: f64 = 0.15;

/// Core symbols exempt from the altcoin liquidity check.
const LIQUID_SYMBOLS: [&str; 2] = ["BTC", "ETH"];

#[derive(Debug, Clone, Default)]
pub struct CritiqueContext {
    pub total_pnl: f64,
    /// Whether the evidence backing this proposal includes a "latest"
    /// data point — the condition recency bias warns against.
    pub has_recent_data: bool,
    pub data_issues: u32,
}

struct Heuristic {
    fired: bool,
    adjustment: f64,
    message: String,
}

fn check_recency_bias(ctx: &CritiqueContext) -> Heuristic {
    Heuristic {
        fired: ctx.has_recent_data,
        adjustment: RECENCY_BIAS_ADJUSTMENT,
        message: "proposal leans on the most recent data point, which risks mistaking noise for signal".to_string(),
    }
}

fn check_overfitting(proposal_type_name: &str, ctx: &CritiqueContext) -> Heuristic {
    let fired = proposal_type_name == "ADD_SYMBOLS" && ctx.total_pnl > OVERFITTING_PNL_THRESHOLD;
    Heuristic {
        fired,
        adjustment: OVERFITTING_ADJUSTMENT,
        message: format!(
            "P&L of {:.2} on a single hot streak may be overfitting to a short window rather than a durable edge",
            ctx.total_pnl
        ),
    }
}

fn check_liquidity_risk(proposal_type_name: &str, symbols: &[String]) -> Heuristic {
    let illiquid: Vec<&str> = symbols
        .iter()
        .map(String::as_str)
        .filter(|s| !LIQUID_SYMBOLS.contains(s))
        .collect();
    let fired = proposal_type_name == "ADD_SYMBOLS" && !illiquid.is_empty();
    Heuristic {
        fired,
        adjustment: LIQUIDITY_RISK_ADJUSTMENT,
        message: format!(
            "adding non-major symbol(s) {} carries altcoin liquidity risk",
            illiquid.join(", ")
        ),
    }
}

fn check_capacity_risk(proposal_type_name: &str, symbols: &[String]) -> Heuristic {
    let fired = proposal_type_name == "ADD_SYMBOLS" && symbols.len() > MAX_SYMBOLS_BEFORE_CAPACITY_RISK;
    Heuristic {
        fired,
        adjustment: CAPACITY_RISK_ADJUSTMENT,
        message: format!(
            "adding {} symbols at once exceeds the {MAX_SYMBOLS_BEFORE_CAPACITY_RISK} this pipeline can responsibly absorb in one cycle",
            symbols.len()
        ),
    }
}

fn check_timing_risk(ctx: &CritiqueContext) -> Heuristic {
    Heuristic {
        fired: ctx.data_issues > MAX_DATA_ISSUES_BEFORE_TIMING_RISK,
        adjustment: TIMING_RISK_ADJUSTMENT,
        message: format!(
            "{} known data quality issue(s) make this a risky moment to act, independent of the proposal's merits",
            ctx.data_issues
        ),
    }
}

fn determine_recommendation(num_criticisms: usize, adjustment_factor: f64) -> CriticRecommendation {
    if num_criticisms >= REJECT_CRITICISM_COUNT || adjustment_factor >= REJECT_ADJUSTMENT_FACTOR {
        CriticRecommendation::Reject
    } else if num_criticisms >= CAUTION_CRITICISM_COUNT || adjustment_factor >= CAUTION_ADJUSTMENT_FACTOR {
        CriticRecommendation::Caution
    } else {
        CriticRecommendation::Proceed
    }
}

fn generate_counter_evidence(proposal_type_name: &str, environment_is_paper: bool, ctx: &CritiqueContext) -> String {
    let mut parts = Vec::new();

    match proposal_type_name {
        "ADD_SYMBOLS" => parts.push(
            "new symbols carry no trading history in this universe yet, so the proposed edge is unproven here"
                .to_string(),
        ),
        "REMOVE_SYMBOLS" if ctx.total_pnl > 0.0 => parts.push(format!(
            "overall P&L is positive ({:.2}); removing symbols now may be premature",
            ctx.total_pnl
        )),
        _ => {}
    }

    if environment_is_paper {
        parts.push("this runs in paper, so the downside of proceeding is bounded to simulated P&L".to_string());
    }

    parts.join("; ")
}

fn critique_named(
    proposal_id: &str,
    proposal_type_name: &str,
    symbols: &[String],
    environment_is_paper: bool,
    ctx: &CritiqueContext,
) -> Criticism {
    let heuristics = [
        check_recency_bias(ctx),
        check_overfitting(proposal_type_name, ctx),
        check_liquidity_risk(proposal_type_name, symbols),
        check_capacity_risk(proposal_type_name, symbols),
        check_timing_risk(ctx),
    ];

    let mut criticisms = Vec::new();
    let mut adjustment_factor = 0.0;
    for h in heuristics {
        if h.fired {
            criticisms.push(h.message);
            adjustment_factor += h.adjustment;
        }
    }

    if criticisms.is_empty() {
        criticisms.push(
            "proposal appears sound but proceed with caution due to inherent market uncertainty".to_string(),
        );
    }

    let recommendation = determine_recommendation(criticisms.len(), adjustment_factor);
    let counter_evidence = generate_counter_evidence(proposal_type_name, environment_is_paper, ctx);

    Criticism {
        proposal_id: proposal_id.to_string(),
        criticisms,
        counter_evidence,
        recommendation,
    }
}

pub fn critique(proposal: &Proposal, ctx: &CritiqueContext) -> Criticism {
    critique_named(
        &proposal.proposal_id,
        proposal.proposal_type.as_str(),
        &proposal.symbols,
        matches!(proposal.environment, crate::schemas::Environment::Paper),
        ctx,
    )
}

/// Critiques a proposal whose `proposal_type` arrived as a plain string —
/// see [`crate::schemas::RawProposal`]. A forbidden or unknown type simply
/// never matches `ADD_SYMBOLS` above, so none of the five heuristics fire
/// on its account; the Auditor is what rejects it.
pub fn critique_raw(proposal: &RawProposal, ctx: &CritiqueContext) -> Criticism {
    critique_named(
        &proposal.proposal_id,
        &proposal.proposal_type,
        &proposal.symbols,
        matches!(proposal.environment, crate::schemas::Environment::Paper),
        ctx,
    )
}
