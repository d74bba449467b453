//! Agent 1: Proposer. Turns observed operational friction — missed
//! signals, starved scans, a cold P&L — into a single candidate proposal.
//! Never sees the constitution; never decides anything binding.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::schemas::{Environment, Proposal, ProposalEvidence, ProposalType};

#[derive(Debug, Clone, Default)]
pub struct ProposalInputs {
    pub trades_skipped: u32,
    pub scan_starvation: Vec<String>,
    pub total_trades: u32,
    pub total_pnl: f64,
}

/// Picks a proposal type from whichever signal dominates: dead/starved
/// symbols suggest removal, a skipped-trade backlog with no starvation
/// suggests a rule adjustment.
fn determine_proposal_type(inputs: &ProposalInputs) -> ProposalType {
    if !inputs.scan_starvation.is_empty() {
        ProposalType::RemoveSymbols
    } else if inputs.trades_skipped > 0 {
        ProposalType::AdjustRule
    } else {
        ProposalType::AdjustThreshold
    }
}

fn proposed_symbols(proposal_type: ProposalType, inputs: &ProposalInputs) -> Vec<String> {
    match proposal_type {
        ProposalType::RemoveSymbols => inputs.scan_starvation.clone(),
        // Rule/threshold adjustments aren't symbol-scoped; the governance
        // schema still requires a non-empty, regex-valid symbol list, so
        // the two most liquid crypto majors stand in as the affected set.
        _ => vec!["BTC".to_string(), "ETH".to_string()],
    }
}

fn generate_rationale(proposal_type: ProposalType, inputs: &ProposalInputs) -> String {
    match proposal_type {
        ProposalType::RemoveSymbols => format!(
            "{} symbol(s) showed sustained scan starvation with no qualifying signals over the lookback window",
            inputs.scan_starvation.len()
        ),
        ProposalType::AdjustRule => format!(
            "{} trade(s) were skipped due to rule constraints despite {} total trades executing cleanly",
            inputs.trades_skipped, inputs.total_trades
        ),
        _ => format!(
            "current thresholds produced {} trades at a net P&L of {:.2} over the lookback window; a threshold adjustment may improve signal quality",
            inputs.total_trades, inputs.total_pnl
        ),
    }
}

fn generate_performance_notes(inputs: &ProposalInputs) -> String {
    format!(
        "total_trades={} total_pnl={:.2} trades_skipped={}",
        inputs.total_trades, inputs.total_pnl, inputs.trades_skipped
    )
}

fn generate_risk_notes(proposal_type: ProposalType) -> String {
    match proposal_type {
        ProposalType::RemoveSymbols => {
            "removing symbols reduces universe breadth; no open positions should exist in the removed set before this takes effect".to_string()
        }
        ProposalType::AdjustRule | ProposalType::AdjustThreshold => {
            "rule and threshold changes affect every future signal evaluation; recommend paper validation before any live rollout".to_string()
        }
        ProposalType::AddSymbols => {
            "added symbols carry unknown correlation to the existing book until a full trading cycle completes".to_string()
        }
    }
}

/// Confidence scales with the strength of the underlying signal and is
/// deliberately capped below certainty — this agent proposes, it never
/// asserts.
fn estimate_confidence(proposal_type: ProposalType, inputs: &ProposalInputs) -> f64 {
    let raw = match proposal_type {
        ProposalType::RemoveSymbols => 0.4 + 0.1 * inputs.scan_starvation.len() as f64,
        ProposalType::AdjustRule => 0.3 + 0.05 * inputs.trades_skipped as f64,
        _ => 0.3,
    };
    raw.clamp(0.1, 0.75)
}

pub fn generate_proposal(
    environment: Environment,
    inputs: &ProposalInputs,
    proposal_id: Uuid,
    now: DateTime<Utc>,
) -> Proposal {
    let proposal_type = determine_proposal_type(inputs);
    let symbols = proposed_symbols(proposal_type, inputs);
    let rationale = generate_rationale(proposal_type, inputs);
    let risk_notes = generate_risk_notes(proposal_type);
    let confidence = estimate_confidence(proposal_type, inputs);

    let evidence = ProposalEvidence {
        missed_signals: inputs.trades_skipped,
        scan_starvation: inputs.scan_starvation.clone(),
        performance_notes: generate_performance_notes(inputs),
        dead_symbols: inputs.scan_starvation.clone(),
    };

    Proposal::new(
        proposal_id.to_string(),
        environment,
        proposal_type,
        symbols,
        rationale,
        evidence,
        risk_notes,
        confidence,
        now,
    )
}
