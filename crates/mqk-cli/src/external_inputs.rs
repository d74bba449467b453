//! External analytic input boundary.
//!
//! Regime validation, universe scoring, and constitutional governance all
//! need inputs this workspace explicitly never computes itself — price
//! history, technical indicators, sentiment verdicts, a Phase-F-style
//! external regime verdict. Those are "external collaborators whose
//! contracts, not implementations, are in scope" (strategy/indicator/data
//! logic lives outside this workspace).
//!
//! [`ExternalInputs`] is that contract. [`FileBackedExternalInputs`] is the
//! one implementation shipped here: it reads optional JSON snapshots a
//! real provider process would drop next to the scope's persisted state,
//! and falls back to a conservative, no-data-available default when a
//! snapshot hasn't been produced yet — the same "missing file is normal,
//! not an error" posture `mqk-db`'s readers take everywhere else.

use std::path::{Path, PathBuf};

use mqk_db::atomic::read_json_opt;
use mqk_governance::{CritiqueContext, ProposalInputs};
use mqk_regime::RegimeValidationContext;
use mqk_universe::CandidateInputs;
use serde::Deserialize;

pub trait ExternalInputs: Send + Sync {
    fn regime_context(&self, scope_label: &str) -> anyhow::Result<RegimeValidationContext>;
    fn universe_candidates(&self) -> anyhow::Result<Vec<CandidateInputs>>;
    fn governance_inputs(&self) -> anyhow::Result<(ProposalInputs, CritiqueContext)>;
}

/// Reads `<dir>/regime_context.json`, `<dir>/universe_candidates.json`, and
/// `<dir>/governance_inputs.json`. `dir` is conventionally
/// `<scope_root>/external_inputs/` — a sibling of the scope's own
/// `state/`, `universe/`, `regime/` trees, so an external feed process can
/// write there without reaching into anything this workspace owns.
pub struct FileBackedExternalInputs {
    dir: PathBuf,
}

impl FileBackedExternalInputs {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

#[derive(Debug, Deserialize, Default)]
struct GovernanceInputsFile {
    #[serde(default)]
    proposal: ProposalInputsDto,
    #[serde(default)]
    critique: CritiqueContextDto,
}

#[derive(Debug, Deserialize, Default)]
struct ProposalInputsDto {
    #[serde(default)]
    trades_skipped: u32,
    #[serde(default)]
    scan_starvation: Vec<String>,
    #[serde(default)]
    total_trades: u32,
    #[serde(default)]
    total_pnl: f64,
}

#[derive(Debug, Deserialize, Default)]
struct CritiqueContextDto {
    #[serde(default)]
    total_pnl: f64,
    #[serde(default)]
    has_recent_data: bool,
    #[serde(default)]
    data_issues: u32,
}

impl ExternalInputs for FileBackedExternalInputs {
    fn regime_context(&self, scope_label: &str) -> anyhow::Result<RegimeValidationContext> {
        let path = self.dir.join("regime_context.json");
        if let Some(ctx) = read_json_opt::<RegimeValidationContext>(&path)? {
            return Ok(ctx);
        }
        // No feed wired yet: a context with no regimes at all, which
        // `mqk_regime::validate` treats as `REGIME_INSUFFICIENT_DATA`
        // rather than mistakenly declaring a drift.
        Ok(RegimeValidationContext {
            scope: scope_label.to_string(),
            current_regime: None,
            current_regime_confidence: 0.0,
            recalculated_regime: None,
            recalculated_confidence: 0.0,
            external_verdict: None,
            cross_asset_regime: None,
            volatility: 0.0,
            volatility_percentile: 0.0,
            drawdown: 0.0,
            current_regime_duration_hours: 0.0,
            historical_regime_durations: Vec::new(),
            num_external_sources: 0,
            entry_volatility: 0.0,
        })
    }

    fn universe_candidates(&self) -> anyhow::Result<Vec<CandidateInputs>> {
        let path = self.dir.join("universe_candidates.json");
        Ok(read_json_opt(&path)?.unwrap_or_default())
    }

    fn governance_inputs(&self) -> anyhow::Result<(ProposalInputs, CritiqueContext)> {
        let path = self.dir.join("governance_inputs.json");
        let file = read_json_opt::<GovernanceInputsFile>(&path)?.unwrap_or_default();
        let proposal = ProposalInputs {
            trades_skipped: file.proposal.trades_skipped,
            scan_starvation: file.proposal.scan_starvation,
            total_trades: file.proposal.total_trades,
            total_pnl: file.proposal.total_pnl,
        };
        let critique = CritiqueContext {
            total_pnl: file.critique.total_pnl,
            has_recent_data: file.critique.has_recent_data,
            data_issues: file.critique.data_issues,
        };
        Ok((proposal, critique))
    }
}
