//! Scope-rooted path table.
//!
//! Every persisted artifact lives under `<persist_root>/<scope-slug>/…`.
//! `scope_slug` is an opaque string handed to us by the caller (produced by
//! `mqk_config::scope::Scope::slug`) — this crate does not know or care how
//! the slug was derived, only that it namespaces one broker/market/region/
//! env combination from another.

use std::path::{Path, PathBuf};

/// Resolves every well-known path under a scope root. Constructed once per
/// scope at process start; cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopePaths {
    root: PathBuf,
}

impl ScopePaths {
    pub fn new(persist_root: impl AsRef<Path>, scope_slug: &str) -> Self {
        Self {
            root: persist_root.as_ref().join(scope_slug),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn open_positions_json(&self) -> PathBuf {
        self.root.join("state/open_positions.json")
    }

    pub fn reconciliation_cursor_json(&self) -> PathBuf {
        self.root.join("state/reconciliation_cursor.json")
    }

    pub fn broker_state_json(&self) -> PathBuf {
        self.root.join("state/broker_state.json")
    }

    /// Append-only record of every fill ever folded into
    /// `open_positions.json`, in processed order. `rebuild_from_fills`
    /// (§4.2 step 5) rebuilds from the *entire* fill set every cycle, never
    /// from a delta, so the full history has to be retrievable without
    /// re-fetching it from the broker on every tick.
    pub fn fills_seen_jsonl(&self) -> PathBuf {
        self.root.join("state/fills_seen.jsonl")
    }

    /// Legacy fallback ledger, read-only (see [`crate::legacy`]).
    pub fn legacy_open_positions_json(&self) -> PathBuf {
        self.root.join("ledger/open_positions.json")
    }

    pub fn daily_summary_jsonl(&self) -> PathBuf {
        self.root.join("logs/daily_summary.jsonl")
    }

    pub fn errors_jsonl(&self) -> PathBuf {
        self.root.join("logs/errors.jsonl")
    }

    pub fn ai_advisor_calls_jsonl(&self) -> PathBuf {
        self.root.join("logs/ai_advisor_calls.jsonl")
    }

    pub fn decisions_jsonl(&self) -> PathBuf {
        self.root.join("logs/decisions.jsonl")
    }

    pub fn latest_snapshot_json(&self) -> PathBuf {
        self.root.join("observability/latest_snapshot.json")
    }

    pub fn governance_proposals_dir(&self) -> PathBuf {
        self.root.join("governance/proposals")
    }

    pub fn governance_proposal_dir(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposals_dir().join(proposal_id)
    }

    pub fn governance_proposal_json(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposal_dir(proposal_id).join("proposal.json")
    }

    pub fn governance_critique_json(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposal_dir(proposal_id).join("critique.json")
    }

    pub fn governance_audit_json(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposal_dir(proposal_id).join("audit.json")
    }

    pub fn governance_synthesis_json(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposal_dir(proposal_id).join("synthesis.json")
    }

    pub fn governance_approval_json(&self, proposal_id: &str) -> PathBuf {
        self.governance_proposal_dir(proposal_id).join("approval.json")
    }

    pub fn governance_events_jsonl(&self) -> PathBuf {
        self.root.join("governance/logs/governance_events.jsonl")
    }

    pub fn universe_active_json(&self) -> PathBuf {
        self.root.join("universe/active_universe.json")
    }

    pub fn universe_cooldowns_json(&self) -> PathBuf {
        self.root.join("universe/cooldowns.json")
    }

    pub fn universe_decisions_jsonl(&self) -> PathBuf {
        self.root.join("universe/decisions.jsonl")
    }

    pub fn universe_scoring_history_jsonl(&self) -> PathBuf {
        self.root.join("universe/scoring_history.jsonl")
    }

    pub fn regime_runs_jsonl(&self) -> PathBuf {
        self.root.join("regime/runs.jsonl")
    }

    pub fn regime_run_state_json(&self) -> PathBuf {
        self.root.join("regime/run_state.json")
    }

    pub fn scheduler_registry_json(&self) -> PathBuf {
        self.root.join("scheduler/registry.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_under_scope_slug() {
        let p = ScopePaths::new("/var/lib/mqk", "paper-alpaca-equities-us");
        assert_eq!(
            p.open_positions_json(),
            Path::new("/var/lib/mqk/paper-alpaca-equities-us/state/open_positions.json")
        );
        assert_eq!(
            p.governance_proposal_json("abc-123"),
            Path::new(
                "/var/lib/mqk/paper-alpaca-equities-us/governance/proposals/abc-123/proposal.json"
            )
        );
    }
}
