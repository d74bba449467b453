//! Persists regime pipeline state through `mqk_db`'s atomic-write/append-jsonl
//! discipline (§6: `regime/runs.jsonl`, `regime/run_state.json`).
//!
//! `run_state.json` is the per-scope running state the Stage 4 guardrails
//! consult (`regime_entered_utc`, the rolling week of change timestamps).
//! `runs.jsonl` is the append-only record of every validation + drift cycle,
//! one line per run, carrying a `schema_version` like every other event log
//! in this workspace.

use chrono::{DateTime, Utc};
use mqk_db::atomic::{append_jsonl_line, read_json_opt, read_jsonl_lenient, write_json_atomic};
use mqk_db::paths::ScopePaths;
use serde::{Deserialize, Serialize};

use crate::types::{DriftDetectionResult, RegimeRunState, RegimeValidationResult};

const RUN_SCHEMA_VERSION: u32 = 1;

/// One persisted line in `regime/runs.jsonl`: the validator's result plus
/// the drift detector's result for the same cycle. Drift detection is only
/// meaningful once a validation result exists, so the two always travel
/// together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeRunRecord {
    pub schema_version: u32,
    pub ts_utc: DateTime<Utc>,
    pub validation: RegimeValidationResult,
    pub drift: DriftDetectionResult,
}

pub fn read_run_state(paths: &ScopePaths) -> anyhow::Result<Option<RegimeRunState>> {
    read_json_opt(&paths.regime_run_state_json())
}

/// Falls back to a state freshly entered `now` when none is persisted yet —
/// the first cycle for a scope has no prior regime-entry timestamp to
/// measure dwell time against.
pub fn read_run_state_or_init(paths: &ScopePaths, now: DateTime<Utc>) -> anyhow::Result<RegimeRunState> {
    Ok(read_run_state(paths)?.unwrap_or(RegimeRunState {
        regime_entered_utc: now,
        regime_changes_this_week: Vec::new(),
    }))
}

pub fn write_run_state(paths: &ScopePaths, state: &RegimeRunState) -> anyhow::Result<()> {
    write_json_atomic(&paths.regime_run_state_json(), state)
}

/// Records a confirmed regime change: resets the dwell clock and appends to
/// the rolling week of changes the guardrails cap at
/// [`crate::guardrails::MAX_FLIPS_PER_WEEK`].
pub fn record_regime_change(paths: &ScopePaths, now: DateTime<Utc>) -> anyhow::Result<RegimeRunState> {
    let mut state = read_run_state_or_init(paths, now)?;
    state.regime_entered_utc = now;
    state.regime_changes_this_week.retain(|t| now - *t < chrono::Duration::days(7));
    state.regime_changes_this_week.push(now);
    write_run_state(paths, &state)?;
    Ok(state)
}

pub fn append_run(
    paths: &ScopePaths,
    validation: &RegimeValidationResult,
    drift: &DriftDetectionResult,
    ts_utc: DateTime<Utc>,
) -> anyhow::Result<()> {
    append_jsonl_line(
        &paths.regime_runs_jsonl(),
        &RegimeRunRecord {
            schema_version: RUN_SCHEMA_VERSION,
            ts_utc,
            validation: validation.clone(),
            drift: drift.clone(),
        },
    )
}

pub fn read_runs(paths: &ScopePaths) -> anyhow::Result<Vec<RegimeRunRecord>> {
    read_jsonl_lenient(&paths.regime_runs_jsonl())
}
