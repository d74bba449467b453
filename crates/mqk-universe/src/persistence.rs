//! Persists universe state through `mqk_db`'s atomic-write/append-jsonl
//! discipline, under the scope-rooted paths it resolves (§4.6, §5).

use chrono::{DateTime, Utc};
use mqk_db::atomic::{append_jsonl_line, read_json_opt, read_jsonl_lenient, write_json_atomic};
use mqk_db::paths::ScopePaths;

use crate::types::{
    ActiveUniverse, ChangeSet, Cooldowns, GuardrailViolation, ScoredCandidate,
    UniverseDecisionEvent,
};

const DECISION_SCHEMA_VERSION: u32 = 1;

pub fn read_active_universe(paths: &ScopePaths) -> anyhow::Result<ActiveUniverse> {
    Ok(read_json_opt(&paths.universe_active_json())?.unwrap_or_default())
}

pub fn write_active_universe(paths: &ScopePaths, universe: &ActiveUniverse) -> anyhow::Result<()> {
    write_json_atomic(&paths.universe_active_json(), universe)
}

pub fn read_cooldowns(paths: &ScopePaths) -> anyhow::Result<Cooldowns> {
    Ok(read_json_opt(&paths.universe_cooldowns_json())?.unwrap_or_default())
}

pub fn write_cooldowns(paths: &ScopePaths, cooldowns: &Cooldowns) -> anyhow::Result<()> {
    write_json_atomic(&paths.universe_cooldowns_json(), cooldowns)
}

pub fn append_scoring_history(paths: &ScopePaths, candidates: &[ScoredCandidate]) -> anyhow::Result<()> {
    for candidate in candidates {
        append_jsonl_line(&paths.universe_scoring_history_jsonl(), candidate)?;
    }
    Ok(())
}

pub fn read_scoring_history(paths: &ScopePaths) -> anyhow::Result<Vec<ScoredCandidate>> {
    read_jsonl_lenient(&paths.universe_scoring_history_jsonl())
}

pub fn append_decision(
    paths: &ScopePaths,
    change_set: &ChangeSet,
    accepted: bool,
    violations: &[GuardrailViolation],
    resulting_size: usize,
    ts_utc: DateTime<Utc>,
) -> anyhow::Result<()> {
    let event = UniverseDecisionEvent {
        schema_version: DECISION_SCHEMA_VERSION,
        ts_utc,
        change_set: change_set.clone(),
        accepted,
        violations: violations.to_vec(),
        resulting_size,
    };
    append_jsonl_line(&paths.universe_decisions_jsonl(), &event)
}

pub fn read_decisions(paths: &ScopePaths) -> anyhow::Result<Vec<UniverseDecisionEvent>> {
    read_jsonl_lenient(&paths.universe_decisions_jsonl())
}

/// Applies an accepted guardrail result: writes the new active universe,
/// records removed symbols' cooldowns, and appends the decision event.
/// Call only when `result.accepted` is true — callers that discard a
/// change set should append the decision event themselves without
/// touching `active_universe.json` or `cooldowns.json`.
pub fn commit_accepted_change(
    paths: &ScopePaths,
    change_set: &ChangeSet,
    resulting_universe: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    write_active_universe(
        paths,
        &ActiveUniverse {
            symbols: resulting_universe.to_vec(),
            updated_at_utc: Some(now),
        },
    )?;

    let mut cooldowns = read_cooldowns(paths)?;
    for symbol in &change_set.removals {
        cooldowns.record_removal(symbol, now);
    }
    write_cooldowns(paths, &cooldowns)?;

    append_decision(paths, change_set, true, &[], resulting_universe.len(), now)
}
