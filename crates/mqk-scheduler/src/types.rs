//! Scheduler domain types (§4.8).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four periodic job kinds a scope's scheduler drives (§4.8, component J
/// driving D, G, H, I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Reconciliation,
    RegimeValidation,
    UniverseGovernance,
    ConstitutionalGovernance,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Reconciliation => "reconciliation",
            TaskKind::RegimeValidation => "regime_validation",
            TaskKind::UniverseGovernance => "universe_governance",
            TaskKind::ConstitutionalGovernance => "constitutional_governance",
        };
        f.write_str(s)
    }
}

pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 90;

/// Per-task cadence, timeout, and staleness threshold (§4.8, §6 "Scheduler
/// configuration").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskScheduleConfig {
    pub cadence_secs: u64,
    pub timeout_secs: u64,
    pub max_age_secs: u64,
}

impl TaskScheduleConfig {
    pub fn new(cadence_secs: u64) -> Self {
        Self {
            cadence_secs,
            timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

/// Outcome of a single tick of one task, recorded in the last-run registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunOutcome {
    pub task: TaskKind,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: Option<DateTime<Utc>>,
    pub succeeded: bool,
    pub timed_out: bool,
    pub error: Option<String>,
}

/// One task's entry in the per-scope last-run registry (`registry.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRegistryEntry {
    pub task: TaskKind,
    pub last_success_at_utc: Option<DateTime<Utc>>,
    pub last_attempt_at_utc: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl TaskRegistryEntry {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            last_success_at_utc: None,
            last_attempt_at_utc: None,
            consecutive_failures: 0,
        }
    }

    /// Stale if there has never been a successful run, or the last success
    /// is older than `max_age_secs` relative to `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_secs: u64) -> bool {
        match self.last_success_at_utc {
            None => true,
            Some(t) => (now - t).num_seconds() > max_age_secs as i64,
        }
    }

    /// §7: three consecutive failures raise a staleness alert regardless of
    /// the time-based threshold.
    pub fn consecutive_failure_alert(&self) -> bool {
        self.consecutive_failures >= 3
    }

    pub fn record_outcome(&mut self, outcome: &TaskRunOutcome) {
        self.last_attempt_at_utc = Some(outcome.started_at_utc);
        if outcome.succeeded {
            self.last_success_at_utc = outcome.finished_at_utc.or(Some(outcome.started_at_utc));
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }
}

/// Per-scope last-run registry, persisted as `scheduler/registry.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRegistry {
    pub entries: Vec<TaskRegistryEntry>,
}

impl TaskRegistry {
    pub fn entry_mut(&mut self, task: TaskKind) -> &mut TaskRegistryEntry {
        if let Some(idx) = self.entries.iter().position(|e| e.task == task) {
            &mut self.entries[idx]
        } else {
            self.entries.push(TaskRegistryEntry::new(task));
            self.entries.last_mut().unwrap()
        }
    }

    pub fn entry(&self, task: TaskKind) -> Option<&TaskRegistryEntry> {
        self.entries.iter().find(|e| e.task == task)
    }
}
