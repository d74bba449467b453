//! mqk-scheduler
//!
//! Periodic Scheduler (§4.8, component J): one scheduler instance per
//! scope, driving reconciliation, regime validation, universe governance,
//! and constitutional governance on independent cadences. Each task is a
//! standalone `tokio::spawn` worker with its own ticker, its own timeout,
//! and a cooperative cancellation signal — tasks never share mutable state,
//! only persisted artifacts and a per-scope last-run registry.

pub mod persistence;
pub mod runner;
pub mod types;

pub use persistence::{read_registry, write_registry};
pub use runner::{spawn_task, TaskHandle};
pub use types::{
    TaskKind, TaskRegistry, TaskRegistryEntry, TaskRunOutcome, TaskScheduleConfig,
    DEFAULT_MAX_AGE_SECS, DEFAULT_TASK_TIMEOUT_SECS,
};
