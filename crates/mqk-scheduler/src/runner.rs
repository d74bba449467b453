//! Worker-per-task scheduling (§4.8), generalized from the teacher's
//! `mqk-daemon::state::spawn_heartbeat` single-ticker idiom to N
//! independently cancellable tasks, one per `(scope, task_kind)`.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use mqk_db::paths::ScopePaths;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::persistence::{read_registry, write_registry};
use crate::types::{TaskKind, TaskRunOutcome, TaskScheduleConfig};

/// A spawned worker for one `(scope, task_kind)`. Dropping this leaves the
/// task running; call [`TaskHandle::cancel_and_join`] for a clean shutdown.
pub struct TaskHandle {
    task: TaskKind,
    cancel_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn task(&self) -> TaskKind {
        self.task
    }

    /// Signals cooperative cancellation and waits for the worker to exit.
    /// A tick already in flight runs to completion — including whatever
    /// atomic write it started — before the loop observes the signal and
    /// exits (§5: finish, then abort).
    pub async fn cancel_and_join(self) {
        let _ = self.cancel_tx.send(true);
        let _ = self.join.await;
    }
}

/// Drives one periodic task for a single scope. `body` is invoked once per
/// cadence tick, wrapped in a per-task timeout, and the loop is strictly
/// sequential: the ticker is not polled again until the previous invocation
/// has returned or timed out, so no two invocations of this task for this
/// scope are ever in flight at once (§4.8, §5). A run that times out is
/// recorded as a failure; a run the process asked to shut down mid-flight
/// is not recorded at all, so cancellation never advances the registry's
/// last-run state.
pub fn spawn_task<F, Fut>(paths: ScopePaths, task: TaskKind, config: TaskScheduleConfig, body: F) -> TaskHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.cadence_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel_rx.changed() => {}
            }
            if *cancel_rx.borrow() {
                return;
            }

            let started_at_utc = Utc::now();
            let timeout = Duration::from_secs(config.timeout_secs.max(1));
            let result = tokio::time::timeout(timeout, body()).await;

            if *cancel_rx.borrow() {
                // Shutdown arrived while the body was running. The body's
                // own atomic writes (if any) already completed before
                // `result` resolved; we just never record this tick, so a
                // cancelled run can't advance last-run state.
                return;
            }

            let (succeeded, timed_out, error) = match result {
                Ok(Ok(())) => (true, false, None),
                Ok(Err(e)) => (false, false, Some(e.to_string())),
                Err(_) => (
                    false,
                    true,
                    Some(format!("{task} exceeded {}s timeout", config.timeout_secs)),
                ),
            };

            let outcome = TaskRunOutcome {
                task,
                started_at_utc,
                finished_at_utc: Some(Utc::now()),
                succeeded,
                timed_out,
                error,
            };

            if let Err(e) = record_outcome(&paths, &outcome) {
                tracing::error!(%task, error = %e, "failed to persist scheduler registry");
            }
        }
    });

    TaskHandle { task, cancel_tx, join }
}

fn record_outcome(paths: &ScopePaths, outcome: &TaskRunOutcome) -> anyhow::Result<()> {
    let mut registry = read_registry(paths)?;
    registry.entry_mut(outcome.task).record_outcome(outcome);
    write_registry(paths, &registry)
}
