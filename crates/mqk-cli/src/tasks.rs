//! Scheduler task bodies for the four periodic tasks every `serve` scope
//! runs: Reconciliation, Regime Validation, Universe Governance, and
//! Constitutional Governance. Each function returns the `body` closure
//! `mqk_scheduler::spawn_task` expects — pure wiring between a
//! subsystem's library functions, `mqk_db`-backed persistence, and the
//! scope's broker/external-input sources.

use std::sync::Arc;

use chrono::Utc;
use mqk_broker_core::BrokerAdapter;
use mqk_config::Scope;
use mqk_db::paths::ScopePaths;
use mqk_governance::Environment;
use mqk_reconcile::RawFill;

use crate::external_inputs::ExternalInputs;

fn environment_for(scope: &Scope) -> Environment {
    if scope.is_live() {
        Environment::Live
    } else {
        Environment::Paper
    }
}

/// Pulls fills since the last persisted cursor from the broker, rebuilds
/// open positions, and advances the cursor — one call to
/// `mqk_reconcile::run_cycle` per tick.
pub fn reconciliation_task(
    paths: ScopePaths,
    broker: Arc<dyn BrokerAdapter>,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> {
    move || {
        let paths = paths.clone();
        let broker = broker.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let cursor = mqk_reconcile::read_cursor(&paths)?;
                mqk_reconcile::run_cycle(&paths, Utc::now(), |_window_start| {
                    let fills = broker
                        .list_fills_since(cursor.last_seen_fill_id.as_deref())
                        .map_err(|e| anyhow::anyhow!("{e}"))?;
                    Ok(fills
                        .into_iter()
                        .map(|f| RawFill {
                            fill_id: f.fill_id,
                            order_id: f.order_id,
                            symbol: f.symbol,
                            qty: f.qty,
                            price: f.price,
                            filled_at_utc: f.filled_at_utc,
                            side: f.side,
                        })
                        .collect())
                })?;
                Ok::<_, anyhow::Error>(())
            })
            .await??;
            Ok(())
        })
    }
}

/// Runs one validation + drift-detection cycle. A confirmed drift is
/// turned into an `ADJUST_RULE` governance proposal and persisted through
/// the same constitutional pipeline any other proposal goes through —
/// this task never applies a regime change itself, only proposes one.
pub fn regime_validation_task(
    paths: ScopePaths,
    scope: Scope,
    external: Arc<dyn ExternalInputs>,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> {
    move || {
        let paths = paths.clone();
        let scope = scope.clone();
        let external = external.clone();
        Box::pin(async move {
            let scope_label = scope.slug();
            let ctx = external.regime_context(&scope_label)?;
            let now = Utc::now();
            let run_id = uuid::Uuid::new_v4().to_string();

            let validation = mqk_regime::validate(&ctx, &run_id);
            let drift = mqk_regime::detect_drift(&ctx, &validation.scores, &scope.market);
            mqk_regime::persistence::append_run(&paths, &validation, &drift, now)?;

            if drift.drift_detected {
                let proposal = mqk_regime::drift_to_governance_proposal(
                    &ctx,
                    &drift,
                    environment_for(&scope),
                    uuid::Uuid::new_v4(),
                    now,
                );
                if let Some(proposal) = proposal {
                    mqk_governance::persistence::write_proposal(&paths, &proposal)?;
                    mqk_governance::persistence::record_event(
                        &paths,
                        mqk_governance::GovernanceEventType::GovernanceProposalCreated,
                        Some(&proposal.proposal_id),
                        Some(environment_for(&scope)),
                        now,
                        serde_json::json!({ "source": "regime_drift" }),
                    )?;
                }
            }
            Ok(())
        })
    }
}

/// Scores the configured candidate set, proposes a change set by simple
/// score thresholds, guardrails it, and commits or discards the whole
/// change set. No add/remove threshold policy exists anywhere upstream —
/// this is the minimal glue a caller has to supply.
const ADD_SCORE_THRESHOLD: f64 = 65.0;
const REMOVE_SCORE_THRESHOLD: f64 = 35.0;

pub fn universe_governance_task(
    paths: ScopePaths,
    external: Arc<dyn ExternalInputs>,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> {
    move || {
        let paths = paths.clone();
        let external = external.clone();
        Box::pin(async move {
            let candidates = external.universe_candidates()?;
            let now = Utc::now();

            let scored: Vec<mqk_universe::ScoredCandidate> =
                candidates.iter().map(mqk_universe::score_candidate).collect();
            mqk_universe::persistence::append_scoring_history(&paths, &scored)?;

            let active = mqk_universe::persistence::read_active_universe(&paths)?;
            let cooldowns = mqk_universe::persistence::read_cooldowns(&paths)?;

            let mut additions = Vec::new();
            let mut removals = Vec::new();
            for candidate in &scored {
                let already_in = active.symbols.contains(&candidate.symbol);
                if !already_in && candidate.total_score >= ADD_SCORE_THRESHOLD {
                    additions.push(candidate.symbol.clone());
                } else if already_in && candidate.total_score <= REMOVE_SCORE_THRESHOLD {
                    removals.push(candidate.symbol.clone());
                }
            }
            let change_set = mqk_universe::ChangeSet { additions, removals };
            if change_set.is_empty() {
                return Ok(());
            }

            // Open-position data is itself an external input this task has
            // no feed for yet; an empty set means guardrails never block a
            // removal on that basis until one is wired.
            let ctx = mqk_universe::GuardrailContext::default();
            let result =
                mqk_universe::apply_guardrails(&active.symbols, &change_set, &ctx, &cooldowns, now);

            if result.accepted {
                mqk_universe::persistence::commit_accepted_change(
                    &paths,
                    &change_set,
                    &result.resulting_universe,
                    now,
                )?;
            } else {
                mqk_universe::persistence::append_decision(
                    &paths,
                    &change_set,
                    false,
                    &result.violations,
                    active.symbols.len(),
                    now,
                )?;
            }
            Ok(())
        })
    }
}

/// Runs the Proposer → Critic → Auditor → Synthesizer pipeline off
/// whatever performance/starvation signals the external-input source
/// reports, and persists every stage. Produces a proposal on every tick;
/// `mqk_governance::persistence::is_actionable` still gates anything
/// downstream on a human-authored approval file.
pub fn constitutional_governance_task(
    paths: ScopePaths,
    scope: Scope,
    external: Arc<dyn ExternalInputs>,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> {
    move || {
        let paths = paths.clone();
        let scope = scope.clone();
        let external = external.clone();
        Box::pin(async move {
            let (proposal_inputs, critique_ctx) = external.governance_inputs()?;
            let now = Utc::now();
            mqk_governance::persistence::run_and_persist(
                &paths,
                environment_for(&scope),
                &proposal_inputs,
                uuid::Uuid::new_v4(),
                now,
                &critique_ctx,
            )?;
            Ok(())
        })
    }
}
