//! Ops Query Layer (§4.9, component K): read-only HTTP views over every
//! other subsystem's persisted state.
//!
//! Nothing here mutates anything — every handler loads through the same
//! `mqk_db`-backed persistence helpers the owning crate (`mqk-governance`,
//! `mqk-universe`, `mqk-regime`, `mqk-scheduler`) already exposes for its
//! own scheduled task, and returns whatever is on disk. A cold scope with
//! no runs yet is a normal, empty response, not an error.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

pub fn ops_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/ops/governance/proposals", get(list_governance_proposals))
        .route("/v1/ops/governance/proposals/:id", get(governance_proposal_detail))
        .route("/v1/ops/universe", get(universe_state))
        .route("/v1/ops/regime", get(regime_state))
        .route("/v1/ops/scheduler", get(scheduler_state))
}

fn internal_error(e: anyhow::Error) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/ops/governance/proposals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProposalSummary {
    pub proposal_id: String,
    pub proposal_type: mqk_governance::ProposalType,
    pub created_at_utc: chrono::DateTime<Utc>,
    pub final_recommendation: Option<mqk_governance::FinalRecommendation>,
    pub actionable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<ProposalSummary>,
}

pub(crate) async fn list_governance_proposals(State(st): State<Arc<AppState>>) -> Response {
    match list_governance_proposals_inner(&st) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn list_governance_proposals_inner(st: &AppState) -> anyhow::Result<ProposalListResponse> {
    let ids = mqk_governance::persistence::list_proposal_ids(&st.paths)?;
    let mut proposals = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(proposal) = mqk_governance::persistence::read_proposal(&st.paths, &id)? else {
            continue;
        };
        let synthesis = mqk_governance::persistence::read_synthesis(&st.paths, &id)?;
        let actionable = mqk_governance::persistence::is_actionable(&st.paths, &id)?;
        proposals.push(ProposalSummary {
            proposal_id: proposal.proposal_id,
            proposal_type: proposal.proposal_type,
            created_at_utc: proposal.created_at_utc,
            final_recommendation: synthesis.map(|s| s.final_recommendation),
            actionable,
        });
    }
    Ok(ProposalListResponse { proposals })
}

// ---------------------------------------------------------------------------
// GET /v1/ops/governance/proposals/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProposalDetailResponse {
    pub proposal: mqk_governance::Proposal,
    pub criticism: Option<mqk_governance::Criticism>,
    pub audit: Option<mqk_governance::Audit>,
    pub synthesis: Option<mqk_governance::Synthesis>,
    pub approval: Option<mqk_governance::Approval>,
    pub actionable: bool,
    pub expired: bool,
}

pub(crate) async fn governance_proposal_detail(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match governance_proposal_detail_inner(&st, &id) {
        Ok(Some(resp)) => (StatusCode::OK, Json(resp)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("no proposal {id}")).into_response(),
        Err(e) => internal_error(e),
    }
}

fn governance_proposal_detail_inner(
    st: &AppState,
    id: &str,
) -> anyhow::Result<Option<ProposalDetailResponse>> {
    let Some(proposal) = mqk_governance::persistence::read_proposal(&st.paths, id)? else {
        return Ok(None);
    };
    let criticism: Option<mqk_governance::Criticism> =
        mqk_db::atomic::read_json_opt(&st.paths.governance_critique_json(id))?;
    let audit: Option<mqk_governance::Audit> =
        mqk_db::atomic::read_json_opt(&st.paths.governance_audit_json(id))?;
    let synthesis = mqk_governance::persistence::read_synthesis(&st.paths, id)?;
    let approval = mqk_governance::persistence::read_approval(&st.paths, id)?;
    let actionable = approval.is_some();
    let expired = mqk_governance::persistence::is_expired(
        proposal.created_at_utc,
        Utc::now(),
        mqk_governance::persistence::DEFAULT_EXPIRY_HOURS,
    );

    Ok(Some(ProposalDetailResponse {
        proposal,
        criticism,
        audit,
        synthesis,
        approval,
        actionable,
        expired,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/ops/universe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UniverseStateResponse {
    pub active: mqk_universe::ActiveUniverse,
    pub cooldowns: mqk_universe::Cooldowns,
}

pub(crate) async fn universe_state(State(st): State<Arc<AppState>>) -> Response {
    match universe_state_inner(&st) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn universe_state_inner(st: &AppState) -> anyhow::Result<UniverseStateResponse> {
    Ok(UniverseStateResponse {
        active: mqk_universe::persistence::read_active_universe(&st.paths)?,
        cooldowns: mqk_universe::persistence::read_cooldowns(&st.paths)?,
    })
}

// ---------------------------------------------------------------------------
// GET /v1/ops/regime
// ---------------------------------------------------------------------------

/// How many of the most recent persisted validation/drift runs to surface;
/// the full history stays on disk, callers that need more can read
/// `regime/runs.jsonl` directly.
const RECENT_REGIME_RUNS: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct RegimeStateResponse {
    pub run_state: Option<mqk_regime::RegimeRunState>,
    pub recent_runs: Vec<mqk_regime::RegimeRunRecord>,
}

pub(crate) async fn regime_state(State(st): State<Arc<AppState>>) -> Response {
    match regime_state_inner(&st) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn regime_state_inner(st: &AppState) -> anyhow::Result<RegimeStateResponse> {
    let run_state = mqk_regime::read_run_state(&st.paths)?;
    let mut recent_runs = mqk_regime::read_runs(&st.paths)?;
    if recent_runs.len() > RECENT_REGIME_RUNS {
        recent_runs = recent_runs.split_off(recent_runs.len() - RECENT_REGIME_RUNS);
    }
    Ok(RegimeStateResponse { run_state, recent_runs })
}

// ---------------------------------------------------------------------------
// GET /v1/ops/scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerEntryView {
    pub task: mqk_scheduler::TaskKind,
    pub last_success_at_utc: Option<chrono::DateTime<Utc>>,
    pub last_attempt_at_utc: Option<chrono::DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub is_stale: bool,
    pub consecutive_failure_alert: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStateResponse {
    pub entries: Vec<SchedulerEntryView>,
}

pub(crate) async fn scheduler_state(State(st): State<Arc<AppState>>) -> Response {
    match scheduler_state_inner(&st) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn scheduler_state_inner(st: &AppState) -> anyhow::Result<SchedulerStateResponse> {
    let registry = mqk_scheduler::read_registry(&st.paths)?;
    let now = Utc::now();
    let entries = registry
        .entries
        .into_iter()
        .map(|e| SchedulerEntryView {
            is_stale: e.is_stale(now, mqk_scheduler::DEFAULT_MAX_AGE_SECS),
            consecutive_failure_alert: e.consecutive_failure_alert(),
            task: e.task,
            last_success_at_utc: e.last_success_at_utc,
            last_attempt_at_utc: e.last_attempt_at_utc,
            consecutive_failures: e.consecutive_failures,
        })
        .collect();
    Ok(SchedulerStateResponse { entries })
}
