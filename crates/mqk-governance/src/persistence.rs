//! Persistence and pipeline orchestration for governance artifacts (§6).
//!
//! Artifacts for one proposal live at
//! `governance/proposals/<uuid>/{proposal,critique,audit,synthesis,approval}.json`.
//! Readers must tolerate missing later stages but never a missing earlier
//! one (§5 ordering guarantees) — this module only ever writes stages in
//! order and never skips ahead.
//!
//! `approval.json` is the one artifact this crate never writes. Its mere
//! presence on disk is the only signal a proposal may be treated as
//! actionable; everything else here is advisory.

use anyhow::Result;
use chrono::{DateTime, Utc};

use mqk_db::{append_jsonl_line, read_json_opt, write_json_atomic, ScopePaths};

use crate::agents::{auditor, critic, proposer, synthesizer};
use crate::schemas::{
    Approval, Audit, Criticism, Environment, GovernanceEvent, GovernanceEventType, Proposal,
    Synthesis,
};

/// Default proposal expiry window (§4.7): unapproved proposals older than
/// this are surfaced but inert.
pub const DEFAULT_EXPIRY_HOURS: i64 = 72;

/// The four pipeline-produced artifacts for one proposal, plus whatever
/// approval state was found on disk.
#[derive(Debug, Clone)]
pub struct GovernanceRun {
    pub proposal: Proposal,
    pub criticism: Criticism,
    pub audit: Audit,
    pub synthesis: Synthesis,
}

/// Run the full pipeline for one proposal cycle and persist every stage in
/// order. Never writes an approval — that stays an external, human-authored
/// artifact (see [`read_approval`]).
pub fn run_and_persist(
    paths: &ScopePaths,
    environment: Environment,
    inputs: &proposer::ProposalInputs,
    proposal_id: uuid::Uuid,
    now: DateTime<Utc>,
    critique_ctx: &critic::CritiqueContext,
) -> Result<GovernanceRun> {
    let proposal = proposer::generate_proposal(environment, inputs, proposal_id, now);
    write_proposal(paths, &proposal)?;
    record_event(
        paths,
        GovernanceEventType::GovernanceProposalCreated,
        Some(&proposal.proposal_id),
        Some(environment),
        now,
        serde_json::json!({ "proposal_type": proposal.proposal_type }),
    )?;

    let criticism = critic::critique(&proposal, critique_ctx);
    write_critique(paths, &criticism)?;
    record_event(
        paths,
        GovernanceEventType::GovernanceProposalCritiqued,
        Some(&proposal.proposal_id),
        Some(environment),
        now,
        serde_json::json!({ "recommendation": criticism.recommendation }),
    )?;

    let audit = auditor::audit(&proposal);
    write_audit(paths, &audit)?;
    record_event(
        paths,
        if audit.constitution_passed {
            GovernanceEventType::GovernanceProposalAudited
        } else {
            GovernanceEventType::GovernanceConstitutionViolation
        },
        Some(&proposal.proposal_id),
        Some(environment),
        now,
        serde_json::json!({ "constitution_passed": audit.constitution_passed, "violation_count": audit.violations.len() }),
    )?;

    let synthesis = synthesizer::synthesize(&proposal, &criticism, &audit);
    write_synthesis(paths, &synthesis)?;
    record_event(
        paths,
        GovernanceEventType::GovernanceProposalSynthesized,
        Some(&proposal.proposal_id),
        Some(environment),
        now,
        serde_json::json!({ "final_recommendation": synthesis.final_recommendation }),
    )?;

    Ok(GovernanceRun {
        proposal,
        criticism,
        audit,
        synthesis,
    })
}

pub fn write_proposal(paths: &ScopePaths, proposal: &Proposal) -> Result<()> {
    write_json_atomic(&paths.governance_proposal_json(&proposal.proposal_id), proposal)
}

pub fn write_critique(paths: &ScopePaths, criticism: &Criticism) -> Result<()> {
    write_json_atomic(&paths.governance_critique_json(&criticism.proposal_id), criticism)
}

pub fn write_audit(paths: &ScopePaths, audit: &Audit) -> Result<()> {
    write_json_atomic(&paths.governance_audit_json(&audit.proposal_id), audit)
}

pub fn write_synthesis(paths: &ScopePaths, synthesis: &Synthesis) -> Result<()> {
    write_json_atomic(&paths.governance_synthesis_json(&synthesis.proposal_id), synthesis)
}

pub fn read_proposal(paths: &ScopePaths, proposal_id: &str) -> Result<Option<Proposal>> {
    read_json_opt(&paths.governance_proposal_json(proposal_id))
}

pub fn read_synthesis(paths: &ScopePaths, proposal_id: &str) -> Result<Option<Synthesis>> {
    read_json_opt(&paths.governance_synthesis_json(proposal_id))
}

/// Read the human-authored approval artifact, if one exists. This crate
/// never writes this file; an external operator flow does.
pub fn read_approval(paths: &ScopePaths, proposal_id: &str) -> Result<Option<Approval>> {
    read_json_opt(&paths.governance_approval_json(proposal_id))
}

/// Every proposal id with a `proposal.json` on disk, sorted newest-created
/// first. Directory entries that fail to parse as a proposal are skipped
/// rather than failing the whole listing — the ops query layer shows
/// whatever is readable.
pub fn list_proposal_ids(paths: &ScopePaths) -> Result<Vec<String>> {
    let dir = paths.governance_proposals_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut proposals: Vec<Proposal> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();
        if let Some(proposal) = read_proposal(paths, &id)? {
            proposals.push(proposal);
        }
    }
    proposals.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc));
    Ok(proposals.into_iter().map(|p| p.proposal_id).collect())
}

/// A proposal is actionable iff and only iff an approval artifact exists
/// (§4.7 application rule) — expiry does not erase an existing approval,
/// it only prevents a *new* approval from being meaningful.
pub fn is_actionable(paths: &ScopePaths, proposal_id: &str) -> Result<bool> {
    Ok(read_approval(paths, proposal_id)?.is_some())
}

/// Whether a proposal has aged out of its approval window (§4.7 expiry).
pub fn is_expired(created_at_utc: DateTime<Utc>, now: DateTime<Utc>, expiry_hours: i64) -> bool {
    now - created_at_utc > chrono::Duration::hours(expiry_hours)
}

pub fn record_event(
    paths: &ScopePaths,
    event_type: GovernanceEventType,
    proposal_id: Option<&str>,
    environment: Option<Environment>,
    ts_utc: DateTime<Utc>,
    details: serde_json::Value,
) -> Result<()> {
    let event = GovernanceEvent {
        ts_utc,
        event_type,
        proposal_id: proposal_id.map(str::to_string),
        environment,
        details,
    };
    append_jsonl_line(&paths.governance_events_jsonl(), &event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> (tempfile::TempDir, ScopePaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ScopePaths::new(dir.path(), "paper-alpaca-crypto-us");
        (dir, paths)
    }

    #[test]
    fn run_and_persist_writes_all_four_stages_in_order() {
        let (_dir, paths) = paths();
        let inputs = proposer::ProposalInputs {
            scan_starvation: vec!["DOGE".to_string()],
            ..Default::default()
        };
        let run = run_and_persist(
            &paths,
            Environment::Paper,
            &inputs,
            uuid::Uuid::nil(),
            Utc::now(),
            &critic::CritiqueContext::default(),
        )
        .unwrap();

        assert!(read_proposal(&paths, &run.proposal.proposal_id).unwrap().is_some());
        assert!(paths.governance_critique_json(&run.proposal.proposal_id).exists());
        assert!(paths.governance_audit_json(&run.proposal.proposal_id).exists());
        assert!(read_synthesis(&paths, &run.proposal.proposal_id).unwrap().is_some());
    }

    #[test]
    fn no_approval_means_not_actionable() {
        let (_dir, paths) = paths();
        assert!(!is_actionable(&paths, "nonexistent").unwrap());
    }

    #[test]
    fn approval_artifact_makes_proposal_actionable() {
        let (_dir, paths) = paths();
        let approval = Approval {
            proposal_id: "p1".to_string(),
            approved_at_utc: Utc::now(),
            approved_by: "ops@example.com".to_string(),
            notes: "reviewed manually".to_string(),
        };
        write_json_atomic(&paths.governance_approval_json("p1"), &approval).unwrap();
        assert!(is_actionable(&paths, "p1").unwrap());
    }

    #[test]
    fn expiry_window_is_respected() {
        let created = Utc::now() - chrono::Duration::hours(100);
        assert!(is_expired(created, Utc::now(), DEFAULT_EXPIRY_HOURS));
        assert!(!is_expired(Utc::now(), Utc::now(), DEFAULT_EXPIRY_HOURS));
    }
}
